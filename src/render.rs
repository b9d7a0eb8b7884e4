//! Renderer seam for progressive output.
//!
//! Visual rendering (markdown, highlighting) is an external collaborator;
//! the controller only pushes tokens and notices through this trait.

use std::io::{self, Write};

/// ANSI escape code for dim text.
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for red text.
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// Receives streaming output from the controller.
pub trait Renderer: Send {
    /// Called once per text delta, in wire order.
    fn token(&mut self, text: &str);

    /// Called when a streamed reply has finished, successfully or not.
    fn finish(&mut self);

    /// Prints an informational notice outside the transcript.
    fn info(&mut self, text: &str);

    /// Prints an error notice outside the transcript.
    fn error(&mut self, text: &str);
}

/// Renderer that writes tokens straight to stdout, flushing per token.
pub struct StdoutRenderer {
    use_color: bool,
}

impl StdoutRenderer {
    /// Creates a renderer with color output enabled or not.
    pub fn with_color(use_color: bool) -> Self {
        Self { use_color }
    }
}

impl Renderer for StdoutRenderer {
    fn token(&mut self, text: &str) {
        print!("{text}");
        let _ = io::stdout().flush();
    }

    fn finish(&mut self) {
        println!();
    }

    fn info(&mut self, text: &str) {
        if self.use_color {
            println!("{ANSI_DIM}{text}{ANSI_RESET}");
        } else {
            println!("{text}");
        }
    }

    fn error(&mut self, text: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}{text}{ANSI_RESET}");
        } else {
            eprintln!("{text}");
        }
    }
}

/// Renderer that discards everything. Used in tests.
#[derive(Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn token(&mut self, _text: &str) {}

    fn finish(&mut self) {}

    fn info(&mut self, _text: &str) {}

    fn error(&mut self, _text: &str) {}
}
