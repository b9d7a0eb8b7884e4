//! Configuration for the chatboard client.
//!
//! CLI argument parsing via `arrrg` plus the resolved configuration the
//! client and binary consume.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;
use url::Url;

use crate::error::Result;

/// Default completion endpoint (LM Studio's local server).
const DEFAULT_ENDPOINT: &str = "http://localhost:1234/v1/chat/completions";

/// Default model identifier.
const DEFAULT_MODEL: &str = "meta-llama-3.1-8b-instruct";

/// Default snapshot path, relative to the working directory.
const DEFAULT_SNAPSHOT_PATH: &str = "chat_sessions.json";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Command-line arguments for the chatboard binary.
#[derive(CommandLine, Debug, Default, PartialEq)]
pub struct ChatArgs {
    /// Completion endpoint URL.
    #[arrrg(optional, "Completion endpoint URL", "URL")]
    pub endpoint: Option<String>,

    /// Model to request completions from.
    #[arrrg(optional, "Model to use (default: meta-llama-3.1-8b-instruct)", "MODEL")]
    pub model: Option<String>,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[arrrg(optional, "Sampling temperature", "TEMP")]
    pub temperature: Option<f32>,

    /// Path of the session snapshot file.
    #[arrrg(optional, "Session snapshot file (default: chat_sessions.json)", "PATH")]
    pub snapshot: Option<String>,

    /// Path of the team profile roster JSON.
    #[arrrg(optional, "Team profile roster JSON", "PATH")]
    pub profile: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

impl Eq for ChatArgs {}

/// Resolved configuration after processing command-line arguments.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Completion endpoint URL.
    pub endpoint: String,

    /// Model identifier sent with every request.
    pub model: String,

    /// Optional maximum tokens per response.
    pub max_tokens: Option<u32>,

    /// Optional sampling temperature.
    pub temperature: Option<f32>,

    /// Where the session snapshot is persisted.
    pub snapshot_path: PathBuf,

    /// Optional path of the team profile roster JSON.
    pub profile_path: Option<PathBuf>,

    /// Request timeout.
    pub timeout: Duration,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: None,
            temperature: None,
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            profile_path: None,
            timeout: DEFAULT_TIMEOUT,
            use_color: true,
        }
    }

    /// Sets the completion endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the snapshot path.
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = path.into();
        self
    }

    /// Checks that the endpoint is a well-formed URL.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.endpoint)?;
        Ok(())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig {
            endpoint: args.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: args.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: args.max_tokens,
            temperature: args.temperature,
            snapshot_path: args
                .snapshot
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_PATH)),
            profile_path: args.profile.map(PathBuf::from),
            timeout: DEFAULT_TIMEOUT,
            use_color: !args.no_color,
        }
    }
}
