//! Interactive chat client with persistent named sessions.
//!
//! This binary provides a streaming REPL on top of the chatboard library.
//! Replies stream token-by-token from an OpenAI-compatible
//! `/v1/chat/completions` endpoint (LM Studio's local server by default),
//! and every session mutation is snapshotted to disk.
//!
//! # Usage
//!
//! ```bash
//! # Talk to the default local endpoint
//! chatboard
//!
//! # Point at a different endpoint and model
//! chatboard --endpoint http://localhost:8080/v1/chat/completions --model qwen2.5-7b-instruct
//!
//! # Keep the snapshot somewhere specific
//! chatboard --snapshot ~/.local/share/chatboard/sessions.json
//! ```
//!
//! # Commands
//!
//! - `/new` - start a new conversation
//! - `/suggest <text>` - start a conversation from a suggestion and send it
//! - `/list` - list conversations
//! - `/open <n>` - switch to conversation n from the list
//! - `/rename <title>` - rename the current conversation
//! - `/duplicate` - duplicate the current conversation
//! - `/delete` - delete the current conversation
//! - `/quit` - exit

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use chatboard::{
    ChatArgs, ChatConfig, FileProfileSource, FileSnapshotStore, HttpCompletionClient,
    ProfileSource, Renderer, SessionController, SessionId, SessionStore, StaticProfileSource,
    StdoutRenderer,
};

fn pick_active(controller: &SessionController) -> Option<SessionId> {
    controller.sessions().first().map(|session| session.id.clone())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("chatboard [OPTIONS]");
    let config = ChatConfig::from(args);
    config.validate()?;

    let client = Arc::new(HttpCompletionClient::new(&config)?);
    let store = SessionStore::new(Box::new(FileSnapshotStore::new(&config.snapshot_path)));
    let controller = SessionController::new(store, client);

    let profile: Box<dyn ProfileSource> = match &config.profile_path {
        Some(path) => Box::new(FileProfileSource::new(path)),
        None => Box::new(StaticProfileSource::plain()),
    };

    let mut renderer = StdoutRenderer::with_color(config.use_color);
    let mut rl = DefaultEditor::new()?;
    let mut active = pick_active(&controller);

    println!("Chatboard (model: {}, endpoint: {})", config.model, config.endpoint);
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let readline = rl.readline("You: ");
        let line = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                renderer.error(&format!("Error reading input: {err}"));
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        if let Some(rest) = line.strip_prefix('/') {
            let (command, arg) = match rest.split_once(' ') {
                Some((command, arg)) => (command, arg.trim()),
                None => (rest, ""),
            };
            match command {
                "quit" | "exit" => {
                    println!("Goodbye!");
                    break;
                }
                "help" => {
                    renderer.info(
                        "/new, /suggest <text>, /list, /open <n>, /rename <title>, \
                         /duplicate, /delete, /quit",
                    );
                }
                "new" => match controller.create_session() {
                    Ok(session) => {
                        renderer.info(&format!("Started: {}", session.title));
                        active = Some(session.id);
                    }
                    Err(err) => renderer.error(&err.to_string()),
                },
                "suggest" => {
                    if arg.is_empty() {
                        renderer.error("Usage: /suggest <text>");
                        continue;
                    }
                    match controller.create_session_from_suggestion(arg) {
                        Ok(session) => {
                            active = Some(session.id.clone());
                            if let Err(err) = controller
                                .send_message(&session.id, arg, profile.as_ref(), &mut renderer)
                                .await
                            {
                                renderer.error(&err.to_string());
                            }
                        }
                        Err(err) => renderer.error(&err.to_string()),
                    }
                }
                "list" => {
                    for (index, session) in controller.sessions().iter().enumerate() {
                        let marker = if Some(&session.id) == active.as_ref() {
                            "*"
                        } else {
                            " "
                        };
                        println!(
                            "{marker} {index}: {} ({} messages)",
                            session.title,
                            session.messages.len()
                        );
                    }
                }
                "open" => {
                    let sessions = controller.sessions();
                    match arg.parse::<usize>().ok().and_then(|n| sessions.get(n)) {
                        Some(session) => {
                            renderer.info(&format!("Switched to: {}", session.title));
                            for message in &session.messages {
                                println!("[{:?}] {}", message.role, message.content);
                            }
                            active = Some(session.id.clone());
                        }
                        None => renderer.error("Usage: /open <n> (see /list)"),
                    }
                }
                "rename" => match (&active, arg.is_empty()) {
                    (Some(id), false) => {
                        if let Err(err) = controller.rename_session(id, arg) {
                            renderer.error(&err.to_string());
                        }
                    }
                    _ => renderer.error("Usage: /rename <title> (with an open conversation)"),
                },
                "duplicate" => match &active {
                    Some(id) => match controller.duplicate_session(id) {
                        Ok(copy) => {
                            renderer.info(&format!("Duplicated as: {}", copy.title));
                            active = Some(copy.id);
                        }
                        Err(err) => renderer.error(&err.to_string()),
                    },
                    None => renderer.error("No open conversation."),
                },
                "delete" => match active.take() {
                    Some(id) => match controller.delete_session(&id) {
                        Ok(_) => {
                            active = pick_active(&controller);
                            renderer.info("Conversation deleted.");
                        }
                        Err(err) => {
                            active = Some(id);
                            renderer.error(&err.to_string());
                        }
                    },
                    None => renderer.error("No open conversation."),
                },
                _ => renderer.error(&format!("Unknown command: /{command}")),
            }
            continue;
        }

        // Plain input: send to the active conversation, creating one first
        // if needed. Controller errors are recoverable; report them and keep
        // the loop running.
        let session_id = match &active {
            Some(id) => id.clone(),
            None => match controller.create_session() {
                Ok(session) => {
                    let id = session.id.clone();
                    active = Some(session.id);
                    id
                }
                Err(err) => {
                    renderer.error(&err.to_string());
                    continue;
                }
            },
        };
        if let Err(err) = controller
            .send_message(&session_id, line, profile.as_ref(), &mut renderer)
            .await
        {
            renderer.error(&err.to_string());
        }
    }

    Ok(())
}
