//! Profile/context collaborator.
//!
//! The controller injects free-text profile data as the system message ahead
//! of conversation history. The core treats the content as opaque.

use std::fs;
use std::path::PathBuf;

use serde_json::Value;

/// Source of the system context injected ahead of every conversation.
pub trait ProfileSource: Send + Sync {
    /// Returns the system context as free text.
    fn system_context(&self) -> String;
}

/// A fixed system context.
pub struct StaticProfileSource {
    context: String,
}

impl StaticProfileSource {
    /// Wraps a fixed context string.
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
        }
    }

    /// The plain assistant context used when no roster is configured.
    pub fn plain() -> Self {
        Self::new("You are a helpful assistant.")
    }
}

impl ProfileSource for StaticProfileSource {
    fn system_context(&self) -> String {
        self.context.clone()
    }
}

/// Reads a team roster from a `{"users": [...]}` JSON file and formats it
/// into the system context.
///
/// The file is re-read on each call so roster edits take effect without a
/// restart. An unreadable or malformed file degrades to the plain context.
pub struct FileProfileSource {
    path: PathBuf,
}

impl FileProfileSource {
    /// Creates a source reading the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProfileSource for FileProfileSource {
    fn system_context(&self) -> String {
        let users = fs::read_to_string(&self.path)
            .ok()
            .and_then(|text| serde_json::from_str::<Value>(&text).ok())
            .and_then(|value| value.get("users").cloned());
        match users {
            Some(users) => roster_context(&users),
            None => StaticProfileSource::plain().system_context(),
        }
    }
}

fn roster_context(users: &Value) -> String {
    format!(
        "You are a helpful assistant who knows the following team members:\n{}\n\n\
         If the user asks about them, answer using this info. Otherwise, respond normally.",
        serde_json::to_string_pretty(users).unwrap_or_else(|_| "[]".to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_source_returns_its_context() {
        let source = StaticProfileSource::new("context");
        assert_eq!(source.system_context(), "context");
    }

    #[test]
    fn roster_context_embeds_users() {
        let users: Value = serde_json::from_str(r#"[{"name":"Ada","role":"engineer"}]"#).unwrap();
        let context = roster_context(&users);
        assert!(context.contains("team members"));
        assert!(context.contains("Ada"));
    }

    #[test]
    fn missing_roster_file_degrades_to_plain_context() {
        let source = FileProfileSource::new("/nonexistent/profile.json");
        assert_eq!(
            source.system_context(),
            StaticProfileSource::plain().system_context()
        );
    }
}
