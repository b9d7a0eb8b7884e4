use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Message;

/// Title given to a session until its first successful completion renames it.
pub const DEFAULT_SESSION_TITLE: &str = "New Conversation";

/// Opaque identifier for a session, stable for the session's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh, globally unique session id.
    pub fn generate() -> Self {
        SessionId(Uuid::new_v4().to_string())
    }

    /// Wraps an existing id string.
    pub fn from_string(id: String) -> Self {
        SessionId(id)
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A titled, ordered conversation thread.
///
/// Messages are append-only except for the single in-progress assistant
/// message, which is always the most recently appended one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique id for the session.
    pub id: SessionId,

    /// Display title. Equals [`DEFAULT_SESSION_TITLE`] until the first
    /// successful completion derives a title from the first user message.
    pub title: String,

    /// Ordered conversation history.
    pub messages: Vec<Message>,
}

impl Session {
    /// Creates an empty session with a freshly generated id.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: SessionId::generate(),
            title: title.into(),
            messages: Vec::new(),
        }
    }

    /// Returns true if the title has never been set by a user or a
    /// completed exchange.
    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_SESSION_TITLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_empty_with_default_title() {
        let session = Session::new(DEFAULT_SESSION_TITLE);
        assert!(session.messages.is_empty());
        assert!(session.has_default_title());
    }

    #[test]
    fn custom_title_is_not_default() {
        let session = Session::new("Trip planning");
        assert!(!session.has_default_title());
    }
}
