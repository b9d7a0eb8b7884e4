use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a message, unique within and across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Generates a fresh, globally unique message id.
    pub fn generate() -> Self {
        MessageId(Uuid::new_v4().to_string())
    }

    /// Wraps an existing id string.
    pub fn from_string(id: String) -> Self {
        MessageId(id)
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role type for a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User role.
    User,

    /// Assistant role.
    Assistant,

    /// System role.
    System,
}

/// One turn in a session, tagged by role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique id for the message.
    pub id: MessageId,

    /// The role of the message.
    pub role: MessageRole,

    /// The text content of the message. May be empty while the message is
    /// still streaming.
    pub content: String,

    /// Logical timestamp for ordering. Assigned by the store; not persisted.
    #[serde(skip)]
    pub created_at: u64,
}

impl Message {
    /// Create a new message with a freshly generated id.
    pub fn new(role: MessageRole, content: impl Into<String>, created_at: u64) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            content: content.into(),
            created_at,
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>, created_at: u64) -> Self {
        Self::new(MessageRole::User, content, created_at)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>, created_at: u64) -> Self {
        Self::new(MessageRole::Assistant, content, created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = MessageId::generate();
        let b = MessageId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&MessageRole::Assistant).unwrap(),
            "\"assistant\""
        );
        assert_eq!(
            serde_json::from_str::<MessageRole>("\"user\"").unwrap(),
            MessageRole::User
        );
    }

    #[test]
    fn created_at_is_not_serialized() {
        let msg = Message::user("hi", 42);
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("created_at").is_none());
    }
}
