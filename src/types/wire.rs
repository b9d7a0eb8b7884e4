//! Wire types for the OpenAI-compatible chat completion protocol.

use serde::{Deserialize, Serialize};

use crate::types::{Message, MessageRole};

/// One `{role, content}` entry in the outbound message list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message.
    pub role: MessageRole,

    /// The text content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Creates a new chat message.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self::new(message.role, message.content.clone())
    }
}

/// Request body for a streaming completion.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// Model identifier understood by the endpoint.
    pub model: String,

    /// Always true; this client only speaks the streaming protocol.
    pub stream: bool,

    /// System context, prior history, and the new user message, in order.
    pub messages: Vec<ChatMessage>,

    /// Optional sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Optional maximum tokens per response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Creates a streaming completion request.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            stream: true,
            messages,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// One decoded JSON payload from a `data:` frame.
///
/// Any shape other than `{choices: [{delta: {content}}]}` deserializes with
/// the relevant fields absent and is treated as a skippable frame.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionChunk {
    /// The choice list; only the first entry is inspected.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// One entry of a chunk's choice list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    /// The incremental update for this choice.
    #[serde(default)]
    pub delta: ChunkDelta,
}

/// The incremental update carried by a chunk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    /// New assistant text, if this chunk carries any.
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionChunk {
    /// Extracts the delta text, if present and non-empty.
    pub fn delta_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_unset_sampling_fields() {
        let request = CompletionRequest::new("test-model", vec![ChatMessage::system("ctx")]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], true);
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn chunk_with_content_yields_delta() {
        let chunk: CompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#).unwrap();
        assert_eq!(chunk.delta_text(), Some("Hi".to_string()));
    }

    #[test]
    fn chunk_without_content_yields_nothing() {
        let chunk: CompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert_eq!(chunk.delta_text(), None);
    }

    #[test]
    fn empty_delta_content_is_ignored() {
        let chunk: CompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":""}}]}"#).unwrap();
        assert_eq!(chunk.delta_text(), None);
    }

    #[test]
    fn unexpected_shape_is_tolerated() {
        let chunk: CompletionChunk = serde_json::from_str(r#"{"object":"ping"}"#).unwrap();
        assert_eq!(chunk.delta_text(), None);
    }
}
