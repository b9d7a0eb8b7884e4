//! Data model for sessions, messages, and the completion wire protocol.

mod message;
mod session;
mod wire;

pub use message::{Message, MessageId, MessageRole};
pub use session::{DEFAULT_SESSION_TITLE, Session, SessionId};
pub use wire::{ChatMessage, ChunkChoice, ChunkDelta, CompletionChunk, CompletionRequest};
