//! Chatboard: a streaming chat completion client with persistent sessions.
//!
//! The crate is organized around four components:
//!
//! - [`persist`]: durable snapshots of the session collection
//! - [`store`]: the in-memory authoritative session collection
//! - [`client`]: the streaming completion client
//! - [`controller`]: orchestration of one "send" operation

// Public modules
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod observability;
pub mod persist;
pub mod profile;
pub mod render;
pub mod sse;
pub mod store;
pub mod types;

// Re-exports
pub use client::{CompletionClient, DeltaStream, HttpCompletionClient};
pub use config::{ChatArgs, ChatConfig};
pub use controller::{ERROR_SENTINEL, SessionController};
pub use error::{Error, Result};
pub use persist::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
pub use profile::{FileProfileSource, ProfileSource, StaticProfileSource};
pub use render::{NullRenderer, Renderer, StdoutRenderer};
pub use store::SessionStore;
pub use types::*;
