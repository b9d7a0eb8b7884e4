//! Durable snapshots of the session collection.
//!
//! The snapshot is a single keyed entry holding a UTF-8 JSON array of
//! sessions. Saves overwrite the whole entry; the last writer wins. Loading
//! never fails: a missing or corrupt payload degrades to an empty collection.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{from_reader, from_str, to_writer_pretty};

use crate::error::{Error, Result};
use crate::observability;
use crate::types::{Message, MessageId, MessageRole, Session, SessionId};

/// Durable store for the full session collection.
pub trait SnapshotStore: Send {
    /// Loads the last snapshot, or an empty collection if none exists or the
    /// stored payload is not valid session data.
    fn load(&self) -> Vec<Session>;

    /// Overwrites the snapshot with the given collection.
    fn save(&self, sessions: &[Session]) -> Result<()>;
}

/// Persisted form of one session.
#[derive(Serialize, Deserialize)]
struct SessionRecord {
    id: SessionId,
    title: String,
    messages: Vec<MessageRecord>,
}

/// Persisted form of one message.
///
/// The id defaults to empty so legacy snapshots written before messages
/// carried ids still load; empty ids are replaced with fresh ones.
#[derive(Serialize, Deserialize)]
struct MessageRecord {
    #[serde(default)]
    id: String,
    role: MessageRole,
    content: String,
}

fn to_records(sessions: &[Session]) -> Vec<SessionRecord> {
    sessions
        .iter()
        .map(|session| SessionRecord {
            id: session.id.clone(),
            title: session.title.clone(),
            messages: session
                .messages
                .iter()
                .map(|message| MessageRecord {
                    id: message.id.to_string(),
                    role: message.role,
                    content: message.content.clone(),
                })
                .collect(),
        })
        .collect()
}

fn from_records(records: Vec<SessionRecord>) -> Vec<Session> {
    let mut clock: u64 = 0;
    records
        .into_iter()
        .map(|record| Session {
            id: record.id,
            title: record.title,
            messages: record
                .messages
                .into_iter()
                .map(|message| {
                    let id = if message.id.is_empty() {
                        MessageId::generate()
                    } else {
                        MessageId::from_string(message.id)
                    };
                    clock += 1;
                    Message {
                        id,
                        role: message.role,
                        content: message.content,
                        created_at: clock,
                    }
                })
                .collect(),
        })
        .collect()
}

/// Snapshot store backed by a single JSON file.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Creates a store that reads and writes the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Vec<Session> {
        let Ok(file) = File::open(&self.path) else {
            return Vec::new();
        };
        let reader = BufReader::new(file);
        match from_reader::<_, Vec<SessionRecord>>(reader) {
            Ok(records) => from_records(records),
            Err(_) => {
                observability::SNAPSHOT_LOAD_FAILURES.click();
                Vec::new()
            }
        }
    }

    fn save(&self, sessions: &[Session]) -> Result<()> {
        let file = File::create(&self.path)
            .map_err(|err| Error::io("failed to create snapshot file", err))?;
        let writer = BufWriter::new(file);
        to_writer_pretty(writer, &to_records(sessions)).map_err(|err| {
            Error::serialization("failed to serialize snapshot", Some(Box::new(err)))
        })?;
        observability::SNAPSHOT_SAVES.click();
        Ok(())
    }
}

/// In-memory snapshot store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemorySnapshotStore {
    payload: Mutex<Option<String>>,
}

impl MemorySnapshotStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with a raw payload, valid or not.
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Mutex::new(Some(payload.into())),
        }
    }

    /// Returns the raw stored payload, if any.
    pub fn payload(&self) -> Option<String> {
        self.payload.lock().unwrap().clone()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Vec<Session> {
        let guard = self.payload.lock().unwrap();
        let Some(payload) = guard.as_ref() else {
            return Vec::new();
        };
        match from_str::<Vec<SessionRecord>>(payload) {
            Ok(records) => from_records(records),
            Err(_) => {
                observability::SNAPSHOT_LOAD_FAILURES.click();
                Vec::new()
            }
        }
    }

    fn save(&self, sessions: &[Session]) -> Result<()> {
        let payload = serde_json::to_string(&to_records(sessions))?;
        *self.payload.lock().unwrap() = Some(payload);
        observability::SNAPSHOT_SAVES.click();
        Ok(())
    }
}
