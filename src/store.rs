//! In-memory authoritative session collection.
//!
//! All session mutations flow through [`SessionStore`]. Every mutating call
//! is followed by a full snapshot save; saves are idempotent overwrites, so
//! they are issued per mutation and never coalesced.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::observability;
use crate::persist::SnapshotStore;
use crate::types::{DEFAULT_SESSION_TITLE, Message, MessageId, MessageRole, Session, SessionId};

/// The ordered collection of sessions, newest first.
pub struct SessionStore {
    sessions: Vec<Session>,
    snapshots: Box<dyn SnapshotStore>,
    clock: u64,
}

impl SessionStore {
    /// Creates a store, loading any prior snapshot from the adapter.
    pub fn new(snapshots: Box<dyn SnapshotStore>) -> Self {
        let sessions = snapshots.load();
        let clock = sessions
            .iter()
            .flat_map(|session| session.messages.iter())
            .map(|message| message.created_at)
            .max()
            .unwrap_or(0);
        Self {
            sessions,
            snapshots,
            clock,
        }
    }

    /// Returns all sessions, newest first.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Returns the session with the given id, if it exists.
    pub fn session(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.iter().find(|session| &session.id == id)
    }

    /// Creates an empty session with the default title at the front of the
    /// collection.
    pub fn create_session(&mut self) -> Result<Session> {
        self.create_session_titled(DEFAULT_SESSION_TITLE)
    }

    /// Creates an empty session with the given title at the front of the
    /// collection. Used for suggestion-initiated chats, whose titles are
    /// derived from the suggestion text.
    pub fn create_session_titled(&mut self, title: impl Into<String>) -> Result<Session> {
        let session = Session::new(title);
        self.sessions.insert(0, session.clone());
        self.persist()?;
        Ok(session)
    }

    /// Removes the session with the given id.
    ///
    /// Unknown ids are a silent no-op; callers are responsible for id
    /// validity. Returns whether a session was actually removed.
    pub fn delete_session(&mut self, id: &SessionId) -> Result<bool> {
        let before = self.sessions.len();
        self.sessions.retain(|session| &session.id != id);
        if self.sessions.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Replaces the title of the session with the given id.
    pub fn rename_session(&mut self, id: &SessionId, title: impl Into<String>) -> Result<()> {
        let session = self.find_mut(id)?;
        session.title = title.into();
        self.persist()
    }

    /// Copies the session with the given id into a new session at the front
    /// of the collection.
    ///
    /// The copy gets a fresh session id and fresh ids for every copied
    /// message; contents are unchanged.
    pub fn duplicate_session(&mut self, id: &SessionId) -> Result<Session> {
        let original = self
            .session(id)
            .ok_or_else(|| not_found(id))?
            .clone();
        let mut copy = Session::new(format!("{} (copy)", original.title));
        for message in &original.messages {
            self.clock += 1;
            copy.messages.push(Message {
                id: MessageId::generate(),
                role: message.role,
                content: message.content.clone(),
                created_at: self.clock,
            });
        }
        self.sessions.insert(0, copy.clone());
        self.persist()?;
        Ok(copy)
    }

    /// Appends a message to the end of the session's history, assigning it a
    /// fresh id and the next logical timestamp.
    pub fn append_message(
        &mut self,
        id: &SessionId,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Result<MessageId> {
        self.clock += 1;
        let message = Message::new(role, content, self.clock);
        let message_id = message.id.clone();
        let session = self.find_mut(id)?;
        session.messages.push(message);
        self.persist()?;
        Ok(message_id)
    }

    /// Replaces the content of the session's last message.
    ///
    /// Used exclusively for the in-progress assistant message. Fails with
    /// `NotFound` if the session is unknown or has no messages.
    pub fn update_last_message(&mut self, id: &SessionId, content: impl Into<String>) -> Result<()> {
        let session = self.find_mut(id)?;
        let Some(last) = session.messages.last_mut() else {
            return Err(Error::not_found(
                "session has no messages to update",
                Some(id.to_string()),
            ));
        };
        last.content = content.into();
        self.persist()
    }

    fn find_mut(&mut self, id: &SessionId) -> Result<&mut Session> {
        self.sessions
            .iter_mut()
            .find(|session| &session.id == id)
            .ok_or_else(|| not_found(id))
    }

    fn persist(&self) -> Result<()> {
        observability::STORE_MUTATIONS.click();
        self.snapshots.save(&self.sessions)
    }
}

fn not_found(id: &SessionId) -> Error {
    Error::not_found("no session with this id", Some(id.to_string()))
}

impl<S: SnapshotStore + Sync> SnapshotStore for Arc<S> {
    fn load(&self) -> Vec<Session> {
        self.as_ref().load()
    }

    fn save(&self, sessions: &[Session]) -> Result<()> {
        self.as_ref().save(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemorySnapshotStore;

    fn store() -> (SessionStore, Arc<MemorySnapshotStore>) {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        (SessionStore::new(Box::new(snapshots.clone())), snapshots)
    }

    #[test]
    fn create_inserts_at_front() {
        let (mut store, _) = store();
        let first = store.create_session().unwrap();
        let second = store.create_session().unwrap();
        assert_eq!(store.sessions()[0].id, second.id);
        assert_eq!(store.sessions()[1].id, first.id);
        assert!(first.has_default_title());
    }

    #[test]
    fn every_mutation_snapshots() {
        let (mut store, snapshots) = store();
        assert!(snapshots.payload().is_none());

        let session = store.create_session().unwrap();
        let after_create = snapshots.payload().unwrap();

        store.rename_session(&session.id, "Renamed").unwrap();
        let after_rename = snapshots.payload().unwrap();
        assert_ne!(after_create, after_rename);

        store
            .append_message(&session.id, MessageRole::User, "hello")
            .unwrap();
        assert_ne!(after_rename, snapshots.payload().unwrap());
    }

    #[test]
    fn delete_unknown_is_silent_noop() {
        let (mut store, _) = store();
        store.create_session().unwrap();
        let removed = store.delete_session(&SessionId::generate()).unwrap();
        assert!(!removed);
        assert_eq!(store.sessions().len(), 1);
    }

    #[test]
    fn delete_removes_session() {
        let (mut store, _) = store();
        let session = store.create_session().unwrap();
        assert!(store.delete_session(&session.id).unwrap());
        assert!(store.sessions().is_empty());
    }

    #[test]
    fn rename_unknown_fails_not_found() {
        let (mut store, _) = store();
        let err = store
            .rename_session(&SessionId::generate(), "nope")
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn duplicate_gets_fresh_ids_same_content() {
        let (mut store, _) = store();
        let session = store.create_session().unwrap();
        store
            .append_message(&session.id, MessageRole::User, "question")
            .unwrap();
        store
            .append_message(&session.id, MessageRole::Assistant, "answer")
            .unwrap();

        let copy = store.duplicate_session(&session.id).unwrap();
        let original = store.session(&session.id).unwrap();

        assert_ne!(copy.id, original.id);
        assert_eq!(copy.messages.len(), original.messages.len());
        for (copied, source) in copy.messages.iter().zip(original.messages.iter()) {
            assert_ne!(copied.id, source.id);
            assert_eq!(copied.content, source.content);
            assert_eq!(copied.role, source.role);
        }
        assert_eq!(copy.title, format!("{} (copy)", original.title));
        // The copy lands at the front.
        assert_eq!(store.sessions()[0].id, copy.id);
    }

    #[test]
    fn duplicate_unknown_fails_not_found() {
        let (mut store, _) = store();
        let err = store.duplicate_session(&SessionId::generate()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn append_preserves_order() {
        let (mut store, _) = store();
        let session = store.create_session().unwrap();
        store
            .append_message(&session.id, MessageRole::User, "one")
            .unwrap();
        store
            .append_message(&session.id, MessageRole::Assistant, "two")
            .unwrap();
        let messages = &store.session(&session.id).unwrap().messages;
        assert_eq!(messages[0].content, "one");
        assert_eq!(messages[1].content, "two");
        assert!(messages[0].created_at < messages[1].created_at);
    }

    #[test]
    fn update_last_message_touches_only_the_last() {
        let (mut store, _) = store();
        let session = store.create_session().unwrap();
        store
            .append_message(&session.id, MessageRole::User, "question")
            .unwrap();
        store
            .append_message(&session.id, MessageRole::Assistant, "")
            .unwrap();

        store.update_last_message(&session.id, "partial").unwrap();
        store
            .update_last_message(&session.id, "partial answer")
            .unwrap();

        let messages = &store.session(&session.id).unwrap().messages;
        assert_eq!(messages[0].content, "question");
        assert_eq!(messages[1].content, "partial answer");
    }

    #[test]
    fn update_last_message_on_empty_session_fails() {
        let (mut store, _) = store();
        let session = store.create_session().unwrap();
        let err = store.update_last_message(&session.id, "x").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn round_trip_reproduces_collection() {
        let snapshots = Arc::new(MemorySnapshotStore::new());
        let mut store = SessionStore::new(Box::new(snapshots.clone()));

        let a = store.create_session().unwrap();
        store
            .append_message(&a.id, MessageRole::User, "hello")
            .unwrap();
        store.rename_session(&a.id, "Greetings").unwrap();
        let b = store.duplicate_session(&a.id).unwrap();
        let c = store.create_session().unwrap();
        store.delete_session(&c.id).unwrap();

        let reloaded = SessionStore::new(Box::new(snapshots));
        assert_eq!(reloaded.sessions().len(), store.sessions().len());
        for (restored, original) in reloaded.sessions().iter().zip(store.sessions().iter()) {
            assert_eq!(restored.id, original.id);
            assert_eq!(restored.title, original.title);
            let restored_messages: Vec<_> = restored
                .messages
                .iter()
                .map(|m| (m.id.clone(), m.role, m.content.clone()))
                .collect();
            let original_messages: Vec<_> = original
                .messages
                .iter()
                .map(|m| (m.id.clone(), m.role, m.content.clone()))
                .collect();
            assert_eq!(restored_messages, original_messages);
        }
        assert_eq!(reloaded.sessions()[0].id, b.id);
    }
}
