//! Send orchestration.
//!
//! [`SessionController`] owns the session store and runs the "send"
//! operation: validate, mark the session busy, append the user message and
//! the assistant placeholder, stream deltas into the store one by one, and
//! finalize with an auto-rename or an error sentinel. The busy flag is
//! cleared on every exit path.
//!
//! Shared state lives behind a mutex that is only held between suspension
//! points, never across an await; mutations are atomic with respect to each
//! other and deltas are applied in wire order.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::StreamExt;

use crate::client::CompletionClient;
use crate::error::{Error, Result};
use crate::profile::ProfileSource;
use crate::render::Renderer;
use crate::store::SessionStore;
use crate::types::{ChatMessage, MessageRole, Session, SessionId};

/// Assistant message substituted when a completion request fails.
pub const ERROR_SENTINEL: &str = "❌ Error: Could not reach the model endpoint.";

/// How many characters of the first user message become the session title.
const TITLE_PREFIX_CHARS: usize = 30;

struct SharedState {
    store: SessionStore,
    busy: HashSet<SessionId>,
}

/// Outcome of draining one delta stream.
enum StreamOutcome {
    /// The stream finished; the final assistant text is assembled.
    Completed,
    /// The request or the transport failed; the sentinel applies.
    Failed,
    /// The session disappeared mid-stream; remaining deltas are dropped.
    SessionGone,
}

/// Orchestrates sends against a single-writer session store.
#[derive(Clone)]
pub struct SessionController {
    client: Arc<dyn CompletionClient>,
    state: Arc<Mutex<SharedState>>,
}

impl SessionController {
    /// Creates a controller owning the given store.
    pub fn new(store: SessionStore, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            state: Arc::new(Mutex::new(SharedState {
                store,
                busy: HashSet::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().expect("controller state lock poisoned")
    }

    /// Returns a copy of all sessions, newest first.
    pub fn sessions(&self) -> Vec<Session> {
        self.lock().store.sessions().to_vec()
    }

    /// Returns a copy of the session with the given id, if it exists.
    pub fn session(&self, id: &SessionId) -> Option<Session> {
        self.lock().store.session(id).cloned()
    }

    /// Returns true if the session has a stream in flight.
    pub fn is_busy(&self, id: &SessionId) -> bool {
        self.lock().busy.contains(id)
    }

    /// Creates an empty session with the default title.
    pub fn create_session(&self) -> Result<Session> {
        self.lock().store.create_session()
    }

    /// Creates an empty session titled after a suggestion.
    ///
    /// Suggestion titles are derived up front, so a later successful send
    /// does not rename them.
    pub fn create_session_from_suggestion(&self, text: &str) -> Result<Session> {
        self.lock().store.create_session_titled(derive_title(text))
    }

    /// Deletes a session. Unknown ids are a silent no-op.
    ///
    /// Deletion never blocks on an in-flight stream; a stream targeting the
    /// deleted session drops its remaining deltas.
    pub fn delete_session(&self, id: &SessionId) -> Result<bool> {
        self.lock().store.delete_session(id)
    }

    /// Renames a session.
    pub fn rename_session(&self, id: &SessionId, title: impl Into<String>) -> Result<()> {
        self.lock().store.rename_session(id, title)
    }

    /// Duplicates a session with fresh ids.
    pub fn duplicate_session(&self, id: &SessionId) -> Result<Session> {
        self.lock().store.duplicate_session(id)
    }

    /// Sends a user message and streams the assistant reply into the store.
    ///
    /// Blank text, an unknown session, or a session that is already
    /// streaming are silent no-ops: these are local preconditions, not
    /// chat-visible failures. A failed completion request surfaces as one
    /// sentinel assistant message and still returns `Ok`.
    pub async fn send_message(
        &self,
        session_id: &SessionId,
        text: &str,
        profile: &dyn ProfileSource,
        renderer: &mut dyn Renderer,
    ) -> Result<()> {
        let outbound = {
            let mut state = self.lock();
            if text.trim().is_empty()
                || state.busy.contains(session_id)
                || state.store.session(session_id).is_none()
            {
                return Ok(());
            }
            state.busy.insert(session_id.clone());
            match begin_exchange(&mut state, session_id, text, profile) {
                Ok(outbound) => outbound,
                Err(err) => {
                    state.busy.remove(session_id);
                    return Err(err);
                }
            }
        };

        let outcome = self.run_stream(session_id, outbound, renderer).await;

        let mut state = self.lock();
        state.busy.remove(session_id);
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => return Err(err),
        };
        renderer.finish();
        match outcome {
            StreamOutcome::Completed => finalize_title(&mut state, session_id, text),
            StreamOutcome::Failed => {
                renderer.error(ERROR_SENTINEL);
                match state
                    .store
                    .append_message(session_id, MessageRole::Assistant, ERROR_SENTINEL)
                {
                    Ok(_) => Ok(()),
                    // Deleted while the request was failing; nothing to record.
                    Err(err) if err.is_not_found() => Ok(()),
                    Err(err) => Err(err),
                }
            }
            StreamOutcome::SessionGone => Ok(()),
        }
    }

    /// Drains the delta stream, applying each delta to the store in wire
    /// order. The store lock is taken per delta and released before the next
    /// chunk is awaited.
    async fn run_stream(
        &self,
        session_id: &SessionId,
        outbound: Vec<ChatMessage>,
        renderer: &mut dyn Renderer,
    ) -> Result<StreamOutcome> {
        let mut deltas = match self.client.stream(outbound).await {
            Ok(deltas) => deltas,
            Err(_) => return Ok(StreamOutcome::Failed),
        };

        let mut buffer = String::new();
        while let Some(item) = deltas.next().await {
            match item {
                Ok(delta) => {
                    buffer.push_str(&delta);
                    renderer.token(&delta);
                    let applied = {
                        let mut state = self.lock();
                        state.store.update_last_message(session_id, buffer.clone())
                    };
                    match applied {
                        Ok(()) => {}
                        Err(err) if err.is_not_found() => {
                            return Ok(StreamOutcome::SessionGone);
                        }
                        Err(err) => return Err(err),
                    }
                }
                Err(_) => return Ok(StreamOutcome::Failed),
            }
        }
        Ok(StreamOutcome::Completed)
    }
}

/// Appends the user message, builds the outbound message list, and appends
/// the empty assistant placeholder. Runs under the state lock.
fn begin_exchange(
    state: &mut SharedState,
    session_id: &SessionId,
    text: &str,
    profile: &dyn ProfileSource,
) -> Result<Vec<ChatMessage>> {
    state
        .store
        .append_message(session_id, MessageRole::User, text)?;
    let session = state
        .store
        .session(session_id)
        .ok_or_else(|| Error::not_found("session vanished during send", Some(session_id.to_string())))?;

    let mut outbound = Vec::with_capacity(session.messages.len() + 1);
    outbound.push(ChatMessage::system(profile.system_context()));
    outbound.extend(session.messages.iter().map(ChatMessage::from));

    state
        .store
        .append_message(session_id, MessageRole::Assistant, "")?;
    Ok(outbound)
}

/// Renames the session after its first successful completion. Sessions that
/// already carry a non-default title are never auto-renamed again.
fn finalize_title(state: &mut SharedState, session_id: &SessionId, text: &str) -> Result<()> {
    let wants_rename = state
        .store
        .session(session_id)
        .is_some_and(|session| session.has_default_title())
        && !text.trim().is_empty();
    if !wants_rename {
        return Ok(());
    }
    match state.store.rename_session(session_id, derive_title(text)) {
        Ok(()) => Ok(()),
        Err(err) if err.is_not_found() => Ok(()),
        Err(err) => Err(err),
    }
}

fn derive_title(text: &str) -> String {
    text.chars().take(TITLE_PREFIX_CHARS).collect()
}
