//! Session-scoped conversation storage with a bounded retention window.
//!
//! One store instance owns every session: an explicit map from session id to
//! per-session state, never ambient global state. Each session carries a turn
//! gate serializing orchestrations so concurrent requests for the same
//! session cannot interleave appends.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use pcommon::SessionId;
use pprovider::{Message, Role};
use tokio::sync::OwnedMutexGuard;

use crate::ChatError;

/// Exclusive right to run one orchestration for a session. Dropping the guard
/// releases the session for the next request.
#[derive(Debug)]
pub struct TurnGuard {
    _gate: OwnedMutexGuard<()>,
}

#[derive(Debug, Default)]
struct SessionSlot {
    turn_gate: Arc<tokio::sync::Mutex<()>>,
    messages: Mutex<VecDeque<Message>>,
}

#[derive(Debug)]
pub struct ConversationStore {
    retention_pairs: usize,
    preamble: Option<String>,
    sessions: Mutex<HashMap<SessionId, Arc<SessionSlot>>>,
}

impl ConversationStore {
    /// `retention_pairs` is the maximum number of user/assistant pairs kept
    /// per session; the preamble does not count toward the window.
    pub fn new(retention_pairs: usize) -> Self {
        Self {
            retention_pairs,
            preamble: None,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    pub fn retention_pairs(&self) -> usize {
        self.retention_pairs
    }

    /// Claims the session for one orchestration, failing fast with
    /// `SessionBusy` when another turn is already in flight.
    pub fn begin_turn(&self, session_id: &SessionId) -> Result<TurnGuard, ChatError> {
        let slot = self.slot(session_id)?;
        let gate = Arc::clone(&slot.turn_gate)
            .try_lock_owned()
            .map_err(|_| ChatError::session_busy())?;

        Ok(TurnGuard { _gate: gate })
    }

    /// Appends one user or assistant turn. The oldest pair is evicted once
    /// the session exceeds `2 * retention_pairs` retained messages; evicted
    /// history is discarded permanently.
    pub fn append(&self, session_id: &SessionId, message: Message) -> Result<(), ChatError> {
        if message.role == Role::System {
            return Err(ChatError::store(
                "the system preamble is fixed at store construction",
            ));
        }

        let slot = self.slot(session_id)?;
        let mut messages = lock_messages(&slot)?;
        messages.push_back(message);

        while messages.len() > self.retention_pairs * 2 {
            messages.pop_front();
            messages.pop_front();
        }

        Ok(())
    }

    /// The prompt context for one request: preamble first, then at most
    /// `2 * retention_pairs` turns in original order.
    pub fn window(&self, session_id: &SessionId) -> Result<Vec<Message>, ChatError> {
        let mut window = Vec::new();
        if let Some(preamble) = &self.preamble {
            window.push(Message::system(preamble.clone()));
        }

        if let Some(slot) = self.existing_slot(session_id)? {
            window.extend(lock_messages(&slot)?.iter().cloned());
        }

        Ok(window)
    }

    /// Transport-facing view of the retained turns, preamble excluded.
    pub fn history(&self, session_id: &SessionId) -> Result<Vec<Message>, ChatError> {
        match self.existing_slot(session_id)? {
            Some(slot) => Ok(lock_messages(&slot)?.iter().cloned().collect()),
            None => Ok(Vec::new()),
        }
    }

    /// Completed user/assistant pairs currently retained.
    pub fn pair_count(&self, session_id: &SessionId) -> Result<usize, ChatError> {
        match self.existing_slot(session_id)? {
            Some(slot) => Ok(lock_messages(&slot)?.len() / 2),
            None => Ok(0),
        }
    }

    /// Drops every retained turn; the preamble survives.
    pub fn clear(&self, session_id: &SessionId) -> Result<(), ChatError> {
        if let Some(slot) = self.existing_slot(session_id)? {
            lock_messages(&slot)?.clear();
        }

        Ok(())
    }

    fn slot(&self, session_id: &SessionId) -> Result<Arc<SessionSlot>, ChatError> {
        let mut sessions = self.lock_sessions()?;
        Ok(Arc::clone(
            sessions.entry(session_id.clone()).or_default(),
        ))
    }

    fn existing_slot(&self, session_id: &SessionId) -> Result<Option<Arc<SessionSlot>>, ChatError> {
        Ok(self.lock_sessions()?.get(session_id).map(Arc::clone))
    }

    fn lock_sessions(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<SessionId, Arc<SessionSlot>>>, ChatError> {
        self.sessions
            .lock()
            .map_err(|_| ChatError::store("conversation store lock poisoned"))
    }
}

fn lock_messages(slot: &SessionSlot) -> Result<MutexGuard<'_, VecDeque<Message>>, ChatError> {
    slot.messages
        .lock()
        .map_err(|_| ChatError::store("conversation store lock poisoned"))
}
