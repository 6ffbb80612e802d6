//! Bounded conversation history and per-session registry.

use crate::defaults;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Who spoke a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One role-tagged message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Fixed-capacity FIFO log of turns, supplied to the model as context.
///
/// Holds at most `2 * max_turns` entries; appending past capacity evicts the
/// oldest entries first.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<Turn>,
    capacity: usize,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::with_max_turns(defaults::MAX_TURNS)
    }

    /// History keeping `max_turns` user+assistant pairs.
    pub fn with_max_turns(max_turns: usize) -> Self {
        let capacity = max_turns.saturating_mul(2);
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn add(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push_back(Turn::new(role, content));
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
        }
    }

    /// Copy of the full ordered sequence, oldest first.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// A history guarded for the duration of a whole turn.
pub type SharedHistory = Arc<Mutex<ConversationHistory>>;

/// One history per session key.
///
/// Callers hold the session's lock for an entire turn, so turns within one
/// session run one at a time while separate sessions stay independent.
#[derive(Debug)]
pub struct SessionRegistry {
    max_turns: usize,
    sessions: Mutex<HashMap<String, SharedHistory>>,
}

impl SessionRegistry {
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// History for `session`, created empty on first use.
    pub async fn session(&self, session: &str) -> SharedHistory {
        let mut sessions = self.sessions.lock().await;
        Arc::clone(sessions.entry(session.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(ConversationHistory::with_max_turns(
                self.max_turns,
            )))
        }))
    }

    /// Drop a session's history. Returns false if it did not exist.
    pub async fn remove(&self, session: &str) -> bool {
        self.sessions.lock().await.remove(session).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
