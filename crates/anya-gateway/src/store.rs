//! Session store: per-user conversation history with bounded length and
//! idle eviction.
//!
//! Locking is two-level: the outer map lock is held only to look up or
//! insert a user's entry, and each user's state has its own mutex. Two
//! requests for the same user serialize on that user's mutex; requests
//! for different users never wait on each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};

use crate::Turn;

/// One user's conversation state.
struct SessionState {
    turns: Vec<Turn>,
    last_active: Instant,
}

impl SessionState {
    fn new() -> Self {
        Self {
            turns: Vec::new(),
            last_active: Instant::now(),
        }
    }
}

/// Thread-safe store of per-user sessions.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionState>>>>,
    max_turns: usize,
}

impl SessionStore {
    /// Create a store retaining at most `max_turns` turns per user.
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_turns,
        }
    }

    /// Snapshot of a user's history, oldest first. Empty if no session.
    pub async fn history(&self, user_id: &str) -> Vec<Turn> {
        let entry = { self.sessions.read().await.get(user_id).cloned() };
        match entry {
            Some(entry) => entry.lock().await.turns.clone(),
            None => Vec::new(),
        }
    }

    /// Append one turn to a user's history, creating the session if
    /// absent, then truncate to `max_turns` from the front.
    pub async fn append(&self, user_id: &str, turn: Turn) {
        let entry = self.entry(user_id).await;
        let mut state = entry.lock().await;
        state.turns.push(turn);
        self.truncate(&mut state);
    }

    /// Append a user/assistant pair as one atomic operation, so a
    /// cancelled caller can never leave half an exchange behind.
    pub async fn append_exchange(&self, user_id: &str, user_turn: Turn, assistant_turn: Turn) {
        let entry = self.entry(user_id).await;
        let mut state = entry.lock().await;
        state.turns.push(user_turn);
        state.turns.push(assistant_turn);
        self.truncate(&mut state);
    }

    /// Remove a user's session. Returns whether one existed. Idempotent.
    pub async fn reset(&self, user_id: &str) -> bool {
        self.sessions.write().await.remove(user_id).is_some()
    }

    /// Remove sessions idle longer than `older_than`. Sessions whose
    /// mutex is currently held are in use and skipped.
    pub async fn evict_idle(&self, older_than: Duration) {
        let mut map = self.sessions.write().await;
        let now = Instant::now();
        map.retain(|id, entry| match entry.try_lock() {
            Ok(state) => {
                let idle = now.duration_since(state.last_active) > older_than;
                if idle {
                    tracing::info!(user_id = %id, "evicting idle session");
                }
                !idle
            }
            Err(_) => true,
        });
    }

    /// Number of active sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn entry(&self, user_id: &str) -> Arc<Mutex<SessionState>> {
        if let Some(entry) = self.sessions.read().await.get(user_id) {
            return Arc::clone(entry);
        }
        let mut map = self.sessions.write().await;
        Arc::clone(
            map.entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(SessionState::new()))),
        )
    }

    fn truncate(&self, state: &mut SessionState) {
        let len = state.turns.len();
        if len > self.max_turns {
            state.turns.drain(..len - self.max_turns);
        }
        state.last_active = Instant::now();
    }
}
