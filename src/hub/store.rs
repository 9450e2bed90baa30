//! Session store: the single owner of every game state
//!
//! One readers-writer lock guards the whole map. Individual sessions are
//! pointer-shared so the rule engine can mutate them in place; snapshots are
//! deep copies.

use crate::error::{HubError, Result};
use crate::types::{GameState, GameStatus, SessionId};
use crate::utils::generate_session_id;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// A game state shared between the store and the rule engine
pub type SharedGameState = Arc<RwLock<GameState>>;

/// Count of sessions per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub ready_to_start: usize,
    pub in_progress: usize,
    pub finished: usize,
}

impl StoreStats {
    pub fn total(&self) -> usize {
        self.ready_to_start + self.in_progress + self.finished
    }
}

/// Mapping from session identifier to game state
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, SharedGameState>>>,
}

fn lock_error(what: &str) -> anyhow::Error {
    HubError::InternalError {
        message: format!("Failed to acquire {} lock", what),
    }
    .into()
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh session for two clients, X moving first
    pub fn create(&self, player_x: &str, player_o: &str) -> Result<SessionId> {
        let mut sessions = self.sessions.write().map_err(|_| lock_error("sessions"))?;

        let mut session_id = generate_session_id();
        while sessions.contains_key(&session_id) {
            session_id = generate_session_id();
        }

        let state = GameState::new(player_x.to_string(), player_o.to_string());
        sessions.insert(session_id.clone(), Arc::new(RwLock::new(state)));

        debug!(
            "Created session {} - X: '{}', O: '{}'",
            session_id, player_x, player_o
        );
        Ok(session_id)
    }

    /// Look up a session
    pub fn get(&self, session_id: &str) -> Result<Option<SharedGameState>> {
        let sessions = self.sessions.read().map_err(|_| lock_error("sessions"))?;
        Ok(sessions.get(session_id).cloned())
    }

    /// Remove a single session, returning whether it existed
    pub fn remove(&self, session_id: &str) -> Result<bool> {
        let mut sessions = self.sessions.write().map_err(|_| lock_error("sessions"))?;
        Ok(sessions.remove(session_id).is_some())
    }

    /// Remove every finished session, returning how many were removed
    pub fn prune(&self) -> Result<usize> {
        let mut sessions = self.sessions.write().map_err(|_| lock_error("sessions"))?;
        let before = sessions.len();

        let mut poisoned = false;
        sessions.retain(|session_id, state| match state.read() {
            Ok(state) if state.is_finished() => {
                debug!("Pruning finished session {}", session_id);
                false
            }
            Ok(_) => true,
            Err(_) => {
                poisoned = true;
                true
            }
        });

        if poisoned {
            return Err(lock_error("session state"));
        }

        Ok(before - sessions.len())
    }

    /// Deep copy of every session
    pub fn snapshot(&self) -> Result<HashMap<SessionId, GameState>> {
        let sessions = self.sessions.read().map_err(|_| lock_error("sessions"))?;
        sessions
            .iter()
            .map(|(session_id, state)| {
                let state = state.read().map_err(|_| lock_error("session state"))?;
                Ok((session_id.clone(), state.clone()))
            })
            .collect()
    }

    /// Discard the current contents and adopt `contents` verbatim
    pub fn replace(&self, contents: HashMap<SessionId, GameState>) -> Result<()> {
        let replacement: HashMap<SessionId, SharedGameState> = contents
            .into_iter()
            .map(|(session_id, state)| (session_id, Arc::new(RwLock::new(state))))
            .collect();

        let mut sessions = self.sessions.write().map_err(|_| lock_error("sessions"))?;
        let previous = sessions.len();
        *sessions = replacement;

        info!(
            "Replaced session store - previous: {}, adopted: {}",
            previous,
            sessions.len()
        );
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        let sessions = self.sessions.read().map_err(|_| lock_error("sessions"))?;
        Ok(sessions.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Count sessions per status
    pub fn stats(&self) -> Result<StoreStats> {
        let sessions = self.sessions.read().map_err(|_| lock_error("sessions"))?;
        let mut stats = StoreStats::default();
        for state in sessions.values() {
            let state = state.read().map_err(|_| lock_error("session state"))?;
            match state.status {
                GameStatus::ReadyToStart => stats.ready_to_start += 1,
                GameStatus::InProgress => stats.in_progress += 1,
                GameStatus::Finished => stats.finished += 1,
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, BOARD_SIZE};

    fn finish(store: &SessionStore, session_id: &str) {
        let state = store.get(session_id).unwrap().unwrap();
        state.write().unwrap().status = GameStatus::Finished;
    }

    #[test]
    fn test_create_and_get() {
        let store = SessionStore::new();
        let session_id = store.create("alice", "bob").unwrap();

        let state = store.get(&session_id).unwrap().unwrap();
        let state = state.read().unwrap();
        assert_eq!(state.player_x, "alice");
        assert_eq!(state.player_o, "bob");
        assert_eq!(state.board, [Cell::Empty; BOARD_SIZE]);
        assert_eq!(state.current_move, Cell::X);
        assert_eq!(state.status, GameStatus::ReadyToStart);
    }

    #[test]
    fn test_get_missing() {
        let store = SessionStore::new();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let store = SessionStore::new();
        let a = store.create("a", "b").unwrap();
        let b = store.create("a", "b").unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_prune_removes_only_finished() {
        let store = SessionStore::new();
        let finished = store.create("a", "b").unwrap();
        let playing = store.create("c", "d").unwrap();
        let ready = store.create("e", "f").unwrap();

        store
            .get(&playing)
            .unwrap()
            .unwrap()
            .write()
            .unwrap()
            .status = GameStatus::InProgress;
        finish(&store, &finished);

        assert_eq!(store.prune().unwrap(), 1);
        assert!(store.get(&finished).unwrap().is_none());
        assert!(store.get(&playing).unwrap().is_some());
        assert!(store.get(&ready).unwrap().is_some());

        // Nothing left to prune
        assert_eq!(store.prune().unwrap(), 0);
    }

    #[test]
    fn test_engine_mutations_are_visible_in_snapshot() {
        let store = SessionStore::new();
        let session_id = store.create("a", "b").unwrap();

        let shared = store.get(&session_id).unwrap().unwrap();
        shared.write().unwrap().board[4] = Cell::X;

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot[&session_id].board[4], Cell::X);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let store = SessionStore::new();
        let session_id = store.create("a", "b").unwrap();

        let mut snapshot = store.snapshot().unwrap();
        snapshot.get_mut(&session_id).unwrap().board[0] = Cell::O;

        let state = store.get(&session_id).unwrap().unwrap();
        assert_eq!(state.read().unwrap().board[0], Cell::Empty);
    }

    #[test]
    fn test_replace_then_snapshot_round_trips() {
        let store = SessionStore::new();
        store.create("old", "session").unwrap();

        let mut contents = HashMap::new();
        let mut state = GameState::new("x".to_string(), "o".to_string());
        state.board[2] = Cell::X;
        state.current_move = Cell::O;
        state.status = GameStatus::InProgress;
        contents.insert("s1".to_string(), state);
        contents.insert(
            "s2".to_string(),
            GameState::new("p".to_string(), "q".to_string()),
        );

        store.replace(contents.clone()).unwrap();
        assert_eq!(store.snapshot().unwrap(), contents);
    }

    #[test]
    fn test_stats() {
        let store = SessionStore::new();
        let a = store.create("a", "b").unwrap();
        store.create("c", "d").unwrap();
        finish(&store, &a);

        let stats = store.stats().unwrap();
        assert_eq!(stats.ready_to_start, 1);
        assert_eq!(stats.finished, 1);
        assert_eq!(stats.total(), 2);
    }
}
