//! Session table: one `HistoryManager` + cancellation handle per session id,
//! capped at `max_sessions`. Grounded on `cli/server/session.rs`'s
//! DashMap-backed manager, trimmed of workspace/TTL-cleanup machinery this
//! core has no use for.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entry::SessionHandle;
use crate::history::HistoryManager;

pub const DEFAULT_MAX_SESSIONS: usize = 10;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;

pub struct Session {
    pub id: String,
    pub history: Mutex<HistoryManager>,
    pub cancel: SessionHandle,
    created_at: Instant,
    last_active: Mutex<Instant>,
}

impl Session {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4().to_string(),
            history: Mutex::new(HistoryManager::new()),
            cancel: SessionHandle::new(),
            created_at: now,
            last_active: Mutex::new(now),
        }
    }

    pub async fn touch(&self) {
        *self.last_active.lock().await = Instant::now();
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<DashMap<String, Arc<Session>>>,
    max_sessions: usize,
}

impl SessionManager {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            max_sessions,
        }
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn create(&self) -> Result<Arc<Session>, String> {
        if self.sessions.len() >= self.max_sessions {
            return Err(format!("maximum session limit ({}) reached", self.max_sessions));
        }
        let session = Arc::new(Session::new());
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| entry.clone())
    }

    pub fn remove(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Removes sessions idle for longer than `ttl_secs`; returns the count removed.
    pub async fn cleanup_idle(&self, ttl_secs: u64) -> usize {
        let ttl = Duration::from_secs(ttl_secs);
        let mut stale = Vec::new();
        for entry in self.sessions.iter() {
            let last_active = *entry.value().last_active.lock().await;
            if last_active.elapsed() > ttl {
                stale.push(entry.key().clone());
            }
        }
        for id in &stale {
            self.sessions.remove(id);
        }
        stale.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_respects_max_sessions() {
        let manager = SessionManager::new(1);
        assert!(manager.create().is_ok());
        assert!(manager.create().is_err());
    }

    #[test]
    fn get_finds_created_session() {
        let manager = SessionManager::new(5);
        let session = manager.create().unwrap();
        assert!(manager.get(&session.id).is_some());
    }

    #[test]
    fn remove_drops_session() {
        let manager = SessionManager::new(5);
        let session = manager.create().unwrap();
        assert!(manager.remove(&session.id));
        assert!(manager.get(&session.id).is_none());
    }
}
