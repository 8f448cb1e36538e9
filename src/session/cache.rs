//! Bounded in-memory session table with oldest-access eviction.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::Mutex;

use crate::session::entity::Session;
use crate::session::errors::SessionError;
use crate::session::store::SessionStore;
use crate::utils::crypto::fingerprint;

/// Default maximum number of cached sessions.
pub const DEFAULT_MAX_CACHE_SIZE: i64 = 1024 * 1024;

/// Session cache keyed by session id.
///
/// Every table operation runs under a single mutex. The compaction scan reads
/// each session's last access time under that session's read lock while the
/// table lock is held; nothing in the crate takes the locks the other way
/// round.
pub struct SessionCache {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    /// `None` means unbounded.
    max_size: Option<usize>,
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CACHE_SIZE)
    }
}

impl SessionCache {
    /// Create a cache holding at most `max_size` sessions.
    ///
    /// `0` caches nothing at all, a negative value never evicts.
    #[must_use]
    pub fn new(max_size: i64) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_size: usize::try_from(max_size).ok(),
        }
    }

    /// The configured capacity, `None` when unbounded.
    #[must_use]
    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    /// Evict the least recently accessed sessions until `required_space` more
    /// entries fit. Returns the number of evicted sessions.
    pub fn compact(&self, required_space: usize) -> usize {
        let mut sessions = self.sessions.lock();
        self.compact_locked(&mut sessions, required_space, None)
    }

    fn compact_locked(
        &self,
        sessions: &mut HashMap<String, Arc<Session>>,
        required_space: usize,
        protected: Option<&str>,
    ) -> usize {
        let Some(max_size) = self.max_size else {
            return 0;
        };
        let required_space = required_space.min(max_size);

        let mut dropped = 0;
        while sessions.len() + required_space > max_size {
            let oldest = sessions
                .iter()
                .filter(|(id, _)| Some(id.as_str()) != protected)
                .min_by_key(|(_, session)| session.last_access())
                .map(|(id, _)| id.clone());

            let Some(oldest) = oldest else {
                break;
            };
            sessions.remove(&oldest);
            trace!("Evicted session {} from cache", fingerprint(&oldest));
            dropped += 1;
        }

        if dropped > 0 {
            debug!(
                "Compacted session cache: {dropped} evicted, {} remaining",
                sessions.len()
            );
        }
        dropped
    }
}

impl SessionStore for SessionCache {
    fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.lock().get(id).cloned()
    }

    fn set(&self, session: Arc<Session>) -> Result<(), SessionError> {
        // Read the key before taking the table lock.
        let id = session.id();

        let mut sessions = self.sessions.lock();
        let required_space = usize::from(!sessions.contains_key(&id));
        self.compact_locked(&mut sessions, required_space, Some(&id));

        if self.max_size != Some(0) {
            sessions.insert(id, session);
        }
        Ok(())
    }

    fn delete(&self, id: &str) {
        self.sessions.lock().remove(id);
    }

    fn sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.lock().values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.sessions.lock().len()
    }
}
