//! Mock objects and fake implementations for testing
//!
//! Predictable collaborators for the session lifecycle: ids that can be
//! told apart in assertions and a store whose writes can be made to fail.

use crate::models::UserId;
use crate::session::{Session, SessionCache, SessionError, SessionIdGenerator, SessionStore};
use base64::{engine::general_purpose, Engine as _};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Id generator yielding well-formed ids from a counter
///
/// Can be switched into a failing mode to simulate an exhausted random source.
#[derive(Debug, Default)]
pub struct SequenceIdGenerator {
    next: AtomicU64,
    failing: AtomicBool,
}

impl SequenceIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The id returned by the `n`th successful call (zero based)
    #[must_use]
    pub fn id_for(n: u64) -> String {
        general_purpose::STANDARD.encode(u128::from(n).to_be_bytes())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of ids handed out so far
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl SessionIdGenerator for SequenceIdGenerator {
    fn generate(&self) -> Result<String, SessionError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SessionError::IdGeneration(
                "random source unavailable".to_string(),
            ));
        }
        Ok(Self::id_for(self.next.fetch_add(1, Ordering::SeqCst)))
    }
}

/// Session cache whose writes can be made to fail
pub struct FailingStore {
    inner: SessionCache,
    fail_writes: AtomicBool,
    /// Writes still allowed before every further write fails
    write_budget: Mutex<Option<usize>>,
}

impl FailingStore {
    #[must_use]
    pub fn new(max_size: i64) -> Self {
        Self {
            inner: SessionCache::new(max_size),
            fail_writes: AtomicBool::new(false),
            write_budget: Mutex::new(None),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    /// Let the next `successes` writes through, then fail until reset with
    /// [`FailingStore::clear_write_budget`]
    pub fn fail_after(&self, successes: usize) {
        *self.write_budget.lock() = Some(successes);
    }

    pub fn clear_write_budget(&self) {
        *self.write_budget.lock() = None;
    }

    fn take_write(&self) -> bool {
        if self.fail_writes.load(Ordering::SeqCst) {
            return false;
        }
        match &mut *self.write_budget.lock() {
            None => true,
            Some(0) => false,
            Some(remaining) => {
                *remaining -= 1;
                true
            }
        }
    }
}

impl SessionStore for FailingStore {
    fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.inner.get(id)
    }

    fn set(&self, session: Arc<Session>) -> Result<(), SessionError> {
        if !self.take_write() {
            return Err(SessionError::StoreWrite("store unavailable".to_string()));
        }
        self.inner.set(session)
    }

    fn delete(&self, id: &str) {
        self.inner.delete(id);
    }

    fn sessions(&self) -> Vec<Arc<Session>> {
        self.inner.sessions()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn sessions_for_user(&self, user: UserId) -> Vec<Arc<Session>> {
        self.inner.sessions_for_user(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::id::is_well_formed;

    #[test]
    fn test_sequence_ids_are_well_formed_and_distinct() {
        let ids = SequenceIdGenerator::new();
        let first = ids.generate().unwrap();
        let second = ids.generate().unwrap();
        assert!(is_well_formed(&first));
        assert_ne!(first, second);
        assert_eq!(first, SequenceIdGenerator::id_for(0));
        assert_eq!(ids.issued(), 2);
    }

    #[test]
    fn test_failing_modes() {
        let ids = SequenceIdGenerator::new();
        ids.set_failing(true);
        assert!(matches!(ids.generate(), Err(SessionError::IdGeneration(_))));

        let store = FailingStore::new(4);
        store.set_failing(true);
        let session = Arc::new(Session::new(SequenceIdGenerator::id_for(0), chrono::Utc::now()));
        assert!(matches!(store.set(session), Err(SessionError::StoreWrite(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_write_budget() {
        let store = FailingStore::new(4);
        store.fail_after(1);
        let now = chrono::Utc::now();
        assert!(store.set(Arc::new(Session::new(SequenceIdGenerator::id_for(0), now))).is_ok());
        assert!(store.set(Arc::new(Session::new(SequenceIdGenerator::id_for(1), now))).is_err());

        store.clear_write_budget();
        assert!(store.set(Arc::new(Session::new(SequenceIdGenerator::id_for(1), now))).is_ok());
        assert_eq!(store.len(), 2);
    }
}
