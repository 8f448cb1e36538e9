//! Fluent builders for creating customizable test objects

use crate::session::{CleanupScheduler, SessionManager, SessionStore, SessionTimeouts};
use std::sync::Arc;

use super::fixtures::{ManualClock, TestFixtures};
use super::mock::{FailingStore, SequenceIdGenerator};

/// A manager together with handles on its collaborators
pub struct SessionHarness {
    pub manager: SessionManager,
    pub clock: Arc<ManualClock>,
    pub ids: Arc<SequenceIdGenerator>,
    pub store: Arc<FailingStore>,
}

/// Builder for a [`SessionManager`] wired to deterministic collaborators
pub struct TestManagerBuilder {
    max_cache_size: i64,
    timeouts: SessionTimeouts,
    cleanup: Option<CleanupScheduler>,
}

impl TestManagerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_cache_size: 64,
            timeouts: TestFixtures::timeouts(),
            cleanup: None,
        }
    }

    #[must_use]
    pub fn with_max_cache_size(mut self, max_cache_size: i64) -> Self {
        self.max_cache_size = max_cache_size;
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: SessionTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Schedule deferred deletions on the current runtime instead of dropping them
    #[must_use]
    pub fn with_runtime_cleanup(mut self) -> Self {
        self.cleanup = Some(CleanupScheduler::current());
        self
    }

    #[must_use]
    pub fn build(self) -> SessionHarness {
        let clock = Arc::new(ManualClock::at_epoch());
        let ids = Arc::new(SequenceIdGenerator::new());
        let store = Arc::new(FailingStore::new(self.max_cache_size));
        let shared: Arc<dyn SessionStore> = store.clone();

        let manager = SessionManager::new(shared, self.timeouts)
            .with_clock(clock.clone())
            .with_id_generator(ids.clone())
            .with_cleanup(self.cleanup.unwrap_or_else(CleanupScheduler::disabled));

        SessionHarness {
            manager,
            clock,
            ids,
            store,
        }
    }
}

impl Default for TestManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
