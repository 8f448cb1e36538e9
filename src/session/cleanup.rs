//! Deferred, best-effort deletion of rotated-out session ids
//!
//! Deletion after the grace period only bounds memory. Lookups already treat
//! a lapsed reference session as expired, so a task that never runs (no
//! runtime, process exit, cancelled on shutdown) is harmless.

use crate::session::store::SessionStore;
use crate::utils::crypto::fingerprint;
use chrono::Duration;
use log::debug;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// Spawns delayed store deletions on a tokio runtime
pub struct CleanupScheduler {
    runtime: Option<Handle>,
    pending: Mutex<Vec<AbortHandle>>,
}

impl CleanupScheduler {
    #[must_use]
    pub fn new(runtime: Option<Handle>) -> Self {
        Self {
            runtime,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Schedule on the runtime the caller is running in, if any
    #[must_use]
    pub fn current() -> Self {
        Self::new(Handle::try_current().ok())
    }

    /// A scheduler that drops every request
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Delete `id` from `store` once `delay` has elapsed
    ///
    /// Returns `false` if no runtime is available and the deletion was dropped.
    pub fn schedule_delete(&self, store: Arc<dyn SessionStore>, id: String, delay: Duration) -> bool {
        let Some(runtime) = &self.runtime else {
            debug!(
                "No runtime for deferred cleanup of session {}, leaving it to expiry",
                fingerprint(&id)
            );
            return false;
        };

        let delay = delay.to_std().unwrap_or_default();
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            store.delete(&id);
            debug!("Removed rotated session id {}", fingerprint(&id));
        });

        let mut pending = self.pending.lock();
        pending.retain(|handle| !handle.is_finished());
        pending.push(task.abort_handle());
        true
    }

    /// Number of deletions that have not run yet
    #[must_use]
    pub fn pending(&self) -> usize {
        let mut pending = self.pending.lock();
        pending.retain(|handle| !handle.is_finished());
        pending.len()
    }

    /// Cancel every pending deletion, returning how many were cancelled
    pub fn shutdown(&self) -> usize {
        let mut pending = self.pending.lock();
        let cancelled = pending.iter().filter(|handle| !handle.is_finished()).count();
        for handle in pending.drain(..) {
            handle.abort();
        }
        cancelled
    }
}

impl Default for CleanupScheduler {
    fn default() -> Self {
        Self::current()
    }
}
