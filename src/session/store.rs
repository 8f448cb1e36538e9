//! Storage seam for sessions
//!
//! The lifecycle manager only talks to this trait, so the in-memory
//! [`SessionCache`](crate::session::cache::SessionCache) can be swapped for
//! another backend or for a failure-injecting double in tests.

use crate::models::UserId;
use crate::session::entity::Session;
use crate::session::errors::SessionError;
use std::sync::Arc;

/// A key to session table
///
/// Implementations must never hold their own table lock while waiting on a
/// session's lock for writing.
pub trait SessionStore: Send + Sync {
    /// Look up a session by id. Does not update its last access time.
    fn get(&self, id: &str) -> Option<Arc<Session>>;

    /// Insert or replace a session under its current id
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StoreWrite` if the backend rejects the write
    fn set(&self, session: Arc<Session>) -> Result<(), SessionError>;

    /// Remove the entry for `id`. Absent ids are ignored.
    fn delete(&self, id: &str);

    /// All stored sessions, including reference sessions
    fn sessions(&self) -> Vec<Arc<Session>>;

    /// Number of stored entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sessions currently bound to `user`
    ///
    /// The default is a linear scan over a snapshot. Session locks are only
    /// taken after the snapshot is taken, never under the table lock.
    fn sessions_for_user(&self, user: UserId) -> Vec<Arc<Session>> {
        self.sessions()
            .into_iter()
            .filter(|session| session.user() == Some(user))
            .collect()
    }

    /// Reference sessions forwarding to `target`, found the same way
    fn references_to(&self, target: &str) -> Vec<Arc<Session>> {
        self.sessions()
            .into_iter()
            .filter(|session| session.reference_target().as_deref() == Some(target))
            .collect()
    }
}
