//! The session entity and the operations that mutate it
//!
//! A [`Session`] keeps its fields behind its own lock. Callers only reach them
//! through methods, and no method holds that lock while it talks to the store,
//! so the store's table lock and a session lock are never taken in the order
//! session-then-table. Rotations of one session are serialized by a separate
//! rotation lock, which is always taken before any other.
//!
//! ## Id rotation
//!
//! Rotating a session moves the live entry to a fresh id and leaves a
//! *reference session* under the old id that forwards to the new one. Parallel
//! requests still carrying the old token resolve through it during the grace
//! period instead of losing their session. References are always one hop:
//! a rotation repoints every older reference at the newest id. The old id is removed after the
//! grace period by a best-effort cleanup task; lookups check expiry anyway,
//! so a missed cleanup only costs a cache slot.

use crate::models::UserId;
use crate::session::cleanup::CleanupScheduler;
use crate::session::config::SessionTimeouts;
use crate::session::errors::SessionError;
use crate::session::id::SessionIdGenerator;
use crate::session::store::SessionStore;
use crate::utils::crypto::fingerprint;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Collaborators a session needs for operations that write to the store
pub struct SessionContext<'a> {
    pub store: &'a Arc<dyn SessionStore>,
    pub ids: &'a dyn SessionIdGenerator,
    pub timeouts: &'a SessionTimeouts,
    pub cleanup: &'a CleanupScheduler,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct SessionState {
    id: String,
    user: Option<UserId>,
    created_at: DateTime<Utc>,
    last_access: DateTime<Utc>,
    reference_target: Option<String>,
}

/// One client's session
#[derive(Debug)]
pub struct Session {
    state: RwLock<SessionState>,
    rotation: Mutex<()>,
}

impl Session {
    /// Create an anonymous session whose id was issued at `now`
    #[must_use]
    pub fn new(id: String, now: DateTime<Utc>) -> Self {
        Self::with_state(SessionState {
            id,
            user: None,
            created_at: now,
            last_access: now,
            reference_target: None,
        })
    }

    /// Create a session with explicit timestamps
    #[must_use]
    pub fn with_timestamps(
        id: String,
        created_at: DateTime<Utc>,
        last_access: DateTime<Utc>,
    ) -> Self {
        Self::with_state(SessionState {
            id,
            user: None,
            created_at,
            last_access,
            reference_target: None,
        })
    }

    /// Create a reference session stored under `old_id` that forwards to `target`
    ///
    /// Reference sessions never carry a user.
    #[must_use]
    pub fn reference(
        old_id: String,
        target: String,
        created_at: DateTime<Utc>,
        last_access: DateTime<Utc>,
    ) -> Self {
        Self::with_state(SessionState {
            id: old_id,
            user: None,
            created_at,
            last_access,
            reference_target: Some(target),
        })
    }

    fn with_state(state: SessionState) -> Self {
        Self {
            state: RwLock::new(state),
            rotation: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn id(&self) -> String {
        self.state.read().id.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<UserId> {
        self.state.read().user
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.state.read().created_at
    }

    /// The last time this session was validated and used
    #[must_use]
    pub fn last_access(&self) -> DateTime<Utc> {
        self.state.read().last_access
    }

    /// Id of the newer session that replaced this one, for reference sessions
    #[must_use]
    pub fn reference_target(&self) -> Option<String> {
        self.state.read().reference_target.clone()
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.state.read().reference_target.is_some()
    }

    /// Point a reference session at `target`. No-op for live sessions.
    pub(crate) fn retarget(&self, target: &str) {
        let mut state = self.state.write();
        if state.reference_target.is_some() {
            state.reference_target = Some(target.to_string());
        }
    }

    pub fn touch(&self, now: DateTime<Utc>) {
        self.state.write().last_access = now;
    }

    /// Whether this session must no longer be used
    ///
    /// A reference session dies once it has gone unused for the grace period.
    /// Any session dies once it has been idle for the session expiry *and*
    /// its id is older than the id expiry plus grace period.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, timeouts: &SessionTimeouts) -> bool {
        let state = self.state.read();
        let idle = now - state.last_access;
        let age = now - state.created_at;

        let reference_lapsed =
            state.reference_target.is_some() && idle >= timeouts.id_grace_period;
        let idle_expired = timeouts
            .session_expiry
            .is_some_and(|expiry| idle >= expiry)
            && age >= timeouts.id_lifetime();

        reference_lapsed || idle_expired
    }

    /// Replace this session's id with a freshly generated one
    ///
    /// The session is stored under the new id, a reference session forwarding
    /// to it is stored under the old id, and deletion of the old id is
    /// scheduled after the grace period. Returns the new id.
    ///
    /// # Errors
    ///
    /// Returns an error if id generation fails (nothing is mutated) or if a
    /// store write fails. If the first write fails the old id is restored; if
    /// the reference write fails the session stays valid under its new id and
    /// the old id is revoked.
    pub fn regenerate_id(self: &Arc<Self>, ctx: &SessionContext<'_>) -> Result<String, SessionError> {
        self.rotate(ctx, None).map(|rotated| rotated.unwrap_or_else(|| self.id()))
    }

    /// Rotate only if the session still carries `expected_id`
    ///
    /// Returns `None` when another request already rotated it, so that two
    /// requests racing on the same stale token produce a single rotation.
    pub(crate) fn regenerate_id_from(
        self: &Arc<Self>,
        expected_id: &str,
        ctx: &SessionContext<'_>,
    ) -> Result<Option<String>, SessionError> {
        self.rotate(ctx, Some(expected_id))
    }

    fn rotate(
        self: &Arc<Self>,
        ctx: &SessionContext<'_>,
        expected_id: Option<&str>,
    ) -> Result<Option<String>, SessionError> {
        let _rotating = self.rotation.lock();
        if expected_id.is_some_and(|expected| expected != self.state.read().id) {
            return Ok(None);
        }

        let new_id = ctx.ids.generate()?;

        let (old_id, old_created_at) = {
            let mut state = self.state.write();
            let old_id = std::mem::replace(&mut state.id, new_id.clone());
            let old_created_at = std::mem::replace(&mut state.created_at, ctx.now);
            (old_id, old_created_at)
        };

        if let Err(e) = ctx.store.set(Arc::clone(self)) {
            let mut state = self.state.write();
            state.id = old_id;
            state.created_at = old_created_at;
            return Err(e);
        }

        // Older references move to the new id before the old id becomes a
        // reference itself, so every reference always names a live session
        for older in ctx.store.references_to(&old_id) {
            older.retarget(&new_id);
        }

        let reference = Session::reference(old_id.clone(), new_id.clone(), ctx.now, ctx.now);
        if let Err(e) = ctx.store.set(Arc::new(reference)) {
            // The old key still maps to this session; it must not stay usable
            ctx.store.delete(&old_id);
            warn!(
                "Could not store reference for rotated session {}, old id revoked",
                fingerprint(&old_id)
            );
            return Err(e);
        }

        debug!(
            "Rotated session {} -> {}",
            fingerprint(&old_id),
            fingerprint(&new_id)
        );

        ctx.cleanup
            .schedule_delete(Arc::clone(ctx.store), old_id, ctx.timeouts.id_grace_period);

        Ok(Some(new_id))
    }

    /// Bind `user` to this session and rotate its id
    ///
    /// With `exclusive`, every other session bound to `user` is logged out
    /// first and passed to `on_invalidated`; otherwise only this session's
    /// previous user is logged out. Returns the new session id.
    ///
    /// # Errors
    ///
    /// Returns an error if a store write or the id rotation fails. The
    /// previous user binding is restored in that case, so a failed login
    /// never leaves the user bound under the unrotated id.
    pub fn log_in<F>(
        self: &Arc<Self>,
        user: UserId,
        exclusive: bool,
        ctx: &SessionContext<'_>,
        mut on_invalidated: F,
    ) -> Result<String, SessionError>
    where
        F: FnMut(&Arc<Session>),
    {
        if exclusive {
            for other in ctx.store.sessions_for_user(user) {
                if Arc::ptr_eq(&other, self) {
                    continue;
                }
                other.log_out();
                ctx.store.set(Arc::clone(&other))?;
                on_invalidated(&other);
            }
        }

        let previous = std::mem::replace(&mut self.state.write().user, Some(user));

        let result = ctx
            .store
            .set(Arc::clone(self))
            .and_then(|()| self.regenerate_id(ctx));

        match result {
            Ok(new_id) => {
                info!("User {user} logged into session {}", fingerprint(&new_id));
                Ok(new_id)
            }
            Err(e) => {
                self.state.write().user = previous;
                Err(e)
            }
        }
    }

    /// Unbind the current user, returning it
    ///
    /// Does nothing for anonymous sessions. The id is not rotated and the
    /// store is not written; the caller decides whether to persist.
    pub fn log_out(&self) -> Option<UserId> {
        self.state.write().user.take()
    }

    /// Remove this session from the store, along with every reference
    /// session still forwarding to it
    ///
    /// The session must not be used after this call.
    pub fn destroy(&self, store: &dyn SessionStore) {
        let id = self.id();
        store.delete(&id);
        for reference in store.references_to(&id) {
            store.delete(&reference.id());
        }
        debug!("Destroyed session {}", fingerprint(&id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::cache::SessionCache;
    use chrono::{Duration, TimeZone};

    struct CountingIds(parking_lot::Mutex<u32>);

    impl SessionIdGenerator for CountingIds {
        fn generate(&self) -> Result<String, SessionError> {
            let mut next = self.0.lock();
            *next += 1;
            Ok(format!("{:0>24}", *next))
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn timeouts() -> SessionTimeouts {
        SessionTimeouts::new()
            .with_session_expiry(Duration::hours(2))
            .with_id_expiry(Duration::hours(1))
            .with_id_grace_period(Duration::minutes(5))
    }

    #[test]
    fn test_touch_updates_last_access() {
        let session = Session::new("a".repeat(24), t0());
        session.touch(t0() + Duration::minutes(3));
        assert_eq!(session.last_access(), t0() + Duration::minutes(3));
        assert_eq!(session.created_at(), t0());
    }

    #[test]
    fn test_idle_expiry_requires_old_id() {
        let timeouts = timeouts();
        let session = Session::new("a".repeat(24), t0());

        // Idle long enough, but the id is younger than id expiry + grace
        let fresh_id = Session::with_timestamps("b".repeat(24), t0(), t0() - Duration::hours(3));
        assert!(!fresh_id.is_expired(t0(), &timeouts));

        assert!(!session.is_expired(t0() + Duration::minutes(64), &timeouts));
        assert!(session.is_expired(t0() + Duration::hours(2), &timeouts));
    }

    #[test]
    fn test_no_session_expiry_never_idles_out() {
        let timeouts = SessionTimeouts::new();
        let session = Session::new("a".repeat(24), t0());
        assert!(!session.is_expired(t0() + Duration::days(3650), &timeouts));
    }

    #[test]
    fn test_reference_expires_after_grace_period() {
        let timeouts = timeouts();
        let reference = Session::reference("a".repeat(24), "b".repeat(24), t0(), t0());

        assert!(!reference.is_expired(t0() + Duration::minutes(4), &timeouts));
        assert!(reference.is_expired(t0() + Duration::minutes(5), &timeouts));
    }

    #[test]
    fn test_log_out_is_idempotent() {
        let session = Session::new("a".repeat(24), t0());
        assert_eq!(session.log_out(), None);
        assert_eq!(session.log_out(), None);
        assert_eq!(session.user(), None);
    }

    #[test]
    fn test_regenerate_leaves_reference_behind() {
        let store: Arc<dyn SessionStore> = Arc::new(SessionCache::new(16));
        let ids = CountingIds(parking_lot::Mutex::new(0));
        let cleanup = CleanupScheduler::disabled();
        let timeouts = timeouts();
        let now = t0() + Duration::hours(1);
        let ctx = SessionContext {
            store: &store,
            ids: &ids,
            timeouts: &timeouts,
            cleanup: &cleanup,
            now,
        };

        let session = Arc::new(Session::new("z".repeat(24), t0()));
        store.set(Arc::clone(&session)).unwrap();

        let new_id = session.regenerate_id(&ctx).unwrap();
        assert_eq!(session.id(), new_id);
        assert_eq!(session.created_at(), now);

        let reference = store.get(&"z".repeat(24)).unwrap();
        assert_eq!(reference.reference_target(), Some(new_id.clone()));
        assert_eq!(reference.user(), None);
        assert!(Arc::ptr_eq(&store.get(&new_id).unwrap(), &session));
    }

    #[test]
    fn test_conditional_rotation_skips_already_rotated_session() {
        let store: Arc<dyn SessionStore> = Arc::new(SessionCache::new(16));
        let ids = CountingIds(parking_lot::Mutex::new(0));
        let cleanup = CleanupScheduler::disabled();
        let timeouts = timeouts();
        let ctx = SessionContext {
            store: &store,
            ids: &ids,
            timeouts: &timeouts,
            cleanup: &cleanup,
            now: t0(),
        };

        let session = Arc::new(Session::new("z".repeat(24), t0()));
        store.set(Arc::clone(&session)).unwrap();

        let first = session.regenerate_id_from(&"z".repeat(24), &ctx).unwrap();
        assert!(first.is_some());
        let second = session.regenerate_id_from(&"z".repeat(24), &ctx).unwrap();
        assert!(second.is_none());
        assert_eq!(store.len(), 2);
        // The skipped rotation did not draw an id
        assert_eq!(*ids.0.lock(), 1);
    }

    #[test]
    fn test_rotation_repoints_older_references() {
        let store: Arc<dyn SessionStore> = Arc::new(SessionCache::new(16));
        let ids = CountingIds(parking_lot::Mutex::new(0));
        let cleanup = CleanupScheduler::disabled();
        let timeouts = timeouts();
        let ctx = SessionContext {
            store: &store,
            ids: &ids,
            timeouts: &timeouts,
            cleanup: &cleanup,
            now: t0(),
        };

        let session = Arc::new(Session::new("z".repeat(24), t0()));
        store.set(Arc::clone(&session)).unwrap();

        let middle = session.regenerate_id(&ctx).unwrap();
        let newest = session.regenerate_id(&ctx).unwrap();

        let first = store.get(&"z".repeat(24)).unwrap();
        let second = store.get(&middle).unwrap();
        assert_eq!(first.reference_target(), Some(newest.clone()));
        assert_eq!(second.reference_target(), Some(newest));
    }

    #[test]
    fn test_destroy_removes_forwarding_references() {
        let store: Arc<dyn SessionStore> = Arc::new(SessionCache::new(16));
        let ids = CountingIds(parking_lot::Mutex::new(0));
        let cleanup = CleanupScheduler::disabled();
        let timeouts = timeouts();
        let ctx = SessionContext {
            store: &store,
            ids: &ids,
            timeouts: &timeouts,
            cleanup: &cleanup,
            now: t0(),
        };

        let session = Arc::new(Session::new("z".repeat(24), t0()));
        store.set(Arc::clone(&session)).unwrap();
        session.regenerate_id(&ctx).unwrap();
        session.regenerate_id(&ctx).unwrap();
        assert_eq!(store.len(), 3);

        session.destroy(store.as_ref());
        assert!(store.is_empty());
    }
}
