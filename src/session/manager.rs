//! Session Manager - Server-Side Session Lifecycle
//!
//! The `SessionManager` turns an incoming client token into a live session.
//! It owns the collaborators every session operation needs (store, id
//! generator, clock, timing rules, cleanup scheduler) and is constructed once
//! at startup, then shared with every request handler.
//!
//! ## Starting a session
//!
//! 1. A missing or malformed token is treated as no session.
//! 2. An unknown token, or one whose session has expired, is no session; an
//!    expired session is destroyed on the way.
//! 3. A reference session is resolved to the session that replaced it and
//!    the client is told to switch to the new token.
//! 4. A live session whose id is older than the id expiry is rotated.
//! 5. Without a usable session, a new one is created when asked to.

use crate::models::UserId;
use crate::session::cache::SessionCache;
use crate::session::cleanup::CleanupScheduler;
use crate::session::clock::{Clock, SystemClock};
use crate::session::config::SessionTimeouts;
use crate::session::entity::{Session, SessionContext};
use crate::session::errors::SessionError;
use crate::session::id::{is_well_formed, RandomIdGenerator, SessionIdGenerator};
use crate::session::store::SessionStore;
use crate::settings::SessionSettings;
use crate::utils::crypto::fingerprint;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;

/// What the transport layer must do with the client-held token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenDirective {
    /// Keep whatever the client has
    Unchanged,
    /// Store this token on the client
    Set(String),
    /// Invalidate the client's token immediately
    Clear,
}

/// Result of [`SessionManager::start`]
#[derive(Debug)]
pub struct StartOutcome {
    pub session: Option<Arc<Session>>,
    pub token: TokenDirective,
}

// =============================================================================
// Session Manager Structure
// =============================================================================

/// Session lifecycle manager
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ids: Arc<dyn SessionIdGenerator>,
    clock: Arc<dyn Clock>,
    timeouts: SessionTimeouts,
    cleanup: CleanupScheduler,
}

// =============================================================================
// 1. Construction
// =============================================================================

impl SessionManager {
    /// Create a manager over `store` with random ids, the system clock and
    /// cleanup scheduled on the current tokio runtime (if any)
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, timeouts: SessionTimeouts) -> Self {
        Self {
            store,
            ids: Arc::new(RandomIdGenerator),
            clock: Arc::new(SystemClock),
            timeouts,
            cleanup: CleanupScheduler::current(),
        }
    }

    /// Create a manager with a fresh in-memory cache sized from settings
    #[must_use]
    pub fn from_settings(settings: &SessionSettings) -> Self {
        let store: Arc<dyn SessionStore> = Arc::new(SessionCache::new(settings.max_cache_size));
        Self::new(store, settings.timeouts())
    }

    /// Use a different id generator
    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<dyn SessionIdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Use a different clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a different cleanup scheduler
    #[must_use]
    pub fn with_cleanup(mut self, cleanup: CleanupScheduler) -> Self {
        self.cleanup = cleanup;
        self
    }
}

// =============================================================================
// 2. Session Start
// =============================================================================

impl SessionManager {
    /// Return the live session for `incoming`, creating one if requested
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A new id cannot be generated
    /// - The store rejects a write
    /// - A reference session points at a session that is gone
    pub fn start(
        &self,
        incoming: Option<&str>,
        create_if_absent: bool,
    ) -> Result<StartOutcome, SessionError> {
        let now = self.clock.now();
        let presented = incoming.is_some_and(|token| !token.is_empty());

        if let Some(token) = incoming.filter(|token| is_well_formed(token)) {
            match self.store.get(token) {
                Some(found) if found.is_expired(now, &self.timeouts) => {
                    debug!("Session {} expired, destroying it", fingerprint(token));
                    found.destroy(self.store.as_ref());
                }
                Some(found) => return self.resume(token, found, now),
                None => debug!("Unknown session token {}", fingerprint(token)),
            }
        } else if presented {
            warn!("Ignoring malformed session token");
        }

        if !create_if_absent {
            let token = if presented {
                TokenDirective::Clear
            } else {
                TokenDirective::Unchanged
            };
            return Ok(StartOutcome {
                session: None,
                token,
            });
        }

        let session = self.create(now)?;
        let id = session.id();
        Ok(StartOutcome {
            session: Some(session),
            token: TokenDirective::Set(id),
        })
    }

    fn resume(
        &self,
        token: &str,
        found: Arc<Session>,
        now: DateTime<Utc>,
    ) -> Result<StartOutcome, SessionError> {
        let session = match found.reference_target() {
            Some(target) => {
                let live = self.resolve_reference(token, target)?;
                if now - found.created_at() >= self.timeouts.id_lifetime() {
                    self.store.delete(token);
                }
                live
            }
            None => {
                if now - found.created_at() >= self.timeouts.id_expiry {
                    found.regenerate_id_from(token, &self.context(now))?;
                }
                found
            }
        };

        session.touch(now);

        let current = session.id();
        let token = if current == token {
            TokenDirective::Unchanged
        } else {
            TokenDirective::Set(current)
        };
        Ok(StartOutcome {
            session: Some(session),
            token,
        })
    }

    /// References are a single hop at rest. A rotation finishing between
    /// reading the reference and looking up its target turns that target into
    /// a reference as well, so one further hop is followed. Anything else is a
    /// lost or evicted target.
    fn resolve_reference(&self, token: &str, target: String) -> Result<Arc<Session>, SessionError> {
        let mut target = target;
        for _ in 0..2 {
            let Some(next) = self.store.get(&target) else {
                break;
            };
            match next.reference_target() {
                None => return Ok(next),
                Some(newer) => target = newer,
            }
        }

        error!(
            "Reference session {} points at missing session {}",
            fingerprint(token),
            fingerprint(&target)
        );
        Err(SessionError::ReferenceNotFound {
            reference: fingerprint(token),
            target: fingerprint(&target),
        })
    }

    fn create(&self, now: DateTime<Utc>) -> Result<Arc<Session>, SessionError> {
        let id = self.ids.generate()?;
        let session = Arc::new(Session::new(id, now));
        self.store.set(Arc::clone(&session))?;
        debug!("Created session {}", fingerprint(&session.id()));
        Ok(session)
    }
}

// =============================================================================
// 3. Identity Binding
// =============================================================================

impl SessionManager {
    /// Bind `user` to `session`, rotating its id. Returns the new token.
    ///
    /// # Errors
    ///
    /// Returns an error if a store write or the id rotation fails
    pub fn log_in(
        &self,
        session: &Arc<Session>,
        user: UserId,
        exclusive: bool,
    ) -> Result<String, SessionError> {
        let mut invalidated = 0usize;
        let token = session.log_in(user, exclusive, &self.context(self.clock.now()), |other| {
            invalidated += 1;
            debug!(
                "Logged user {user} out of session {}",
                fingerprint(&other.id())
            );
        })?;
        if invalidated > 0 {
            info!("Exclusive login for user {user} ended {invalidated} other session(s)");
        }
        Ok(token)
    }

    /// Give `session` a new id, leaving the old one resolvable for the grace
    /// period. Returns the new token.
    ///
    /// # Errors
    ///
    /// Returns an error if no id can be generated or the store rejects a write
    pub fn regenerate_id(&self, session: &Arc<Session>) -> Result<String, SessionError> {
        session.regenerate_id(&self.context(self.clock.now()))
    }

    /// Unbind the user from `session` and persist the change
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write
    pub fn log_out(&self, session: &Arc<Session>) -> Result<Option<UserId>, SessionError> {
        let previous = session.log_out();
        if let Some(user) = previous {
            self.store.set(Arc::clone(session))?;
            info!("User {user} logged out of session {}", fingerprint(&session.id()));
        }
        Ok(previous)
    }

    /// Log `user` out of every session it is bound to
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects a write
    pub fn log_out_user(&self, user: UserId) -> Result<usize, SessionError> {
        let sessions = self.store.sessions_for_user(user);
        for session in &sessions {
            session.log_out();
            self.store.set(Arc::clone(session))?;
        }
        info!("User {user} logged out of {} session(s)", sessions.len());
        Ok(sessions.len())
    }

    /// Remove `session` and every reference forwarding to it from the store
    pub fn destroy(&self, session: &Session) {
        session.destroy(self.store.as_ref());
    }
}

// =============================================================================
// 4. Housekeeping
// =============================================================================

impl SessionManager {
    /// Drop every expired session from the store. Returns how many went.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let expired: Vec<_> = self
            .store
            .sessions()
            .into_iter()
            .filter(|session| session.is_expired(now, &self.timeouts))
            .collect();
        for session in &expired {
            session.destroy(self.store.as_ref());
        }
        if !expired.is_empty() {
            debug!("Purged {} expired session(s)", expired.len());
        }
        expired.len()
    }

    /// Cancel pending deferred cleanups
    pub fn shutdown(&self) -> usize {
        self.cleanup.shutdown()
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn timeouts(&self) -> &SessionTimeouts {
        &self.timeouts
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    fn context(&self, now: DateTime<Utc>) -> SessionContext<'_> {
        SessionContext {
            store: &self.store,
            ids: self.ids.as_ref(),
            timeouts: &self.timeouts,
            cleanup: &self.cleanup,
            now,
        }
    }
}
