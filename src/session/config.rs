//! Timing rules for session expiry and id rotation.

use chrono::Duration;

/// Default maximum age of a session id before it is rotated.
pub const DEFAULT_ID_EXPIRY: Duration = Duration::hours(1);

/// Default time a rotated-out id keeps resolving to its replacement.
pub const DEFAULT_ID_GRACE_PERIOD: Duration = Duration::minutes(5);

/// Timing configuration consumed by the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    /// Maximum idle time before a session dies. `None` means sessions never
    /// expire from inactivity alone.
    pub session_expiry: Option<Duration>,

    /// Maximum age of a session id before a mandatory rotation. Zero rotates
    /// on every request.
    pub id_expiry: Duration,

    /// How long a rotated-out id stays valid as a reference session.
    pub id_grace_period: Duration,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            session_expiry: None,
            id_expiry: DEFAULT_ID_EXPIRY,
            id_grace_period: DEFAULT_ID_GRACE_PERIOD,
        }
    }
}

impl SessionTimeouts {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the idle expiry.
    #[must_use]
    pub fn with_session_expiry(mut self, expiry: Duration) -> Self {
        self.session_expiry = Some(expiry);
        self
    }

    /// Set the id rotation interval.
    #[must_use]
    pub fn with_id_expiry(mut self, expiry: Duration) -> Self {
        self.id_expiry = expiry;
        self
    }

    /// Set the grace period for rotated-out ids.
    #[must_use]
    pub fn with_id_grace_period(mut self, grace: Duration) -> Self {
        self.id_grace_period = grace;
        self
    }

    /// Age after which even a reference session's id is past all use.
    #[must_use]
    pub fn id_lifetime(&self) -> Duration {
        self.id_expiry
            .checked_add(&self.id_grace_period)
            .unwrap_or(Duration::MAX)
    }
}
