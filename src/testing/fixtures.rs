//! Test fixtures providing pre-built test objects

use crate::session::{Clock, CookieFactory, SessionTimeouts};
use crate::settings::{ApplicationSettings, CookieSettings, SessionSettings, SessionVaultSettings};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use super::constants::TEST_EPOCH_SECS;

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Clock starting at [`TestFixtures::epoch`]
    #[must_use]
    pub fn at_epoch() -> Self {
        Self::new(TestFixtures::epoch())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Fixed instant every manual clock starts from
    #[must_use]
    pub fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(TEST_EPOCH_SECS, 0).unwrap_or_default()
    }

    /// Timeouts with idle expiry enabled, matching the default rotation rules
    #[must_use]
    pub fn timeouts() -> SessionTimeouts {
        SessionTimeouts::default().with_session_expiry(Duration::hours(24))
    }

    /// Cookie settings usable over plain HTTP test requests
    #[must_use]
    pub fn cookie_settings() -> CookieSettings {
        CookieSettings {
            secure: false,
            ..CookieSettings::default()
        }
    }

    #[must_use]
    pub fn cookie_factory() -> CookieFactory {
        CookieFactory::new(Self::cookie_settings())
    }

    /// Session settings with a small cache
    #[must_use]
    pub fn session_settings() -> SessionSettings {
        SessionSettings {
            max_cache_size: 64,
            ..SessionSettings::default()
        }
    }

    /// Full settings with development sign-in enabled
    #[must_use]
    pub fn settings() -> SessionVaultSettings {
        SessionVaultSettings {
            application: ApplicationSettings {
                dev_sign_in: true,
                ..ApplicationSettings::default()
            },
            session: Self::session_settings(),
            cookies: Self::cookie_settings(),
            ..SessionVaultSettings::default()
        }
    }
}
