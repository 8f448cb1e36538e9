//! Unified testing utilities for Sessionvault
//!
//! Deterministic collaborators for the session lifecycle plus helpers for
//! driving the HTTP handlers.
//!
//! ## Organization
//!
//! - [`fixtures`] - Fixed clock, settings and cookie factories
//! - [`builders`] - Fluent builder for a fully wired [`SessionManager`](crate::session::SessionManager)
//! - [`requests`] - HTTP request builders for testing handlers
//! - [`assertions`] - Assertion helpers for token directives and cookies
//! - [`mock`] - Predictable id generators and a store that fails on demand
//!
//! ## Usage
//!
//! ```ignore
//! use sessionvault::testing::builders::TestManagerBuilder;
//! use chrono::Duration;
//!
//! let harness = TestManagerBuilder::new().with_max_cache_size(2).build();
//! let session = harness.manager.start(None, true).unwrap().session.unwrap();
//! harness.clock.advance(Duration::minutes(10));
//! assert!(harness.manager.start(Some(&session.id()), false).unwrap().session.is_some());
//! ```

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod mock;
pub mod requests;

// Re-export commonly used items for convenience
pub use assertions::*;
pub use builders::{SessionHarness, TestManagerBuilder};
pub use fixtures::{ManualClock, TestFixtures};
pub use requests::RequestBuilder;

/// Common test constants
pub mod constants {
    use crate::models::UserId;

    /// Default signed-in user
    pub const TEST_USER: UserId = UserId(42);

    /// A second user for exclusivity checks
    pub const OTHER_USER: UserId = UserId(7);

    /// Start of time for [`ManualClock`](super::ManualClock), seconds since the epoch
    pub const TEST_EPOCH_SECS: i64 = 1_700_000_000;
}
