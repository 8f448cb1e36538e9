//! Session Management Module
//!
//! Server-side sessions identified by an opaque cookie token.
//!
//! # Modules
//!
//! - [`cache`] - Bounded in-memory session table with oldest-access eviction
//! - [`cleanup`] - Deferred deletion of rotated-out ids
//! - [`clock`] - Time source
//! - [`config`] - Expiry and rotation timing
//! - [`cookie`] - Token transport through cookies
//! - [`entity`] - The session itself: rotation, login, logout
//! - [`errors`] - Error types
//! - [`id`] - Session id generation
//! - [`manager`] - Session lifecycle (start, resolve, rotate, create)
//! - [`store`] - Storage trait

pub mod cache;
pub mod cleanup;
pub mod clock;
pub mod config;
pub mod cookie;
pub mod entity;
pub mod errors;
pub mod id;
pub mod manager;
pub mod store;

// Re-export commonly used items for convenience
pub use cache::SessionCache;
pub use cleanup::CleanupScheduler;
pub use clock::{Clock, SystemClock};
pub use config::SessionTimeouts;
pub use cookie::CookieFactory;
pub use entity::{Session, SessionContext};
pub use errors::SessionError;
pub use id::{RandomIdGenerator, SessionIdGenerator, SESSION_ID_LENGTH};
pub use manager::{SessionManager, StartOutcome, TokenDirective};
pub use store::SessionStore;
