#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the sessionvault application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod handlers;
pub mod models;
pub mod session;
pub mod settings;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use handlers::{configure_services, current_user, health, session_status, sign_in, sign_out};
pub use models::{SessionStatus, UserId};
pub use session::{CookieFactory, Session, SessionCache, SessionError, SessionManager};
pub use settings::SessionVaultSettings;
