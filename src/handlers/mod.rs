//! HTTP request handlers for the session endpoints

pub mod health;
pub mod helpers;
pub mod session;


use actix_web::web;

use crate::settings::ApplicationSettings;

// Re-export the main handler functions
pub use health::health;
pub use session::{current_user, session_status, sign_in, sign_out};

/// Mount the session endpoints
pub fn configure_services(cfg: &mut web::ServiceConfig, application: &ApplicationSettings) {
    cfg.route("/auth/session", web::get().to(session_status))
        .route("/auth/user", web::get().to(current_user))
        .route("/auth/sign_out", web::post().to(sign_out))
        .route("/ping", web::get().to(health));

    if application.dev_sign_in {
        cfg.route("/auth/sign_in", web::post().to(sign_in));
    }
}
