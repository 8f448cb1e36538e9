//! Session store error types
//!
//! Every failure the store can report is a typed outcome. Only the deferred
//! cleanup of rotated ids is fire-and-forget and never surfaces here.

use crate::utils::responses::ResponseBuilder;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};

/// Errors that can occur while starting, rotating or persisting a session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The random source could not produce a new session id (retryable)
    #[error("Could not generate session ID: {0}")]
    IdGeneration(String),

    /// Writing a session into the store failed
    #[error("Could not save session: {0}")]
    StoreWrite(String),

    /// A reference session points at a session that is no longer stored.
    ///
    /// Both fields hold token fingerprints, never raw ids.
    #[error("Reference session not found: {reference} -> {target}")]
    ReferenceNotFound { reference: String, target: String },

    /// The session is no longer valid and the client must start over
    #[error("Session expired")]
    SessionExpired,

    /// No authenticated user is bound to the request's session
    #[error("Not authenticated")]
    NotAuthenticated,
}

impl SessionError {
    /// Whether this error indicates an infrastructure or consistency fault
    /// rather than a client that simply has no usable session
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::IdGeneration(_) | Self::StoreWrite(_) | Self::ReferenceNotFound { .. }
        )
    }
}

impl ResponseError for SessionError {
    fn status_code(&self) -> StatusCode {
        if self.is_server_error() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::UNAUTHORIZED
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::SessionExpired => ResponseBuilder::unauthorized()
                .with_error_code("session_expired")
                .with_message("The session has expired, please sign in again")
                .build(),
            Self::NotAuthenticated => ResponseBuilder::unauthorized().build(),
            _ => ResponseBuilder::internal_server_error().build(),
        }
    }
}
