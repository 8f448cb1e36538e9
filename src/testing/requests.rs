//! HTTP request builders for testing handlers

use actix_web::cookie::Cookie;
use actix_web::test::TestRequest;

use crate::models::{SignInRequest, UserId};

/// Builds requests against the session endpoints
pub struct RequestBuilder;

impl RequestBuilder {
    /// `GET /auth/session`, optionally presenting a token
    #[must_use]
    pub fn session_status(token: Option<&str>) -> TestRequest {
        Self::with_token(TestRequest::get().uri("/auth/session"), token)
    }

    /// `GET /auth/user`
    #[must_use]
    pub fn current_user(token: Option<&str>) -> TestRequest {
        Self::with_token(TestRequest::get().uri("/auth/user"), token)
    }

    /// `POST /auth/sign_in` for `user`
    #[must_use]
    pub fn sign_in(token: Option<&str>, user: UserId, exclusive: bool) -> TestRequest {
        Self::with_token(TestRequest::post().uri("/auth/sign_in"), token).set_json(SignInRequest {
            user_id: user,
            exclusive,
        })
    }

    /// `POST /auth/sign_out`
    #[must_use]
    pub fn sign_out(token: Option<&str>) -> TestRequest {
        Self::with_token(TestRequest::post().uri("/auth/sign_out"), token)
    }

    fn with_token(request: TestRequest, token: Option<&str>) -> TestRequest {
        match token {
            Some(token) => request.cookie(Cookie::new("id", token.to_string())),
            None => request,
        }
    }
}
