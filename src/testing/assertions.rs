//! Assertion helpers for common patterns

use actix_web::dev::ServiceResponse;

use crate::session::cookie::DELETED_COOKIE_VALUE;
use crate::session::{StartOutcome, TokenDirective};

/// Assert the outcome tells the client to store a token and return it
///
/// # Panics
///
/// Panics if the directive is not [`TokenDirective::Set`]
#[must_use]
pub fn assert_token_set(outcome: &StartOutcome) -> String {
    match &outcome.token {
        TokenDirective::Set(token) => token.clone(),
        other => panic!("expected a new token, got {other:?}"),
    }
}

/// Value of the session cookie set by `response`, if any
#[must_use]
pub fn response_token<B>(response: &ServiceResponse<B>, cookie_name: &str) -> Option<String> {
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == cookie_name)
        .map(|cookie| cookie.value().to_string())
}

/// Assert that `response` tells the client to drop its session cookie
///
/// # Panics
///
/// Panics if no deleting cookie is present
pub fn assert_cookie_cleared<B>(response: &ServiceResponse<B>, cookie_name: &str) {
    assert_eq!(
        response_token(response, cookie_name).as_deref(),
        Some(DELETED_COOKIE_VALUE),
        "expected the session cookie to be cleared"
    );
}
