//! Helpers shared by the session handlers

use std::sync::Arc;

use actix_web::{cookie::Cookie, HttpRequest};

use crate::models::UserId;
use crate::session::{CookieFactory, Session, SessionError, SessionManager, TokenDirective};

/// Session resolved for a request together with the cookie the response must carry
pub struct RequestSession {
    pub session: Option<Arc<Session>>,
    pub cookie: Option<Cookie<'static>>,
}

/// Start the session for `req`, translating the token directive into a cookie
///
/// # Errors
///
/// Propagates any [`SessionError`] raised while starting the session
pub fn start_session(
    req: &HttpRequest,
    manager: &SessionManager,
    cookies: &CookieFactory,
    create: bool,
) -> Result<RequestSession, SessionError> {
    let token = cookies.token_from_request(req);
    let outcome = manager.start(token.as_deref(), create)?;
    Ok(RequestSession {
        cookie: cookies.cookie_for(&outcome.token),
        session: outcome.session,
    })
}

/// Resolve the authenticated user behind `req`
///
/// Returns the user and the cookie the response must carry. A request without
/// a live session is reported as [`SessionError::SessionExpired`] when it
/// presented a token and [`SessionError::NotAuthenticated`] otherwise.
///
/// # Errors
///
/// Fails when no user is bound to the request's session, or when starting the
/// session fails
pub fn require_user(
    req: &HttpRequest,
    manager: &SessionManager,
    cookies: &CookieFactory,
) -> Result<(UserId, Option<Cookie<'static>>), SessionError> {
    let token = cookies.token_from_request(req);
    let outcome = manager.start(token.as_deref(), false)?;
    let cookie = cookies.cookie_for(&outcome.token);
    match outcome.session.and_then(|session| session.user()) {
        Some(user) => Ok((user, cookie)),
        None if outcome.token == TokenDirective::Clear => Err(SessionError::SessionExpired),
        None => Err(SessionError::NotAuthenticated),
    }
}
