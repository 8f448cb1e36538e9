//! Session endpoints: status, current user, sign-in and sign-out

use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, info};

use crate::handlers::helpers::{require_user, start_session};
use crate::models::{SessionStatus, SignInRequest};
use crate::session::{CookieFactory, SessionError, SessionManager};
use crate::utils::responses::ResponseBuilder;

/// `GET /auth/session` - report the session state, creating a session if needed
///
/// # Errors
///
/// Returns an error if the session could not be started
pub async fn session_status(
    req: HttpRequest,
    manager: web::Data<SessionManager>,
    cookies: web::Data<CookieFactory>,
) -> Result<HttpResponse, SessionError> {
    let started = start_session(&req, &manager, &cookies, true)?;
    let user = started.session.as_ref().and_then(|session| session.user());

    Ok(ResponseBuilder::ok()
        .with_optional_cookie(started.cookie)
        .json(&SessionStatus::for_user(user)))
}

/// `GET /auth/user` - the authenticated user, or 401
///
/// # Errors
///
/// Returns an error if no user is bound to the request's session
pub async fn current_user(
    req: HttpRequest,
    manager: web::Data<SessionManager>,
    cookies: web::Data<CookieFactory>,
) -> Result<HttpResponse, SessionError> {
    match require_user(&req, &manager, &cookies) {
        Ok((user, cookie)) => Ok(ResponseBuilder::ok()
            .with_optional_cookie(cookie)
            .json(&SessionStatus::for_user(Some(user)))),
        Err(SessionError::SessionExpired) => Ok(ResponseBuilder::unauthorized()
            .with_error_code("session_expired")
            .with_message("The session has expired, please sign in again")
            .with_cookie(cookies.expired_cookie())
            .build()),
        Err(e) => Err(e),
    }
}

/// `POST /auth/sign_in` - bind a user to the request's session
///
/// Only mounted when development sign-in is enabled; a real deployment binds
/// users after verifying credentials elsewhere.
///
/// # Errors
///
/// Returns an error if the session could not be started or the login failed
pub async fn sign_in(
    req: HttpRequest,
    body: web::Json<SignInRequest>,
    manager: web::Data<SessionManager>,
    cookies: web::Data<CookieFactory>,
) -> Result<HttpResponse, SessionError> {
    let request = body.into_inner();
    let started = start_session(&req, &manager, &cookies, true)?;
    let session = started.session.ok_or(SessionError::NotAuthenticated)?;

    let token = manager.log_in(&session, request.user_id, request.exclusive)?;
    info!("User {} signed in", request.user_id);

    Ok(ResponseBuilder::ok()
        .with_optional_cookie(Some(cookies.session_cookie(&token)))
        .json(&SessionStatus::for_user(Some(request.user_id))))
}

/// `POST /auth/sign_out` - end the request's session and clear the cookie
///
/// # Errors
///
/// Returns an error if the session could not be started
pub async fn sign_out(
    req: HttpRequest,
    manager: web::Data<SessionManager>,
    cookies: web::Data<CookieFactory>,
) -> Result<HttpResponse, SessionError> {
    let started = start_session(&req, &manager, &cookies, false)?;

    if let Some(session) = started.session {
        if let Some(user) = session.log_out() {
            info!("User {user} signed out");
        }
        manager.destroy(&session);
    } else {
        debug!("Sign out without a live session");
    }

    Ok(ResponseBuilder::ok()
        .with_optional_cookie(Some(cookies.expired_cookie()))
        .json(&SessionStatus::anonymous()))
}
