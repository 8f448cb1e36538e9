use actix_web::cookie::{time::Duration, time::OffsetDateTime, Cookie, SameSite};
use actix_web::HttpRequest;

use crate::session::manager::TokenDirective;
use crate::settings::CookieSettings;

/// Value written into a cookie that is being invalidated
pub const DELETED_COOKIE_VALUE: &str = "deleted";

/// Cookie factory for the session token cookie
///
/// Cookie attributes come from configuration and are passed through untouched;
/// the factory only fills in the token value.
#[derive(Debug, Clone)]
pub struct CookieFactory {
    settings: CookieSettings,
}

impl CookieFactory {
    /// Create a new cookie factory with the specified configuration
    #[must_use]
    pub fn new(settings: CookieSettings) -> Self {
        Self { settings }
    }

    /// Name of the session cookie
    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.settings.name
    }

    /// Extract the session token from the request, if the cookie is present
    #[must_use]
    pub fn token_from_request(&self, req: &HttpRequest) -> Option<String> {
        req.cookie(&self.settings.name)
            .map(|cookie| cookie.value().to_string())
    }

    /// Create the cookie carrying `token`
    #[must_use]
    pub fn session_cookie(&self, token: &str) -> Cookie<'static> {
        self.base_cookie(token.to_string())
            .max_age(Duration::seconds(self.settings.max_age_secs))
            .finish()
    }

    /// Create a cookie that makes the client drop its token immediately
    #[must_use]
    pub fn expired_cookie(&self) -> Cookie<'static> {
        self.base_cookie(DELETED_COOKIE_VALUE.to_string())
            .max_age(Duration::seconds(-1))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .finish()
    }

    /// Translate a token directive into the cookie to send, if any
    #[must_use]
    pub fn cookie_for(&self, directive: &TokenDirective) -> Option<Cookie<'static>> {
        match directive {
            TokenDirective::Unchanged => None,
            TokenDirective::Set(token) => Some(self.session_cookie(token)),
            TokenDirective::Clear => Some(self.expired_cookie()),
        }
    }

    fn base_cookie(&self, value: String) -> actix_web::cookie::CookieBuilder<'static> {
        let mut builder = Cookie::build(self.settings.name.clone(), value)
            .http_only(self.settings.http_only)
            .secure(self.settings.secure)
            .same_site(SameSite::Lax)
            .path(self.settings.path.clone());
        if let Some(domain) = &self.settings.domain {
            builder = builder.domain(domain.clone());
        }
        builder
    }
}
