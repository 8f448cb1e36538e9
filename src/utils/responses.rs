//! HTTP response handling system
//!
//! This module provides a unified interface for the JSON responses returned by the
//! session endpoints, with cached bodies for the common error cases.

use actix_web::{cookie::Cookie, http::header, HttpResponse};
use serde_json::json;

// ===============================
// CACHED RESPONSES FOR PERFORMANCE
// ===============================

/// Global instance of pre-serialized common responses for performance
static CACHED_RESPONSES: std::sync::LazyLock<CachedResponses> =
    std::sync::LazyLock::new(CachedResponses::new);

/// Container for pre-serialized common HTTP response bodies
struct CachedResponses {
    unauthorized: String,
    server_error: String,
}

impl CachedResponses {
    fn new() -> Self {
        Self {
            unauthorized: Self::create_json(
                "unauthorized",
                "Authentication is required to access this resource",
            ),
            server_error: Self::create_json("server_error", "An internal server error occurred"),
        }
    }

    fn create_json(error: &str, description: &str) -> String {
        json!({
            "error": error,
            "error_description": description
        })
        .to_string()
    }

    fn unauthorized(&self) -> HttpResponse {
        HttpResponse::Unauthorized()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .body(self.unauthorized.clone())
    }

    fn server_error(&self) -> HttpResponse {
        HttpResponse::InternalServerError()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .body(self.server_error.clone())
    }
}

/// Unified response builder that handles all types of HTTP responses
pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Create an `Unauthorized` (401) error response with optional customization
    #[must_use]
    pub fn unauthorized() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(ErrorType::Unauthorized)
    }

    /// Create an `InternalServerError` (500) error response with optional customization
    #[must_use]
    pub fn internal_server_error() -> ErrorResponseBuilder {
        ErrorResponseBuilder::new(ErrorType::InternalServerError)
    }

    /// Create an OK response (200) with JSON content
    #[must_use]
    pub fn ok() -> JsonResponseBuilder {
        JsonResponseBuilder::new()
    }
}

/// Builder for error responses with fluent interface
pub struct ErrorResponseBuilder {
    error_type: ErrorType,
    error_code: Option<String>,
    message: Option<String>,
    cookies: Vec<Cookie<'static>>,
}

#[derive(Clone, Copy)]
enum ErrorType {
    Unauthorized,
    InternalServerError,
}

impl ErrorResponseBuilder {
    fn new(error_type: ErrorType) -> Self {
        Self {
            error_type,
            error_code: None,
            message: None,
            cookies: Vec::new(),
        }
    }

    /// Set a custom error code (e.g., "`session_expired`")
    #[must_use]
    pub fn with_error_code(mut self, code: &str) -> Self {
        self.error_code = Some(code.to_string());
        self
    }

    /// Set a custom error message
    #[must_use]
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    /// Attach a cookie, typically the one clearing a dead session token
    #[must_use]
    pub fn with_cookie(mut self, cookie: Cookie<'static>) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// Build the final `HttpResponse`
    #[must_use]
    pub fn build(self) -> HttpResponse {
        if self.error_code.is_none() && self.message.is_none() && self.cookies.is_empty() {
            return match self.error_type {
                ErrorType::Unauthorized => CACHED_RESPONSES.unauthorized(),
                ErrorType::InternalServerError => CACHED_RESPONSES.server_error(),
            };
        }

        let error_code = self
            .error_code
            .clone()
            .unwrap_or_else(|| self.default_error_code().to_string());
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| self.default_message().to_string());

        let mut response = match self.error_type {
            ErrorType::Unauthorized => HttpResponse::Unauthorized(),
            ErrorType::InternalServerError => HttpResponse::InternalServerError(),
        };
        for cookie in self.cookies {
            response.cookie(cookie);
        }

        response.json(json!({
            "error": error_code,
            "message": message,
        }))
    }

    fn default_error_code(&self) -> &'static str {
        match self.error_type {
            ErrorType::Unauthorized => "unauthorized",
            ErrorType::InternalServerError => "server_error",
        }
    }

    fn default_message(&self) -> &'static str {
        match self.error_type {
            ErrorType::Unauthorized => "Authentication is required to access this resource",
            ErrorType::InternalServerError => "An internal server error occurred",
        }
    }
}

/// Builder for JSON responses
pub struct JsonResponseBuilder {
    cookies: Vec<Cookie<'static>>,
}

impl JsonResponseBuilder {
    fn new() -> Self {
        Self {
            cookies: Vec::new(),
        }
    }

    /// Attach an optional cookie (the outgoing session token, when one is due)
    #[must_use]
    pub fn with_optional_cookie(mut self, cookie: Option<Cookie<'static>>) -> Self {
        self.cookies.extend(cookie);
        self
    }

    /// Build the response with JSON content
    #[must_use]
    pub fn json<T: serde::Serialize>(self, data: &T) -> HttpResponse {
        let mut builder = HttpResponse::Ok();
        for cookie in self.cookies {
            builder.cookie(cookie);
        }
        builder.json(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_unified_error_responses() {
        let response = ResponseBuilder::unauthorized().build();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = ResponseBuilder::internal_server_error().build();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_response_carries_cookie() {
        let response = ResponseBuilder::unauthorized()
            .with_error_code("session_expired")
            .with_cookie(Cookie::new("id", "deleted"))
            .build();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.cookies().count(), 1);
    }

    #[test]
    fn test_json_response_builder() {
        let data = json!({"authenticated": false});
        let response = ResponseBuilder::ok().with_optional_cookie(None).json(&data);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.cookies().count(), 0);

        let response = ResponseBuilder::ok()
            .with_optional_cookie(Some(Cookie::new("id", "abc")))
            .json(&data);
        assert_eq!(response.cookies().count(), 1);
    }
}
