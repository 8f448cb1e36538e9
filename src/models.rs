use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an authenticated principal bound to a session
///
/// The store never validates credentials; it only compares these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub sessions: usize,
}

/// Body returned by the session status endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub user_id: Option<UserId>,
}

impl SessionStatus {
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            user_id: None,
        }
    }

    #[must_use]
    pub fn for_user(user: Option<UserId>) -> Self {
        Self {
            authenticated: user.is_some(),
            user_id: user,
        }
    }
}

/// Body accepted by the development sign-in endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub exclusive: bool,
}
