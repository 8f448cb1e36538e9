//! Session id generation
//!
//! Ids are 128 bits from the operating system's random source, encoded with
//! padded standard base64. That always yields exactly [`SESSION_ID_LENGTH`]
//! characters, which lets incoming tokens be rejected on shape alone before
//! the store is consulted.

use crate::session::errors::SessionError;
use base64::{engine::general_purpose, Engine as _};
use rand::rngs::OsRng;
use rand::TryRngCore;

/// Number of random bytes in a session id
pub const SESSION_ID_BYTES: usize = 16;

/// Length of an encoded session id
pub const SESSION_ID_LENGTH: usize = 24;

/// Source of new session ids
pub trait SessionIdGenerator: Send + Sync {
    /// Generate a fresh, unguessable session id
    ///
    /// # Errors
    ///
    /// Returns `SessionError::IdGeneration` if the random source is unavailable
    fn generate(&self) -> Result<String, SessionError>;
}

/// Generator backed by the operating system RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl SessionIdGenerator for RandomIdGenerator {
    fn generate(&self) -> Result<String, SessionError> {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| SessionError::IdGeneration(e.to_string()))?;
        Ok(general_purpose::STANDARD.encode(bytes))
    }
}

/// Check that a client-supplied token has the shape of a generated id
#[must_use]
pub fn is_well_formed(token: &str) -> bool {
    token.len() == SESSION_ID_LENGTH
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
}
