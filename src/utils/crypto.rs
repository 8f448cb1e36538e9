// Cryptographic helpers shared by the session store

use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};

/// Number of digest bytes kept in a token fingerprint
pub const FINGERPRINT_BYTES: usize = 6;

/// Produce a short, non-reversible fingerprint of a session token
///
/// Session ids are bearer credentials and must never reach the logs. The
/// fingerprint is the first bytes of the token's SHA-256 digest, base64url
/// encoded, which is enough to correlate log lines for one session.
#[must_use]
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    general_purpose::URL_SAFE_NO_PAD.encode(&digest[..FINGERPRINT_BYTES])
}
