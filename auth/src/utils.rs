//! Utility functions for token generation.

use crate::constants::OPAQUE_TOKEN_BYTES;
use base64::Engine;

/// Generate a fresh opaque token.
///
/// Draws [`OPAQUE_TOKEN_BYTES`] random bytes and encodes them as URL-safe
/// base64 without padding, so the value can travel in query strings as-is.
///
/// # Examples
///
/// ```
/// use accounts_auth::utils::generate_opaque_token;
///
/// let token = generate_opaque_token();
/// assert_eq!(token.len(), 22);
/// assert_ne!(token, generate_opaque_token());
/// ```
#[must_use]
pub fn generate_opaque_token() -> String {
    let bytes: [u8; OPAQUE_TOKEN_BYTES] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
