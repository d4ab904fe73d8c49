//! Session constants.
//!
//! Fixed values shared by the service, the stores and the transport.

/// Default lifetime of a signed access token, in seconds.
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 3600;

/// Longest accepted access token lifetime, in seconds (7 days).
pub const MAX_ACCESS_TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;

/// Default deadline for calls to the OAuth provider, in seconds.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

/// Random bytes in a state token or refresh token (128 bits).
pub const OPAQUE_TOKEN_BYTES: usize = 16;

/// Grant type sent on the code exchange.
pub const AUTHORIZATION_CODE_GRANT: &str = "authorization_code";

/// Path prefix under which the transport mounts the session routes.
pub const API_BASE_PATH: &str = "/api-private/v1/users";
