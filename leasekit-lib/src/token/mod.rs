//! # Signed Authentication Tokens
//!
//! Compact, HMAC-signed, time-bounded bearer tokens in the familiar
//! three-segment layout:
//!
//! ```text
//! base64url(header) . base64url(claims) . base64url(HMAC-SHA256(key, header "." claims))
//! ```
//!
//! All three segments use the URL-safe alphabet without padding. The header
//! is always `{"alg":"HS256","typ":"JWT"}`; claims are serialized with sorted
//! keys and no whitespace, so issuance is deterministic for identical claims
//! and timestamp.
//!
//! ## Expiry
//!
//! The service injects `iat` (issuance time, seconds since epoch) and
//! `exp` (`iat` + lifetime) into every token it issues, overwriting any
//! caller-supplied values. A token whose `exp` lies in the past fails
//! verification even when the signature is good.
//!
//! Tokens without an `exp` claim (never produced by this service, but
//! possible with a shared secret) are accepted by default. Use
//! [`ExpiryPolicy::Required`] to reject them.
//!
//! ## Failure reporting
//!
//! [`TokenService::verify`] collapses every failure into `None`, so request
//! handlers cannot branch on why a token was refused.
//! [`TokenService::verify_detailed`] returns the tagged [`TokenError`] for
//! diagnostics.

mod claims;
mod service;

pub use claims::TokenClaims;
pub use service::{ExpiryPolicy, TokenService, DEFAULT_LIFETIME_SECS, TOKEN_ALGORITHM, TOKEN_TYPE};

use crate::LeasekitError;

/// Why a token failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token has no expiry claim")]
    MissingExpiry,
}

impl From<TokenError> for LeasekitError {
    fn from(_: TokenError) -> Self {
        LeasekitError::InvalidToken
    }
}

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the token from an `Authorization` header value.
///
/// Only the literal, case-sensitive `Bearer ` prefix is recognised. Anything
/// else, including an empty token, is `None`.
///
/// ```
/// use leasekit_lib::token::extract_from_header;
///
/// assert_eq!(extract_from_header("Bearer abc.def.ghi"), Some("abc.def.ghi"));
/// assert_eq!(extract_from_header("Token abc"), None);
/// ```
pub fn extract_from_header(header: &str) -> Option<&str> {
    header
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_from_header("Bearer a.b.c"), Some("a.b.c"));
        assert_eq!(extract_from_header("Bearer   a.b.c  "), Some("a.b.c"));
    }

    #[test]
    fn test_extract_rejects_other_schemes() {
        assert_eq!(extract_from_header("Token abc"), None);
        assert_eq!(extract_from_header("bearer abc"), None);
        assert_eq!(extract_from_header("Basic dXNlcjpwYXNz"), None);
        assert_eq!(extract_from_header("Bearer"), None);
        assert_eq!(extract_from_header("Bearer    "), None);
        assert_eq!(extract_from_header(""), None);
    }

    #[test]
    fn test_token_error_collapses() {
        for err in [
            TokenError::Malformed,
            TokenError::BadSignature,
            TokenError::Expired,
            TokenError::MissingExpiry,
        ] {
            let err: LeasekitError = err.into();
            assert_eq!(err.code(), crate::LeasekitErrorCode::InvalidToken);
        }
    }
}
