//! Error types for leasekit operations.
//!
//! One crate-wide error, [`LeasekitError`], is returned by every public
//! operation. The token and codec modules carry their own finer-grained
//! errors ([`TokenError`](crate::token::TokenError),
//! [`CodecError`](crate::codec::CodecError)) which convert into it.
//!
//! Nothing in this crate retries. Gateway failures carry the raw aggregator
//! response (when one was received) so the caller can audit-log it and decide.

use std::fmt;

/// Error codes for CLI exit statuses and foreign callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum LeasekitErrorCode {
    /// Network, TLS, timeout or non-2xx response
    Transport = 2000,
    /// Aggregator response missing required fields or not JSON
    ProtocolViolation = 2100,
    /// Token is malformed, badly signed or expired
    InvalidToken = 3000,
    /// Encryption failed
    Encryption = 4000,
    /// Decryption failed
    Decryption = 4001,
    /// Required configuration missing or invalid
    Config = 5000,
    /// Invalid caller input
    InvalidData = 5001,
    /// Serialization error
    Serialization = 5002,
    /// Internal/unexpected error
    Internal = 9999,
}

/// Comprehensive error type for leasekit operations.
#[derive(Debug)]
pub enum LeasekitError {
    /// The aggregator could not be reached, or answered with a non-2xx status.
    Transport {
        /// Operation in flight (e.g. "initiate", "verify_status")
        operation: &'static str,
        /// Underlying error message
        reason: String,
        /// Raw response body, if one was received
        raw_response: Option<String>,
    },

    /// The aggregator answered, but not with the shape the protocol requires.
    ProtocolViolation {
        /// Operation in flight
        operation: &'static str,
        /// What was missing or malformed
        reason: String,
        /// Raw response body
        raw_response: Option<String>,
    },

    /// Token failed verification. The cause is intentionally not exposed here.
    InvalidToken,

    /// Encryption failed.
    Encryption(String),

    /// Decryption failed (wrong key, corrupted or tampered blob).
    Decryption(String),

    /// Required configuration value missing or unusable.
    Config {
        /// Configuration key
        key: String,
        /// Reason it was rejected
        reason: String,
    },

    /// Invalid data provided by the caller.
    InvalidData {
        /// Field or parameter name
        field: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Serialization/deserialization error.
    Serialization(String),

    /// Internal/unexpected error.
    Internal(String),
}

impl LeasekitError {
    /// Get the error code.
    pub fn code(&self) -> LeasekitErrorCode {
        match self {
            Self::Transport { .. } => LeasekitErrorCode::Transport,
            Self::ProtocolViolation { .. } => LeasekitErrorCode::ProtocolViolation,
            Self::InvalidToken => LeasekitErrorCode::InvalidToken,
            Self::Encryption(_) => LeasekitErrorCode::Encryption,
            Self::Decryption(_) => LeasekitErrorCode::Decryption,
            Self::Config { .. } => LeasekitErrorCode::Config,
            Self::InvalidData { .. } => LeasekitErrorCode::InvalidData,
            Self::Serialization(_) => LeasekitErrorCode::Serialization,
            Self::Internal(_) => LeasekitErrorCode::Internal,
        }
    }

    /// Get the error message as an owned String.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Raw aggregator response attached to a gateway failure.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::Transport { raw_response, .. } | Self::ProtocolViolation { raw_response, .. } => {
                raw_response.as_deref()
            }
            _ => None,
        }
    }

    /// True for the single gateway `Failure` kind (transport or protocol).
    pub fn is_gateway_failure(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::ProtocolViolation { .. })
    }

    /// Create a transport error.
    pub fn transport(
        operation: &'static str,
        reason: impl Into<String>,
        raw_response: Option<String>,
    ) -> Self {
        Self::Transport {
            operation,
            reason: reason.into(),
            raw_response,
        }
    }

    /// Create a protocol violation error.
    pub fn protocol(
        operation: &'static str,
        reason: impl Into<String>,
        raw_response: Option<String>,
    ) -> Self {
        Self::ProtocolViolation {
            operation,
            reason: reason.into(),
            raw_response,
        }
    }

    /// Create a configuration error.
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for LeasekitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport {
                operation, reason, ..
            } => write!(f, "{} transport failure: {}", operation, reason),
            Self::ProtocolViolation {
                operation, reason, ..
            } => write!(f, "{} protocol violation: {}", operation, reason),
            Self::InvalidToken => write!(f, "invalid token"),
            Self::Encryption(msg) => write!(f, "encryption failed: {}", msg),
            Self::Decryption(msg) => write!(f, "decryption failed: {}", msg),
            Self::Config { key, reason } => {
                write!(f, "configuration '{}' rejected: {}", key, reason)
            }
            Self::InvalidData { field, reason } => write!(f, "invalid {}: {}", field, reason),
            Self::Serialization(msg) => write!(f, "serialization error: {}", msg),
            Self::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for LeasekitError {}

impl From<serde_json::Error> for LeasekitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
