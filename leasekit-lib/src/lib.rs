//! Leasekit library.
//!
//! Integration primitives for a rental-management backend:
//!
//! - **Gateway**: initiate payments with the CinetPay checkout API and check
//!   transaction status, behind the [`gateway::PaymentGateway`] trait
//! - **Token**: issue and verify compact HMAC-SHA256 signed session tokens
//! - **Codec**: encrypt individual text fields at rest (AES-256-GCM)
//!
//! Each component is built from explicit configuration (see [`config`]) and
//! holds no global state.
//!
//! # Example
//!
//! ```
//! use leasekit_lib::codec::FieldCipher;
//! use leasekit_lib::token::{TokenClaims, TokenService};
//!
//! let tokens = TokenService::new("session-secret")?;
//! let token = tokens.issue(TokenClaims::new().with("sub", "tenant-42"))?;
//! assert_eq!(tokens.verify(&token).unwrap().subject(), Some("tenant-42"));
//!
//! let cipher = FieldCipher::from_passphrase("field-passphrase");
//! let stored = cipher.encrypt("+225 07 00 00 00")?;
//! assert_eq!(cipher.decrypt(&stored)?, "+225 07 00 00 00");
//! # Ok::<(), leasekit_lib::LeasekitError>(())
//! ```

pub mod codec;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod prelude;
pub mod token;

/// Test utilities for code built on this crate.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use errors::{LeasekitError, LeasekitErrorCode};

/// Common result alias for Leasekit operations.
pub type Result<T> = std::result::Result<T, LeasekitError>;
