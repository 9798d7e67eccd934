//! Test utilities for Leasekit.
//!
//! - [`MockGateway`]: in-memory [`PaymentGateway`](crate::gateway::PaymentGateway)
//!   with scripted responses and call recording
//! - Fixtures for requests, claims and keys
//!
//! ## Usage
//!
//! ```rust,ignore
//! use leasekit_lib::test_utils::{MockGateway, TestFixtures};
//!
//! let gateway = MockGateway::new();
//! gateway.set_status("RENT-1", "00", Some("ACCEPTED"));
//!
//! let status = gateway.verify_status("RENT-1").await?;
//! assert!(status.is_accepted());
//! ```

mod fixtures;
mod mock_gateway;

pub use fixtures::{test_cipher, test_claims, test_request, TestFixtures};
pub use mock_gateway::{GatewayCall, MockGateway};
