//! Payment aggregator client.
//!
//! [`PaymentGateway`] is the seam between rent collection and the
//! aggregator; [`CinetPayClient`] is the production implementation.
//!
//! # Example
//!
//! ```no_run
//! use leasekit_lib::gateway::{CinetPayClient, GatewayConfig, PaymentGateway, TransactionRequest};
//! use rust_decimal::Decimal;
//!
//! # async fn run() -> leasekit_lib::Result<()> {
//! let client = CinetPayClient::new(GatewayConfig::new("api-key", "105"))?;
//! let request = TransactionRequest::new("RENT-2024-07", Decimal::from(150_000));
//! let payment = client.initiate(&request).await?;
//! println!("redirect tenant to {}", payment.payment_url);
//! # Ok(())
//! # }
//! ```

mod cinetpay;
mod config;
mod notify;
mod types;

pub use cinetpay::CinetPayClient;
pub use config::{GatewayConfig, DEFAULT_BASE_URL};
pub use notify::{notification_signature, verify_notification, NOTIFICATION_FIELDS};
pub use types::{
    Channel, Channels, Customer, InitiatedPayment, PaymentState, TransactionRequest,
    TransactionStatus, STATUS_CODE_OK,
};

use async_trait::async_trait;

use crate::Result;

/// A payment aggregator.
///
/// Implementations must not retry on their own.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a checkout and return where to redirect the payer.
    async fn initiate(&self, request: &TransactionRequest) -> Result<InitiatedPayment>;

    /// Ask the aggregator for a transaction's current status.
    async fn verify_status(&self, transaction_id: &str) -> Result<TransactionStatus>;

    /// Whether credentials are present. Unconfigured gateways fail every call.
    fn is_configured(&self) -> bool;
}

/// Generate a unique transaction id: `{prefix}-{uuid}`.
pub fn generate_transaction_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}
