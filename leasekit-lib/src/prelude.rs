//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use leasekit_lib::prelude::*;
//! ```

// Error handling
pub use crate::errors::{LeasekitError, LeasekitErrorCode};
pub use crate::Result;

// Configuration
pub use crate::config::{ConfigSource, EnvConfig, MemoryConfig, RuntimeMode};

// Gateway
pub use crate::gateway::{
    generate_transaction_id, CinetPayClient, Channel, Channels, Customer, GatewayConfig,
    InitiatedPayment, PaymentGateway, PaymentState, TransactionRequest, TransactionStatus,
};

// Tokens
pub use crate::token::{ExpiryPolicy, TokenClaims, TokenError, TokenService};

// Field encryption
pub use crate::codec::{looks_encrypted, CodecError, FieldCipher};
