//! Test fixtures.

use rust_decimal::Decimal;

use crate::codec::FieldCipher;
use crate::gateway::TransactionRequest;
use crate::token::TokenClaims;

/// Collection of commonly used test fixtures.
pub struct TestFixtures;

impl TestFixtures {
    /// Token signing secret.
    pub const TOKEN_SECRET: &'static str = "leasekit-test-secret";

    /// Passphrase for the field cipher.
    pub const CIPHER_PASSPHRASE: &'static str = "leasekit-test-passphrase";

    /// Sample rent amounts, in XOF.
    pub const SAMPLE_AMOUNTS: &'static [i64] = &[5_000, 75_000, 150_000, 450_000];

    /// Personal fields commonly encrypted at rest.
    pub const SENSITIVE_FIELDS: &'static [&'static str] = &["phone", "id_number", "iban"];

    /// Get a sample amount.
    pub fn sample_amount(index: usize) -> Decimal {
        Decimal::from(Self::SAMPLE_AMOUNTS[index % Self::SAMPLE_AMOUNTS.len()])
    }
}

/// A minimal valid transaction request.
pub fn test_request(transaction_id: &str) -> TransactionRequest {
    TransactionRequest::new(transaction_id, TestFixtures::sample_amount(2))
        .with_description("Monthly rent")
}

/// Claims for a tenant session.
pub fn test_claims(subject: &str) -> TokenClaims {
    TokenClaims::new()
        .with("sub", subject)
        .with("role", "tenant")
}

/// A cipher keyed from the fixture passphrase.
pub fn test_cipher() -> FieldCipher {
    FieldCipher::from_passphrase(TestFixtures::CIPHER_PASSPHRASE)
}
