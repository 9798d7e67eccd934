//! Payment notification authentication.
//!
//! The aggregator posts a form to the notify URL with an `x-token` header:
//! the hex HMAC-SHA256, keyed by the account secret, of a fixed sequence of
//! form fields concatenated in order. A verified notification only says that
//! *something* changed; the authoritative state comes from a status check.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::keys;
use crate::{LeasekitError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Form fields covered by the notification token, in signing order.
pub const NOTIFICATION_FIELDS: [&str; 16] = [
    "cpm_site_id",
    "cpm_trans_id",
    "cpm_trans_date",
    "cpm_amount",
    "cpm_currency",
    "signature",
    "payment_method",
    "cel_phone_num",
    "cpm_phone_prefixe",
    "cpm_language",
    "cpm_version",
    "cpm_payment_config",
    "cpm_page_action",
    "cpm_custom",
    "cpm_designation",
    "cpm_error_message",
];

/// Compute the expected `x-token` for a notification form.
///
/// Absent fields contribute nothing.
pub fn notification_signature(secret: &str, form: &HashMap<String, String>) -> Result<String> {
    if secret.is_empty() {
        return Err(LeasekitError::config(
            keys::CINETPAY_SECRET_KEY,
            "notification secret is empty",
        ));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| LeasekitError::Internal(format!("HMAC key rejected: {}", e)))?;
    for field in NOTIFICATION_FIELDS {
        if let Some(value) = form.get(field) {
            mac.update(value.as_bytes());
        }
    }

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a notification's `x-token` header against its form.
///
/// Hex case is ignored. The comparison is constant-time.
pub fn verify_notification(
    secret: &str,
    form: &HashMap<String, String>,
    x_token: &str,
) -> Result<bool> {
    let expected = notification_signature(secret, form)?;
    let presented = x_token.trim().to_ascii_lowercase();
    Ok(expected.as_bytes().ct_eq(presented.as_bytes()).into())
}
