//! Request and result types for the payment gateway.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{LeasekitError, Result};

/// A single payment channel offered on the checkout page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    MobileMoney,
    CreditCard,
    Wallet,
}

impl Channel {
    /// The aggregator's name for this channel.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MobileMoney => "MOBILE_MONEY",
            Self::CreditCard => "CREDIT_CARD",
            Self::Wallet => "WALLET",
        }
    }
}

impl FromStr for Channel {
    type Err = LeasekitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MOBILE_MONEY" => Ok(Self::MobileMoney),
            "CREDIT_CARD" => Ok(Self::CreditCard),
            "WALLET" => Ok(Self::Wallet),
            other => Err(LeasekitError::invalid_data(
                "channels",
                format!("unknown channel '{}'", other),
            )),
        }
    }
}

/// Allowed payment channels: everything, or an explicit set.
///
/// Sent to the aggregator as `"ALL"` or a comma-joined list such as
/// `"MOBILE_MONEY,WALLET"`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Channels {
    #[default]
    All,
    Only(BTreeSet<Channel>),
}

impl Channels {
    /// Restrict to the given channels. An empty set means all channels.
    pub fn only(channels: impl IntoIterator<Item = Channel>) -> Self {
        let set: BTreeSet<Channel> = channels.into_iter().collect();
        if set.is_empty() {
            Self::All
        } else {
            Self::Only(set)
        }
    }

    /// The wire value.
    pub fn as_param(&self) -> String {
        match self {
            Self::All => "ALL".to_string(),
            Self::Only(set) => set
                .iter()
                .map(Channel::as_str)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl fmt::Display for Channels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_param())
    }
}

impl FromStr for Channels {
    type Err = LeasekitError;

    fn from_str(s: &str) -> Result<Self> {
        let names: Vec<&str> = s
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            return Err(LeasekitError::invalid_data("channels", "no channel given"));
        }
        if names.iter().any(|n| n.eq_ignore_ascii_case("ALL")) {
            return Ok(Self::All);
        }
        names
            .into_iter()
            .map(Channel::from_str)
            .collect::<Result<BTreeSet<_>>>()
            .map(Self::Only)
    }
}

impl TryFrom<String> for Channels {
    type Error = LeasekitError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Channels> for String {
    fn from(channels: Channels) -> Self {
        channels.as_param()
    }
}

/// Customer profile fields accepted by the checkout API.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Customer {
    pub id: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    /// ISO 3166-1 alpha-2 country code.
    pub country: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

impl Customer {
    /// The set fields, under their wire names.
    pub fn into_fields(self) -> Map<String, Value> {
        [
            ("customer_id", self.id),
            ("customer_name", self.name),
            ("customer_surname", self.surname),
            ("customer_email", self.email),
            ("customer_phone_number", self.phone_number),
            ("customer_address", self.address),
            ("customer_city", self.city),
            ("customer_country", self.country),
            ("customer_state", self.state),
            ("customer_zip_code", self.zip_code),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), Value::String(v))))
        .collect()
    }
}

/// A payment to initiate.
///
/// Only the transaction id and amount are mandatory. Unset optional fields
/// fall back to the [`GatewayConfig`](super::GatewayConfig) defaults, or are
/// left out of the payload when there is no default.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionRequest {
    /// Caller-generated id, unique per aggregator account.
    pub transaction_id: String,
    /// Amount in the currency's native unit. Must be positive.
    pub amount: Decimal,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub notify_url: Option<String>,
    pub return_url: Option<String>,
    pub channels: Option<Channels>,
    pub lang: Option<String>,
    /// Sent to the aggregator as a JSON-encoded string.
    pub metadata: Option<Map<String, Value>>,
    /// Sent to the aggregator as a nested object.
    pub invoice_data: Option<Map<String, Value>>,
    /// Merged into the top level of the payload last, overriding any
    /// generated field with the same name.
    pub customer_fields: Map<String, Value>,
}

impl TransactionRequest {
    pub fn new(transaction_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            amount,
            currency: None,
            description: None,
            notify_url: None,
            return_url: None,
            channels: None,
            lang: None,
            metadata: None,
            invoice_data: None,
            customer_fields: Map::new(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_notify_url(mut self, url: impl Into<String>) -> Self {
        self.notify_url = Some(url.into());
        self
    }

    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = Some(url.into());
        self
    }

    pub fn with_channels(mut self, channels: Channels) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_invoice_data(mut self, invoice_data: Map<String, Value>) -> Self {
        self.invoice_data = Some(invoice_data);
        self
    }

    /// Merge customer profile fields.
    pub fn with_customer(mut self, customer: Customer) -> Self {
        self.customer_fields.extend(customer.into_fields());
        self
    }

    /// Set a single top-level customer field.
    pub fn with_customer_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.customer_fields.insert(key.into(), value.into());
        self
    }

    /// Check the mandatory fields.
    pub fn validate(&self) -> Result<()> {
        if self.transaction_id.trim().is_empty() {
            return Err(LeasekitError::invalid_data(
                "transaction_id",
                "transaction id cannot be empty",
            ));
        }
        if self.amount <= Decimal::ZERO {
            return Err(LeasekitError::invalid_data(
                "amount",
                format!("amount must be positive, got {}", self.amount),
            ));
        }
        Ok(())
    }
}

/// Outcome of a successful initiation.
#[derive(Clone, Debug, PartialEq)]
pub struct InitiatedPayment {
    pub transaction_id: String,
    /// Checkout page to redirect the customer to, exactly as returned.
    pub payment_url: String,
    pub payment_token: Option<String>,
    /// Full decoded response.
    pub raw: Map<String, Value>,
}

/// Coarse interpretation of a status-check response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentState {
    Accepted,
    Refused,
    Pending,
    /// A status this client does not interpret.
    Unknown(String),
}

/// Aggregator status code meaning the check itself succeeded.
pub const STATUS_CODE_OK: &str = "00";

const PENDING_CODES: [&str; 2] = ["662", "623"];

/// Outcome of a status check.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionStatus {
    pub transaction_id: String,
    /// Aggregator status code, normalised to a string.
    pub code: String,
    pub message: Option<String>,
    /// `data.status`, when present.
    pub status: Option<String>,
    /// Full decoded response, kept open because the aggregator owns its schema.
    pub raw: Map<String, Value>,
}

impl TransactionStatus {
    pub fn state(&self) -> PaymentState {
        match self.status.as_deref() {
            Some("ACCEPTED") => PaymentState::Accepted,
            Some("REFUSED") => PaymentState::Refused,
            Some(s) if s.starts_with("WAITING") || s == "PENDING" => PaymentState::Pending,
            Some(other) => PaymentState::Unknown(other.to_string()),
            None if self.code == STATUS_CODE_OK => PaymentState::Accepted,
            None if PENDING_CODES.contains(&self.code.as_str()) => PaymentState::Pending,
            None => PaymentState::Unknown(self.code.clone()),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.state() == PaymentState::Accepted
    }

    pub fn is_refused(&self) -> bool {
        self.state() == PaymentState::Refused
    }

    pub fn is_pending(&self) -> bool {
        self.state() == PaymentState::Pending
    }
}
