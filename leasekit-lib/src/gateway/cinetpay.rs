//! CinetPay checkout API client.
//!
//! Two independent calls, both JSON over HTTPS POST:
//!
//! - `POST {base}/payment` creates a checkout and returns `data.payment_url`.
//! - `POST {base}/payment/check` reports the status of a transaction by id.
//!
//! Every response body is treated as untrusted. Missing fields are
//! [`ProtocolViolation`](crate::LeasekitError::ProtocolViolation)s, never
//! panics, and never a silent success.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use url::{Host, Url};

use super::config::GatewayConfig;
use super::notify;
use super::types::{InitiatedPayment, TransactionRequest, TransactionStatus};
use super::PaymentGateway;
use crate::config::{keys, ConfigSource, RuntimeMode};
use crate::{LeasekitError, Result};

const OP_INITIATE: &str = "initiate";
const OP_VERIFY: &str = "verify_status";

/// CinetPay checkout client.
///
/// Credentials are resolved once at construction. The client never retries:
/// blind retry of an initiation could create a duplicate charge, so retry
/// policy belongs to the caller.
#[derive(Debug)]
pub struct CinetPayClient {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl CinetPayClient {
    /// Create a client with the given configuration.
    ///
    /// # Errors
    ///
    /// Fails if the base URL is not https (plain http is accepted for
    /// loopback hosts only), the timeout is zero, or the HTTP client cannot
    /// be built.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        validate_base_url(&config.base_url)?;
        config.validate_timeout()?;

        // Certificate verification stays at the reqwest default (enabled).
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LeasekitError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create a client from a settings source.
    pub fn from_config(source: &dyn ConfigSource, mode: RuntimeMode) -> Result<Self> {
        Self::new(GatewayConfig::from_config(source, mode)?)
    }

    /// Get the configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the full URL for an API endpoint.
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.config.is_configured() {
            Ok(())
        } else {
            Err(LeasekitError::config(
                keys::CINETPAY_API_KEY,
                "gateway credentials (API key and site id) are not configured",
            ))
        }
    }

    /// Build the initiation payload.
    ///
    /// Customer fields are merged last and win over generated fields.
    pub fn build_payload(&self, request: &TransactionRequest) -> Result<Map<String, Value>> {
        let config = &self.config;
        let mut payload = Map::new();

        payload.insert("apikey".into(), config.api_key.clone().into());
        payload.insert("site_id".into(), config.site_id.clone().into());
        payload.insert(
            "transaction_id".into(),
            request.transaction_id.clone().into(),
        );
        payload.insert("amount".into(), amount_value(request.amount));
        payload.insert(
            "currency".into(),
            request
                .currency
                .clone()
                .unwrap_or_else(|| config.currency.clone())
                .into(),
        );
        if let Some(description) = &request.description {
            payload.insert("description".into(), description.clone().into());
        }
        if let Some(url) = request.notify_url.as_ref().or(config.notify_url.as_ref()) {
            payload.insert("notify_url".into(), url.clone().into());
        }
        if let Some(url) = request.return_url.as_ref().or(config.return_url.as_ref()) {
            payload.insert("return_url".into(), url.clone().into());
        }
        payload.insert(
            "channels".into(),
            request
                .channels
                .as_ref()
                .unwrap_or(&config.channels)
                .as_param()
                .into(),
        );
        payload.insert(
            "lang".into(),
            request
                .lang
                .clone()
                .unwrap_or_else(|| config.lang.clone())
                .into(),
        );
        if let Some(metadata) = &request.metadata {
            payload.insert(
                "metadata".into(),
                Value::String(serde_json::to_string(metadata)?),
            );
        }
        if let Some(invoice_data) = &request.invoice_data {
            payload.insert("invoice_data".into(), Value::Object(invoice_data.clone()));
        }
        for (key, value) in &request.customer_fields {
            payload.insert(key.clone(), value.clone());
        }

        Ok(payload)
    }

    /// POST a JSON body and decode a JSON object response.
    ///
    /// Returns the decoded object and the raw body text.
    async fn post_json(
        &self,
        operation: &'static str,
        path: &str,
        body: &Map<String, Value>,
    ) -> Result<(Map<String, Value>, String)> {
        let url = self.url(path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(operation, e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            LeasekitError::transport(operation, format!("failed to read response: {}", e), None)
        })?;

        #[cfg(feature = "tracing")]
        tracing::debug!(operation, status = status.as_u16(), len = text.len(), "aggregator responded");

        if !status.is_success() {
            return Err(LeasekitError::transport(
                operation,
                format!("aggregator returned HTTP {}", status.as_u16()),
                Some(text),
            ));
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok((map, text)),
            Ok(_) => Err(LeasekitError::protocol(
                operation,
                "response is not a JSON object",
                Some(text),
            )),
            Err(e) => Err(LeasekitError::protocol(
                operation,
                format!("response is not JSON: {}", e),
                Some(text),
            )),
        }
    }

    /// Map reqwest errors to transport failures.
    fn map_reqwest_error(&self, operation: &'static str, e: reqwest::Error) -> LeasekitError {
        let reason = if e.is_timeout() {
            format!("request timed out after {}s", self.config.timeout_secs)
        } else if e.is_connect() {
            format!("connection to {} failed: {}", self.config.base_url, e)
        } else {
            format!("request failed: {}", e)
        };
        LeasekitError::transport(operation, reason, None)
    }

    /// Authenticate a payment notification posted to the notify URL.
    ///
    /// `x_token` is the value of the `x-token` header. Needs the notification
    /// secret; a valid notification still has to be confirmed with
    /// [`verify_status`](PaymentGateway::verify_status).
    pub fn verify_notification(
        &self,
        form: &HashMap<String, String>,
        x_token: &str,
    ) -> Result<bool> {
        let secret = self.config.secret_key.as_deref().ok_or_else(|| {
            LeasekitError::config(keys::CINETPAY_SECRET_KEY, "notification secret is not set")
        })?;
        notify::verify_notification(secret, form, x_token)
    }
}

#[async_trait]
impl PaymentGateway for CinetPayClient {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self, request), fields(transaction_id = %request.transaction_id))
    )]
    async fn initiate(&self, request: &TransactionRequest) -> Result<InitiatedPayment> {
        self.ensure_configured()?;
        request.validate()?;

        let payload = self.build_payload(request)?;
        let (body, raw) = self.post_json(OP_INITIATE, "payment", &payload).await?;

        let data = body.get("data");
        let payment_url = data
            .and_then(|d| d.get("payment_url"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                LeasekitError::protocol(
                    OP_INITIATE,
                    "response has no data.payment_url",
                    Some(raw.clone()),
                )
            })?
            .to_string();
        validate_redirect_url(&payment_url)
            .map_err(|reason| LeasekitError::protocol(OP_INITIATE, reason, Some(raw.clone())))?;
        let payment_token = data
            .and_then(|d| d.get("payment_token"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(InitiatedPayment {
            transaction_id: request.transaction_id.clone(),
            payment_url,
            payment_token,
            raw: body,
        })
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    async fn verify_status(&self, transaction_id: &str) -> Result<TransactionStatus> {
        self.ensure_configured()?;
        if transaction_id.trim().is_empty() {
            return Err(LeasekitError::invalid_data(
                "transaction_id",
                "transaction id cannot be empty",
            ));
        }

        let mut payload = Map::new();
        payload.insert("apikey".into(), self.config.api_key.clone().into());
        payload.insert("site_id".into(), self.config.site_id.clone().into());
        payload.insert("transaction_id".into(), transaction_id.into());

        let (body, raw) = self.post_json(OP_VERIFY, "payment/check", &payload).await?;

        let code = match body.get("code") {
            Some(Value::String(code)) if !code.is_empty() => code.clone(),
            Some(Value::Number(code)) => code.to_string(),
            _ => {
                return Err(LeasekitError::protocol(
                    OP_VERIFY,
                    "response has no status code",
                    Some(raw),
                ))
            }
        };
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);
        let status = body
            .get("data")
            .and_then(|d| d.get("status"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(TransactionStatus {
            transaction_id: transaction_id.to_string(),
            code,
            message,
            status,
            raw: body,
        })
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }
}

/// Whole amounts go out as JSON integers, others as JSON numbers.
fn amount_value(amount: Decimal) -> Value {
    let normalized = amount.normalize();
    if normalized.scale() == 0 {
        if let Some(whole) = normalized.to_i64() {
            return Value::from(whole);
        }
    }
    let rendered = normalized.to_string();
    match rendered.parse::<f64>() {
        Ok(float) if float.is_finite() => Value::from(float),
        _ => Value::String(rendered),
    }
}

fn validate_base_url(base_url: &str) -> Result<()> {
    let url = Url::parse(base_url).map_err(|e| {
        LeasekitError::config(keys::CINETPAY_BASE_URL, format!("invalid URL: {}", e))
    })?;
    let loopback = match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    };
    match url.scheme() {
        "https" => Ok(()),
        "http" if loopback => Ok(()),
        scheme => Err(LeasekitError::config(
            keys::CINETPAY_BASE_URL,
            format!("scheme '{}' not allowed; the aggregator must be reached over https", scheme),
        )),
    }
}

/// A redirect URL must be absolute http(s) with a host.
fn validate_redirect_url(candidate: &str) -> std::result::Result<(), String> {
    let url = Url::parse(candidate).map_err(|e| format!("payment_url is malformed: {}", e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("payment_url has scheme '{}'", url.scheme()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("payment_url has no host".to_string());
    }
    Ok(())
}
