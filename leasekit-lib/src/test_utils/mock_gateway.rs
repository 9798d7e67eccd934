//! In-memory payment gateway.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::gateway::{InitiatedPayment, PaymentGateway, TransactionRequest, TransactionStatus};
use crate::{LeasekitError, Result};

/// A call received by [`MockGateway`].
#[derive(Clone, Debug, PartialEq)]
pub enum GatewayCall {
    Initiate(TransactionRequest),
    VerifyStatus(String),
}

/// Scripted [`PaymentGateway`] for tests of code built on the trait.
///
/// Initiation succeeds with a URL under `checkout_base` unless a failure is
/// queued. Status checks answer from the statuses set with
/// [`set_status`](Self::set_status), or fail with a protocol violation.
pub struct MockGateway {
    checkout_base: String,
    configured: bool,
    statuses: RwLock<HashMap<String, (String, Option<String>)>>,
    failures: RwLock<VecDeque<LeasekitError>>,
    calls: RwLock<Vec<GatewayCall>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            checkout_base: "https://checkout.test/pay".to_string(),
            configured: true,
            statuses: RwLock::new(HashMap::new()),
            failures: RwLock::new(VecDeque::new()),
            calls: RwLock::new(Vec::new()),
        }
    }

    /// A gateway that reports itself unconfigured and fails every call.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    /// Set the status answered for a transaction.
    pub fn set_status(&self, transaction_id: &str, code: &str, status: Option<&str>) {
        self.statuses.write().unwrap().insert(
            transaction_id.to_string(),
            (code.to_string(), status.map(str::to_string)),
        );
    }

    /// Queue a failure; queued failures are returned in order, one per call.
    pub fn fail_next(&self, error: LeasekitError) {
        self.failures.write().unwrap().push_back(error);
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.read().unwrap().clone()
    }

    fn record(&self, call: GatewayCall) -> Result<()> {
        self.calls.write().unwrap().push(call);
        if !self.configured {
            return Err(LeasekitError::config(
                crate::config::keys::CINETPAY_API_KEY,
                "gateway credentials are not configured",
            ));
        }
        match self.failures.write().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn initiate(&self, request: &TransactionRequest) -> Result<InitiatedPayment> {
        self.record(GatewayCall::Initiate(request.clone()))?;
        request.validate()?;

        let payment_url = format!("{}/{}", self.checkout_base, request.transaction_id);
        let mut data = Map::new();
        data.insert("payment_url".into(), payment_url.clone().into());
        let mut raw = Map::new();
        raw.insert("code".into(), "201".into());
        raw.insert("data".into(), Value::Object(data));

        Ok(InitiatedPayment {
            transaction_id: request.transaction_id.clone(),
            payment_url,
            payment_token: None,
            raw,
        })
    }

    async fn verify_status(&self, transaction_id: &str) -> Result<TransactionStatus> {
        self.record(GatewayCall::VerifyStatus(transaction_id.to_string()))?;

        let (code, status) = self
            .statuses
            .read()
            .unwrap()
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| {
                LeasekitError::protocol(
                    "verify_status",
                    "response has no status code",
                    Some(r#"{"message":"not found"}"#.to_string()),
                )
            })?;

        let mut raw = Map::new();
        raw.insert("code".into(), code.clone().into());
        if let Some(status) = &status {
            let mut data = Map::new();
            data.insert("status".into(), status.clone().into());
            raw.insert("data".into(), Value::Object(data));
        }

        Ok(TransactionStatus {
            transaction_id: transaction_id.to_string(),
            code,
            message: None,
            status,
            raw,
        })
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_request;
    use crate::LeasekitErrorCode;

    #[tokio::test]
    async fn test_mock_initiate_records_calls() {
        let gateway = MockGateway::new();
        let payment = gateway.initiate(&test_request("RENT-1")).await.unwrap();

        assert_eq!(payment.payment_url, "https://checkout.test/pay/RENT-1");
        assert_eq!(gateway.calls(), vec![GatewayCall::Initiate(test_request("RENT-1"))]);
    }

    #[tokio::test]
    async fn test_mock_status() {
        let gateway = MockGateway::new();
        gateway.set_status("RENT-1", "00", Some("ACCEPTED"));

        assert!(gateway.verify_status("RENT-1").await.unwrap().is_accepted());

        let err = gateway.verify_status("RENT-2").await.unwrap_err();
        assert_eq!(err.code(), LeasekitErrorCode::ProtocolViolation);
    }

    #[tokio::test]
    async fn test_mock_failures() {
        let gateway = MockGateway::new();
        gateway.fail_next(LeasekitError::transport("initiate", "connection reset", None));

        assert!(gateway.initiate(&test_request("RENT-1")).await.is_err());
        assert!(gateway.initiate(&test_request("RENT-1")).await.is_ok());

        let unconfigured = MockGateway::unconfigured();
        let err = unconfigured.verify_status("RENT-1").await.unwrap_err();
        assert_eq!(err.code(), LeasekitErrorCode::Config);
    }
}
