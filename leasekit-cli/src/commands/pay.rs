//! Payment commands - initiate checkouts and check their status

use anyhow::{anyhow, Result};
use leasekit_lib::gateway::{
    generate_transaction_id, Channels, CinetPayClient, PaymentGateway, PaymentState,
    TransactionRequest,
};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::ui;

fn client() -> Result<CinetPayClient> {
    let (source, mode) = super::settings();
    Ok(CinetPayClient::from_config(&source, mode)?)
}

fn report_raw(raw: Option<&str>) {
    if let Some(raw) = raw {
        ui::key_value("Aggregator response", raw);
    }
}

pub async fn init(
    amount: Decimal,
    id: Option<String>,
    description: Option<String>,
    channels: Option<Channels>,
    verbose: bool,
) -> Result<()> {
    let client = client()?;
    let transaction_id = id.unwrap_or_else(|| generate_transaction_id("RENT"));

    let mut request = TransactionRequest::new(&transaction_id, amount);
    if let Some(description) = description {
        request = request.with_description(description);
    }
    if let Some(channels) = channels {
        request = request.with_channels(channels);
    }

    tracing::info!(%transaction_id, %amount, "initiating payment");
    let payment = match client.initiate(&request).await {
        Ok(payment) => payment,
        Err(e) => {
            report_raw(e.raw_response());
            return Err(e.into());
        }
    };

    ui::success("Payment initiated");
    ui::key_value("Transaction", &payment.transaction_id);
    ui::key_value("Checkout URL", &payment.payment_url);
    if verbose {
        ui::json(&Value::Object(payment.raw));
    }
    Ok(())
}

pub async fn status(transaction_id: &str, verbose: bool) -> Result<()> {
    let client = client()?;

    let status = match client.verify_status(transaction_id).await {
        Ok(status) => status,
        Err(e) => {
            report_raw(e.raw_response());
            return Err(e.into());
        }
    };

    ui::header("Transaction Status");
    ui::key_value("Transaction", &status.transaction_id);
    ui::key_value("Code", &status.code);
    if let Some(message) = &status.message {
        ui::key_value("Message", message);
    }
    match status.state() {
        PaymentState::Accepted => ui::success("Payment accepted"),
        PaymentState::Refused => ui::error("Payment refused"),
        PaymentState::Pending => ui::info("Payment pending"),
        PaymentState::Unknown(state) => ui::warning(&format!("Unrecognised status '{}'", state)),
    }
    if verbose {
        ui::json(&Value::Object(status.raw));
    }
    Ok(())
}

pub fn configured() -> Result<()> {
    let client = client()?;
    if client.is_configured() {
        ui::success("Gateway credentials are configured");
        ui::key_value("Site", &client.config().site_id);
        ui::key_value("Endpoint", &client.config().base_url);
        Ok(())
    } else {
        Err(anyhow!(
            "Gateway is not configured: set LEASEKIT_CINETPAY_API_KEY and LEASEKIT_CINETPAY_SITE_ID"
        ))
    }
}
