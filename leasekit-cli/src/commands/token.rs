//! Token commands - issue, verify and extract session tokens

use anyhow::{anyhow, Context, Result};
use leasekit_lib::config;
use leasekit_lib::token::{self, TokenClaims, TokenService};
use serde_json::Value;

use crate::ui;

/// Settings key for the signing secret (`LEASEKIT_TOKEN_SECRET`).
const TOKEN_SECRET: &str = "token_secret";

fn service() -> Result<TokenService> {
    let (source, _) = super::settings();
    let secret = config::require(&source, TOKEN_SECRET)
        .context("set LEASEKIT_TOKEN_SECRET to sign and verify tokens")?;
    Ok(TokenService::from_config(secret, &source)?)
}

/// Parse `key=value`. Values that are valid JSON keep their type.
pub fn parse_claim(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("claim '{}' must be key=value", raw))?;
    if key.is_empty() {
        return Err(anyhow!("claim '{}' has an empty name", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

pub fn issue(claims: &[String], lifetime: Option<u64>, verbose: bool) -> Result<()> {
    let service = service()?;
    if let Some(secs) = lifetime {
        service.set_lifetime(secs);
    }

    let claims = claims
        .iter()
        .map(|raw| parse_claim(raw))
        .collect::<Result<TokenClaims>>()?;
    let token = service.issue(claims)?;

    if verbose {
        ui::key_value("Lifetime", &format!("{}s", service.lifetime()));
    }
    println!("{}", token);
    Ok(())
}

pub fn verify(token: &str) -> Result<()> {
    let service = service()?;
    match service.verify_detailed(token) {
        Ok(claims) => {
            ui::success("Token is valid");
            ui::json(&Value::Object(claims.into_map()));
            Ok(())
        }
        Err(reason) => Err(anyhow!("Token rejected: {}", reason)),
    }
}

pub fn header(value: &str) -> Result<()> {
    match token::extract_from_header(value) {
        Some(token) => {
            println!("{}", token);
            Ok(())
        }
        None => Err(anyhow!("No bearer token in header")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_claim() {
        assert_eq!(parse_claim("sub=tenant-42").unwrap(), ("sub".into(), json!("tenant-42")));
        assert_eq!(parse_claim("lease=88").unwrap(), ("lease".into(), json!(88)));
        assert_eq!(parse_claim("admin=true").unwrap(), ("admin".into(), json!(true)));
        assert_eq!(parse_claim("note=a=b").unwrap(), ("note".into(), json!("a=b")));
        assert!(parse_claim("novalue").is_err());
        assert!(parse_claim("=x").is_err());
    }
}
