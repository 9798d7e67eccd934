//! Token issuance and verification.

use std::sync::atomic::{AtomicU64, Ordering};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::claims::{EXPIRES_AT, ISSUED_AT};
use super::{TokenClaims, TokenError};
use crate::config::{self, keys, ConfigSource};
use crate::{LeasekitError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Signature algorithm named in every token header.
pub const TOKEN_ALGORITHM: &str = "HS256";

/// Token type named in every token header.
pub const TOKEN_TYPE: &str = "JWT";

/// Default token lifetime: 24 hours.
pub const DEFAULT_LIFETIME_SECS: u64 = 86_400;

/// Pre-encoded header JSON. Field order is fixed.
const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// What to do with a correctly signed token that carries no `exp` claim.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// Treat it as never expiring.
    #[default]
    AllowMissing,
    /// Reject it with [`TokenError::MissingExpiry`].
    Required,
}

#[derive(Deserialize)]
struct TokenHeader {
    alg: String,
}

/// Issues and verifies HMAC-SHA256 signed tokens.
///
/// The secret and expiry policy are fixed at construction. The lifetime is a
/// runtime setting: changing it affects tokens issued afterwards, never those
/// already handed out.
pub struct TokenService {
    secret: Zeroizing<Vec<u8>>,
    lifetime_secs: AtomicU64,
    expiry_policy: ExpiryPolicy,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("lifetime_secs", &self.lifetime())
            .field("expiry_policy", &self.expiry_policy)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Create a service signing with `secret`.
    ///
    /// # Errors
    ///
    /// Rejects an empty secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(LeasekitError::invalid_data(
                "secret",
                "token signing secret cannot be empty",
            ));
        }
        Ok(Self {
            secret: Zeroizing::new(secret.to_vec()),
            lifetime_secs: AtomicU64::new(DEFAULT_LIFETIME_SECS),
            expiry_policy: ExpiryPolicy::default(),
        })
    }

    /// Create a service with lifetime and expiry policy read from `source`.
    ///
    /// The secret is the application secret and is passed in directly, not
    /// read from the settings store.
    pub fn from_config(secret: impl AsRef<[u8]>, source: &dyn ConfigSource) -> Result<Self> {
        let mut service = Self::new(secret)?;

        if let Some(lifetime) = config::get_parsed::<u64>(source, keys::JWT_LIFETIME)? {
            if lifetime == 0 {
                return Err(LeasekitError::config(
                    keys::JWT_LIFETIME,
                    "lifetime must be at least one second",
                ));
            }
            service.set_lifetime(lifetime);
        }
        if config::get_flag(source, keys::JWT_REQUIRE_EXP, false) {
            service.expiry_policy = ExpiryPolicy::Required;
        }

        Ok(service)
    }

    /// Set the expiry policy.
    pub fn with_expiry_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.expiry_policy = policy;
        self
    }

    /// Set the lifetime for later tokens, in seconds.
    pub fn set_lifetime(&self, secs: u64) {
        self.lifetime_secs.store(secs, Ordering::Relaxed);
    }

    pub fn lifetime(&self) -> u64 {
        self.lifetime_secs.load(Ordering::Relaxed)
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        self.expiry_policy
    }

    /// Issue a token for `claims`, stamped with the current time.
    pub fn issue(&self, claims: TokenClaims) -> Result<String> {
        self.issue_at(claims, now())
    }

    /// Issue a token as if the current time were `now` (seconds since epoch).
    ///
    /// Caller-supplied `iat` and `exp` claims are overwritten.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(now = now)))]
    pub fn issue_at(&self, claims: TokenClaims, now: i64) -> Result<String> {
        let lifetime = i64::try_from(self.lifetime()).unwrap_or(i64::MAX);

        let mut map = claims.into_map();
        map.insert(ISSUED_AT.to_string(), Value::from(now));
        map.insert(
            EXPIRES_AT.to_string(),
            Value::from(now.saturating_add(lifetime)),
        );

        let header = URL_SAFE_NO_PAD.encode(HEADER_JSON);
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&canonical(Value::Object(map)))?);
        let signing_input = format!("{header}.{body}");
        let signature = URL_SAFE_NO_PAD.encode(self.sign(signing_input.as_bytes())?);

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verify a token, collapsing every failure into `None`.
    pub fn verify(&self, token: &str) -> Option<TokenClaims> {
        self.verify_detailed(token).ok()
    }

    /// Verify a token against a caller-supplied clock, collapsing failures.
    pub fn verify_at(&self, token: &str, now: i64) -> Option<TokenClaims> {
        self.verify_detailed_at(token, now).ok()
    }

    /// Verify a token, reporting why it failed.
    pub fn verify_detailed(&self, token: &str) -> std::result::Result<TokenClaims, TokenError> {
        self.verify_detailed_at(token, now())
    }

    /// Verify a token against `now` (seconds since epoch), reporting why it
    /// failed.
    ///
    /// Checks, in order: three segments, header algorithm, signature,
    /// claims JSON, expiry.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(now = now)))]
    pub fn verify_detailed_at(
        &self,
        token: &str,
        now: i64,
    ) -> std::result::Result<TokenClaims, TokenError> {
        let segments: Vec<&str> = token.split('.').collect();
        let [header, body, signature] = segments.as_slice() else {
            return Err(TokenError::Malformed);
        };

        let header: TokenHeader = decode_segment(header)?;
        if header.alg != TOKEN_ALGORITHM {
            return Err(TokenError::Malformed);
        }

        let expected = self
            .sign(format!("{}.{}", segments[0], body).as_bytes())
            .map_err(|_| TokenError::Malformed)?;
        let expected = URL_SAFE_NO_PAD.encode(expected);
        if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            return Err(TokenError::BadSignature);
        }

        let claims: Map<String, Value> = decode_segment(body)?;

        // `exp: null` counts as absent; any other non-integer is malformed.
        match claims.get(EXPIRES_AT).filter(|exp| !exp.is_null()) {
            None if self.expiry_policy == ExpiryPolicy::Required => {
                return Err(TokenError::MissingExpiry)
            }
            None => {}
            Some(exp) => {
                let exp = exp.as_i64().ok_or(TokenError::Malformed)?;
                if exp < now {
                    return Err(TokenError::Expired);
                }
            }
        }

        Ok(TokenClaims::from(claims))
    }

    /// Re-issue a still-valid token with fresh `iat` and `exp`.
    pub fn refresh(&self, token: &str) -> Result<String> {
        let mut claims = self.verify_detailed(token)?;
        claims.remove(ISSUED_AT);
        claims.remove(EXPIRES_AT);
        self.issue(claims)
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| LeasekitError::Internal(format!("HMAC key rejected: {}", e)))?;
        mac.update(message);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn decode_segment<T: for<'de> Deserialize<'de>>(
    segment: &str,
) -> std::result::Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

/// Rebuild objects with keys in sorted order, at every depth.
fn canonical(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonical(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonical).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfig;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    fn service() -> TokenService {
        TokenService::new(b"test-secret-for-tokens").unwrap()
    }

    fn claims() -> TokenClaims {
        TokenClaims::new()
            .with("sub", "user-7")
            .with("role", "manager")
            .with("properties", json!([12, 31]))
    }

    /// Sign arbitrary claims JSON, bypassing issuance.
    fn forge(service: &TokenService, header: &str, claims: &str) -> String {
        let input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims)
        );
        let sig = URL_SAFE_NO_PAD.encode(service.sign(input.as_bytes()).unwrap());
        format!("{input}.{sig}")
    }

    #[test]
    fn test_issue_verify_roundtrip() {
        let service = service();
        let token = service.issue_at(claims(), NOW).unwrap();
        let verified = service.verify_at(&token, NOW).unwrap();

        let expected = claims()
            .with("iat", NOW)
            .with("exp", NOW + DEFAULT_LIFETIME_SECS as i64);
        assert_eq!(verified, expected);
    }

    #[test]
    fn test_token_layout() {
        let token = service().issue_at(claims(), NOW).unwrap();
        let segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments.len(), 3);
        assert!(!token.contains('='));
        assert_eq!(
            URL_SAFE_NO_PAD.decode(segments[0]).unwrap(),
            br#"{"alg":"HS256","typ":"JWT"}"#
        );
    }

    #[test]
    fn test_issue_is_deterministic_and_canonical() {
        let service = service();
        let a = TokenClaims::new().with("b", 2).with("a", json!({"y": 1, "x": 0}));
        let b = TokenClaims::new().with("a", json!({"x": 0, "y": 1})).with("b", 2);
        assert_eq!(
            service.issue_at(a, NOW).unwrap(),
            service.issue_at(b, NOW).unwrap()
        );

        let token = service.issue_at(TokenClaims::new().with("z", 1), NOW).unwrap();
        let body = token.split('.').nth(1).unwrap();
        assert_eq!(
            URL_SAFE_NO_PAD.decode(body).unwrap(),
            format!(r#"{{"exp":{},"iat":{},"z":1}}"#, NOW + 86_400, NOW).as_bytes()
        );
    }

    #[test]
    fn test_caller_exp_is_overwritten() {
        let service = service();
        let forged = claims().with("exp", i64::MAX).with("iat", 0);
        let token = service.issue_at(forged, NOW).unwrap();
        let verified = service.verify_at(&token, NOW).unwrap();
        assert_eq!(verified.issued_at(), Some(NOW));
        assert_eq!(verified.expires_at(), Some(NOW + 86_400));
    }

    #[test]
    fn test_expiry() {
        let service = service();
        service.set_lifetime(1);
        let token = service.issue_at(claims(), NOW).unwrap();

        assert!(service.verify_at(&token, NOW).is_some());
        assert!(service.verify_at(&token, NOW + 1).is_some());
        assert_eq!(
            service.verify_detailed_at(&token, NOW + 2),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_lifetime_change_only_affects_new_tokens() {
        let service = service();
        let long = service.issue_at(claims(), NOW).unwrap();
        service.set_lifetime(60);
        let short = service.issue_at(claims(), NOW).unwrap();

        assert!(service.verify_at(&long, NOW + 3_600).is_some());
        assert!(service.verify_at(&short, NOW + 3_600).is_none());
    }

    #[test]
    fn test_wrong_secret() {
        let token = service().issue_at(claims(), NOW).unwrap();
        let other = TokenService::new("another secret").unwrap();
        assert_eq!(
            other.verify_detailed_at(&token, NOW),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_tampered_claims() {
        let service = service();
        let token = service.issue_at(claims(), NOW).unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let escalated = TokenClaims::new().with("role", "admin").with("exp", NOW + 10);
        parts[1] = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&escalated).unwrap());
        let tampered = parts.join(".");

        assert_eq!(
            service.verify_detailed_at(&tampered, NOW),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        let service = service();
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
            assert_eq!(
                service.verify_detailed_at(token, NOW),
                Err(TokenError::Malformed),
                "{token:?}"
            );
        }
    }

    #[test]
    fn test_rejects_other_algorithms() {
        let service = service();
        let token = forge(&service, r#"{"alg":"none","typ":"JWT"}"#, r#"{"sub":"x"}"#);
        assert_eq!(
            service.verify_detailed_at(&token, NOW),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_signed_garbage_claims_are_malformed() {
        let service = service();
        let token = forge(&service, HEADER_JSON, "not json");
        assert_eq!(service.verify_detailed_at(&token, NOW), Err(TokenError::Malformed));

        let token = forge(&service, HEADER_JSON, r#"{"exp":"tomorrow"}"#);
        assert_eq!(service.verify_detailed_at(&token, NOW), Err(TokenError::Malformed));

        let token = forge(&service, HEADER_JSON, r#"{"exp":1800000000.0}"#);
        assert_eq!(service.verify_detailed_at(&token, NOW), Err(TokenError::Malformed));
    }

    #[test]
    fn test_missing_exp_policy() {
        let service = service();
        let token = forge(&service, HEADER_JSON, r#"{"sub":"service-account"}"#);
        let claims = service.verify_at(&token, NOW).unwrap();
        assert_eq!(claims.subject(), Some("service-account"));

        let null_exp = forge(&service, HEADER_JSON, r#"{"sub":"service-account","exp":null}"#);
        assert!(service.verify_at(&null_exp, NOW).is_some());

        let strict = service.with_expiry_policy(ExpiryPolicy::Required);
        assert_eq!(
            strict.verify_detailed_at(&token, NOW),
            Err(TokenError::MissingExpiry)
        );
        assert_eq!(
            strict.verify_detailed_at(&null_exp, NOW),
            Err(TokenError::MissingExpiry)
        );
    }

    #[test]
    fn test_refresh() {
        let service = service();
        let token = service.issue(claims()).unwrap();
        let issued = service.verify(&token).unwrap().issued_at().unwrap();

        let refreshed = service.refresh(&token).unwrap();
        let verified = service.verify(&refreshed).unwrap();
        assert_eq!(verified.subject(), Some("user-7"));
        assert!(verified.issued_at().unwrap() >= issued);

        let stale = service.issue_at(claims(), NOW - 100_000).unwrap();
        assert!(matches!(
            service.refresh(&stale),
            Err(LeasekitError::InvalidToken)
        ));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(TokenService::new("").is_err());
    }

    #[test]
    fn test_from_config() {
        let config = MemoryConfig::new()
            .with(keys::JWT_LIFETIME, "3600")
            .with(keys::JWT_REQUIRE_EXP, "true");
        let service = TokenService::from_config("s3cret", &config).unwrap();
        assert_eq!(service.lifetime(), 3600);
        assert_eq!(service.expiry_policy(), ExpiryPolicy::Required);

        let zero = MemoryConfig::new().with(keys::JWT_LIFETIME, "0");
        assert!(TokenService::from_config("s3cret", &zero).is_err());

        let defaults = TokenService::from_config("s3cret", &MemoryConfig::new()).unwrap();
        assert_eq!(defaults.lifetime(), DEFAULT_LIFETIME_SECS);
        assert_eq!(defaults.expiry_policy(), ExpiryPolicy::AllowMissing);
    }
}
