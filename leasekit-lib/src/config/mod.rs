//! Configuration capability.
//!
//! The core never owns settings persistence. Components receive a
//! [`ConfigSource`] at construction, read what they need once, and keep the
//! resolved values immutable afterwards.
//!
//! ## Required vs optional
//!
//! [`require`] turns a missing value into a [`LeasekitError::Config`]. Values
//! that have a development fallback (the field encryption passphrase, the
//! aggregator defaults) only fall back in [`RuntimeMode::Development`];
//! in production a missing value fails construction.
//!
//! ## Sources
//!
//! - [`MemoryConfig`] - map-backed, for tests and embedding
//! - [`EnvConfig`] - process environment with a prefix (`LEASEKIT_`)

mod env;
mod memory;

pub use env::EnvConfig;
pub use memory::MemoryConfig;

use std::str::FromStr;

use crate::{LeasekitError, Result};

/// Configuration keys consumed by the core.
pub mod keys {
    /// `production`/`prod` selects [`RuntimeMode::Production`](super::RuntimeMode).
    pub const APP_ENV: &str = "app_env";
    pub const CINETPAY_API_KEY: &str = "cinetpay_api_key";
    pub const CINETPAY_SITE_ID: &str = "cinetpay_site_id";
    /// Secret used to authenticate payment notifications.
    pub const CINETPAY_SECRET_KEY: &str = "cinetpay_secret_key";
    pub const CINETPAY_BASE_URL: &str = "cinetpay_base_url";
    pub const CINETPAY_CURRENCY: &str = "cinetpay_currency";
    pub const CINETPAY_NOTIFY_URL: &str = "cinetpay_notify_url";
    pub const CINETPAY_RETURN_URL: &str = "cinetpay_return_url";
    pub const CINETPAY_CHANNELS: &str = "cinetpay_channels";
    pub const CINETPAY_LANG: &str = "cinetpay_lang";
    pub const CINETPAY_TIMEOUT_SECS: &str = "cinetpay_timeout_secs";
    pub const ENCRYPTION_KEY: &str = "encryption_key";
    /// Token lifetime override, in seconds.
    pub const JWT_LIFETIME: &str = "jwt_lifetime";
    /// `true` rejects tokens without an `exp` claim.
    pub const JWT_REQUIRE_EXP: &str = "jwt_require_exp";
}

/// A string-keyed configuration reader.
///
/// Empty values are treated as unset.
pub trait ConfigSource: Send + Sync {
    /// Look up a raw value.
    fn get(&self, key: &str) -> Option<String>;

    /// Look up a value, falling back to `default`.
    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Look up and parse a value. A present but unparsable value is an error,
    /// not a silent default.
    fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>>
    where
        Self: Sized,
    {
        parse_value(key, self.get(key))
    }
}

impl<S: ConfigSource + ?Sized> ConfigSource for &S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

impl<S: ConfigSource + ?Sized> ConfigSource for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

fn parse_value<T: FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| LeasekitError::config(key, format!("cannot parse '{}'", raw))),
    }
}

/// Parse an optional value from any source, including trait objects.
pub fn get_parsed<T: FromStr>(source: &dyn ConfigSource, key: &str) -> Result<Option<T>> {
    parse_value(key, source.get(key))
}

/// Read a value that has no fallback.
pub fn require(source: &dyn ConfigSource, key: &str) -> Result<String> {
    source
        .get(key)
        .ok_or_else(|| LeasekitError::config(key, "required value is not set"))
}

/// Parse a boolean flag (`true`/`1`/`yes`/`on`, case-insensitive).
pub fn get_flag(source: &dyn ConfigSource, key: &str, default: bool) -> bool {
    match source.get(key) {
        Some(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ),
        None => default,
    }
}

/// Deployment mode, deciding whether development fallbacks are allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RuntimeMode {
    /// Fallback values are allowed (with a warning).
    #[default]
    Development,
    /// Every security-relevant value must be configured.
    Production,
}

impl RuntimeMode {
    /// Resolve the mode from the `app_env` key.
    pub fn from_config(source: &dyn ConfigSource) -> Self {
        match source.get(keys::APP_ENV) {
            Some(v) if matches!(v.trim().to_ascii_lowercase().as_str(), "production" | "prod") => {
                Self::Production
            }
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_missing_key() {
        let config = MemoryConfig::new();
        let err = require(&config, keys::ENCRYPTION_KEY).unwrap_err();
        assert!(err.to_string().contains("encryption_key"));
    }

    #[test]
    fn test_get_parsed() {
        let config = MemoryConfig::new()
            .with(keys::JWT_LIFETIME, " 3600 ")
            .with(keys::CINETPAY_TIMEOUT_SECS, "soon");

        let lifetime: Option<u64> = config.get_parsed(keys::JWT_LIFETIME).unwrap();
        assert_eq!(lifetime, Some(3600));

        let timeout: Result<Option<u64>> = get_parsed(&config, keys::CINETPAY_TIMEOUT_SECS);
        assert!(timeout.is_err());

        let absent: Option<u64> = config.get_parsed(keys::CINETPAY_LANG).unwrap();
        assert_eq!(absent, None);
    }

    #[test]
    fn test_runtime_mode() {
        let config = MemoryConfig::new();
        assert_eq!(RuntimeMode::from_config(&config), RuntimeMode::Development);

        let config = MemoryConfig::new().with(keys::APP_ENV, "Production");
        assert!(RuntimeMode::from_config(&config).is_production());

        let config = MemoryConfig::new().with(keys::APP_ENV, "staging");
        assert_eq!(RuntimeMode::from_config(&config), RuntimeMode::Development);
    }

    #[test]
    fn test_flags() {
        let config = MemoryConfig::new().with(keys::JWT_REQUIRE_EXP, "Yes");
        assert!(get_flag(&config, keys::JWT_REQUIRE_EXP, false));
        assert!(get_flag(&config, "missing", true));
        assert!(!get_flag(&config, "missing", false));
    }
}
