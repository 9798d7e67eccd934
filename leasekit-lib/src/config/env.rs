//! Environment-variable configuration source.
//!
//! Keys are mapped to upper-case variables under a prefix:
//! `cinetpay_api_key` with prefix `LEASEKIT_` reads `LEASEKIT_CINETPAY_API_KEY`.

use super::ConfigSource;

/// Default variable prefix.
pub const DEFAULT_PREFIX: &str = "LEASEKIT_";

/// Reads configuration from the process environment.
#[derive(Clone, Debug)]
pub struct EnvConfig {
    prefix: String,
}

impl EnvConfig {
    /// Create a source using [`DEFAULT_PREFIX`].
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }

    /// Create a source with a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The environment variable consulted for `key`.
    pub fn var_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_ascii_uppercase())
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.var_name(key))
            .ok()
            .filter(|v| !v.is_empty())
    }
}
