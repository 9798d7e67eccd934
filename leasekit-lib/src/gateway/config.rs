//! Configuration types for the payment gateway client.

use serde::{Deserialize, Serialize};

use super::types::Channels;
use crate::config::{self, keys, ConfigSource, RuntimeMode};
use crate::{LeasekitError, Result};

/// Production checkout API.
pub const DEFAULT_BASE_URL: &str = "https://api-checkout.cinetpay.com/v2";

/// Configuration for the CinetPay checkout API.
#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// API key issued by the aggregator.
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Site (merchant account) identifier.
    pub site_id: String,

    /// Secret used to authenticate payment notifications.
    #[serde(default, skip_serializing)]
    pub secret_key: Option<String>,

    /// API base URL. Must be https, except for loopback hosts.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default currency when a request does not name one.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Default allowed channels.
    #[serde(default)]
    pub channels: Channels,

    /// Default checkout page language.
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Default notification callback URL.
    #[serde(default)]
    pub notify_url: Option<String>,

    /// Default URL the customer returns to after checkout.
    #[serde(default)]
    pub return_url: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_currency() -> String {
    "XOF".to_string()
}

fn default_lang() -> String {
    "fr".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("site_id", &self.site_id)
            .field("base_url", &self.base_url)
            .field("currency", &self.currency)
            .field("channels", &self.channels)
            .field("lang", &self.lang)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl GatewayConfig {
    /// Create a configuration with default endpoint and checkout settings.
    pub fn new(api_key: impl Into<String>, site_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            site_id: site_id.into(),
            secret_key: None,
            base_url: default_base_url(),
            currency: default_currency(),
            channels: Channels::default(),
            lang: default_lang(),
            notify_url: None,
            return_url: None,
            timeout_secs: default_timeout(),
        }
    }

    /// Resolve the configuration from a settings source.
    ///
    /// In production the API key and site id are required. In development
    /// they may be missing, which leaves the client unconfigured
    /// (see [`is_configured`](Self::is_configured)).
    pub fn from_config(source: &dyn ConfigSource, mode: RuntimeMode) -> Result<Self> {
        let credential = |key: &str| -> Result<String> {
            match source.get(key) {
                Some(value) => Ok(value),
                None if mode.is_production() => Err(LeasekitError::config(
                    key,
                    "aggregator credentials are required in production",
                )),
                None => Ok(String::new()),
            }
        };

        let mut config = Self::new(
            credential(keys::CINETPAY_API_KEY)?,
            credential(keys::CINETPAY_SITE_ID)?,
        );
        config.secret_key = source.get(keys::CINETPAY_SECRET_KEY);
        config.base_url = source.get_or(keys::CINETPAY_BASE_URL, DEFAULT_BASE_URL);
        config.currency = source.get_or(keys::CINETPAY_CURRENCY, &config.currency);
        config.lang = source.get_or(keys::CINETPAY_LANG, &config.lang);
        config.notify_url = source.get(keys::CINETPAY_NOTIFY_URL);
        config.return_url = source.get(keys::CINETPAY_RETURN_URL);
        if let Some(channels) = config::get_parsed::<Channels>(source, keys::CINETPAY_CHANNELS)? {
            config.channels = channels;
        }
        if let Some(timeout) = config::get_parsed::<u64>(source, keys::CINETPAY_TIMEOUT_SECS)? {
            config.timeout_secs = timeout;
        }
        config.validate_timeout()?;

        Ok(config)
    }

    /// True iff both the API key and site id are set.
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.site_id.trim().is_empty()
    }

    /// A zero timeout would fail every request before it is sent.
    pub(crate) fn validate_timeout(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(LeasekitError::config(
                keys::CINETPAY_TIMEOUT_SECS,
                "timeout must be at least one second",
            ));
        }
        Ok(())
    }

    /// Set the API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the notification secret.
    pub fn with_secret_key(mut self, secret: impl Into<String>) -> Self {
        self.secret_key = Some(secret.into());
        self
    }

    /// Set the default currency.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Set the default channels.
    pub fn with_channels(mut self, channels: Channels) -> Self {
        self.channels = channels;
        self
    }

    /// Set the default language.
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Set the default notification URL.
    pub fn with_notify_url(mut self, url: impl Into<String>) -> Self {
        self.notify_url = Some(url.into());
        self
    }

    /// Set the default return URL.
    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = Some(url.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfig;
    use crate::gateway::Channel;

    #[test]
    fn test_gateway_config() {
        let config = GatewayConfig::new("key", "105")
            .with_currency("XAF")
            .with_timeout(10);

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.currency, "XAF");
        assert_eq!(config.lang, "fr");
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.channels, Channels::All);
        assert!(config.is_configured());
    }

    #[test]
    fn test_is_configured_needs_both() {
        assert!(!GatewayConfig::new("", "105").is_configured());
        assert!(!GatewayConfig::new("key", " ").is_configured());
    }

    #[test]
    fn test_debug_hides_credentials() {
        let config = GatewayConfig::new("super-secret-key", "105").with_secret_key("hmac-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret-key"));
        assert!(!rendered.contains("hmac-secret"));
        assert!(rendered.contains("105"));
    }

    #[test]
    fn test_from_config() {
        let source = MemoryConfig::new()
            .with(keys::CINETPAY_API_KEY, "key")
            .with(keys::CINETPAY_SITE_ID, "105")
            .with(keys::CINETPAY_CHANNELS, "MOBILE_MONEY,WALLET")
            .with(keys::CINETPAY_NOTIFY_URL, "https://rent.example/notify")
            .with(keys::CINETPAY_TIMEOUT_SECS, "12");

        let config = GatewayConfig::from_config(&source, RuntimeMode::Production).unwrap();
        assert_eq!(
            config.channels,
            Channels::only([Channel::MobileMoney, Channel::Wallet])
        );
        assert_eq!(config.notify_url.as_deref(), Some("https://rent.example/notify"));
        assert_eq!(config.timeout_secs, 12);
        assert_eq!(config.currency, "XOF");
    }

    #[test]
    fn test_serialization_omits_credentials() {
        let config = GatewayConfig::new("super-secret-key", "105").with_secret_key("hmac-secret");
        let rendered = serde_json::to_string(&config).unwrap();
        assert!(!rendered.contains("super-secret-key"));
        assert!(!rendered.contains("hmac-secret"));
        assert!(rendered.contains("\"site_id\":\"105\""));
    }

    #[test]
    fn test_from_config_rejects_zero_timeout() {
        let source = MemoryConfig::new()
            .with(keys::CINETPAY_API_KEY, "key")
            .with(keys::CINETPAY_SITE_ID, "105")
            .with(keys::CINETPAY_TIMEOUT_SECS, "0");

        let err = GatewayConfig::from_config(&source, RuntimeMode::Development).unwrap_err();
        assert_eq!(err.code(), crate::LeasekitErrorCode::Config);
        assert!(err.to_string().contains(keys::CINETPAY_TIMEOUT_SECS));
    }

    #[test]
    fn test_from_config_missing_credentials() {
        let source = MemoryConfig::new().with(keys::CINETPAY_SITE_ID, "105");

        let err = GatewayConfig::from_config(&source, RuntimeMode::Production).unwrap_err();
        assert!(err.to_string().contains(keys::CINETPAY_API_KEY));

        let config = GatewayConfig::from_config(&source, RuntimeMode::Development).unwrap();
        assert!(!config.is_configured());
    }
}
