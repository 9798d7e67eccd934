//! Command implementations

pub mod crypt;
pub mod pay;
pub mod token;

use leasekit_lib::config::{EnvConfig, RuntimeMode};

/// Settings come from `LEASEKIT_*` environment variables.
pub fn settings() -> (EnvConfig, RuntimeMode) {
    let source = EnvConfig::new();
    let mode = RuntimeMode::from_config(&source);
    (source, mode)
}
