//! Dispatcher and subscription configuration.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default cap on concurrently running delivery sequences per emission.
pub const DEFAULT_MAX_CONCURRENT_DELIVERIES: usize = 16;

/// Default per-attempt timeout for new subscriptions: 30 seconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default number of retries for new subscriptions.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default delay between attempts for new subscriptions: 60 seconds.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 60;

/// Configuration for the webhook dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct DispatcherConfig {
    /// Maximum number of subscriptions notified in parallel for one event
    #[cfg_attr(
        feature = "config",
        arg(
            long = "webhook-max-concurrency",
            env = "WEBHOOK_MAX_CONCURRENCY",
            default_value_t = DEFAULT_MAX_CONCURRENT_DELIVERIES
        )
    )]
    #[serde(default = "default_max_concurrent_deliveries")]
    pub max_concurrent_deliveries: usize,
}

fn default_max_concurrent_deliveries() -> usize {
    DEFAULT_MAX_CONCURRENT_DELIVERIES
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_deliveries: DEFAULT_MAX_CONCURRENT_DELIVERIES,
        }
    }
}

impl DispatcherConfig {
    /// Sets the concurrency cap.
    #[must_use]
    pub fn with_max_concurrent_deliveries(mut self, max: usize) -> Self {
        self.max_concurrent_deliveries = max;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_deliveries == 0 {
            return Err(Error::configuration()
                .with_message("max_concurrent_deliveries must be at least 1"));
        }
        Ok(())
    }
}

/// Delivery settings applied to newly created subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct SubscriptionDefaults {
    /// Per-attempt HTTP timeout in milliseconds
    #[cfg_attr(
        feature = "config",
        arg(long = "webhook-timeout-ms", env = "WEBHOOK_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)
    )]
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Number of retries after the first attempt
    #[cfg_attr(
        feature = "config",
        arg(long = "webhook-retry-attempts", env = "WEBHOOK_RETRY_ATTEMPTS", default_value_t = DEFAULT_RETRY_ATTEMPTS)
    )]
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay between attempts in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "webhook-retry-delay-secs", env = "WEBHOOK_RETRY_DELAY_SECS", default_value_t = DEFAULT_RETRY_DELAY_SECS)
    )]
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_retry_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

fn default_retry_delay_secs() -> u64 {
    DEFAULT_RETRY_DELAY_SECS
}

impl Default for SubscriptionDefaults {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
        }
    }
}

impl SubscriptionDefaults {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(Error::configuration().with_message("timeout_ms cannot be zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DispatcherConfig::default();
        assert_eq!(config.max_concurrent_deliveries, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let config = DispatcherConfig::default().with_max_concurrent_deliveries(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_defaults() {
        let config: DispatcherConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DispatcherConfig::default());

        let defaults: SubscriptionDefaults = serde_json::from_str(r#"{"retry_attempts": 1}"#).unwrap();
        assert_eq!(defaults.retry_attempts, 1);
        assert_eq!(defaults.timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn test_subscription_defaults_validation() {
        assert!(SubscriptionDefaults::default().validate().is_ok());

        let zero = SubscriptionDefaults {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }
}
