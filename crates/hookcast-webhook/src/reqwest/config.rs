//! Reqwest client configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use super::Error;

/// Default connect timeout: 10 seconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Default idle timeout of pooled connections: 90 seconds.
pub const DEFAULT_POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Configuration for the reqwest HTTP transport.
///
/// The per-attempt deadline is not configured here: it comes from each
/// subscription and is enforced by the delivery executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ReqwestConfig {
    /// User-Agent header to send with requests
    #[cfg_attr(
        feature = "config",
        arg(long = "http-user-agent", env = "HTTP_USER_AGENT")
    )]
    #[serde(default)]
    pub user_agent: Option<String>,

    /// TCP/TLS connect timeout in milliseconds
    #[cfg_attr(
        feature = "config",
        arg(
            long = "http-connect-timeout-ms",
            env = "HTTP_CONNECT_TIMEOUT_MS",
            default_value_t = DEFAULT_CONNECT_TIMEOUT_MS
        )
    )]
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Idle timeout of pooled connections in seconds
    #[cfg_attr(
        feature = "config",
        arg(
            long = "http-pool-idle-timeout-secs",
            env = "HTTP_POOL_IDLE_TIMEOUT_SECS",
            default_value_t = DEFAULT_POOL_IDLE_TIMEOUT_SECS
        )
    )]
    #[serde(default = "default_pool_idle_timeout_secs")]
    pub pool_idle_timeout_secs: u64,
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_pool_idle_timeout_secs() -> u64 {
    DEFAULT_POOL_IDLE_TIMEOUT_SECS
}

impl Default for ReqwestConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            pool_idle_timeout_secs: DEFAULT_POOL_IDLE_TIMEOUT_SECS,
        }
    }
}

impl ReqwestConfig {
    /// Returns the connect timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the pool idle timeout as a Duration.
    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }

    /// Returns the effective user agent, using default if not set.
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(Self::default_user_agent)
    }

    /// Returns the default user agent string.
    fn default_user_agent() -> String {
        format!("hookcast-webhook/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the connect timeout in milliseconds.
    #[must_use]
    pub fn with_connect_timeout_ms(mut self, connect_timeout_ms: u64) -> Self {
        self.connect_timeout_ms = connect_timeout_ms;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), Error> {
        if self
            .user_agent
            .as_deref()
            .is_some_and(|agent| agent.trim().is_empty())
        {
            return Err(Error::Config("user agent must not be empty".to_owned()));
        }
        if self.connect_timeout_ms == 0 {
            return Err(Error::Config("connect timeout must be positive".to_owned()));
        }
        Ok(())
    }
}
