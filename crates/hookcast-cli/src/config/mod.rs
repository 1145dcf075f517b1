//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── http: ReqwestConfig           # User agent, connect/pool timeouts
//! ├── dispatcher: DispatcherConfig  # Fan-out concurrency
//! └── command: Command              # sign | verify | send-test | emit
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.

mod command;

use std::process;

use anyhow::Context;
use clap::Parser;
use hookcast_webhook::DispatcherConfig;
use hookcast_webhook::reqwest::ReqwestConfig;

pub use self::command::{Command, EmitArgs, InputArgs, SendTestArgs, SignArgs, VerifyArgs};
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "hookcast")]
#[command(about = "Signed webhook delivery tooling")]
#[command(version)]
pub struct Cli {
    /// HTTP transport configuration.
    #[clap(flatten)]
    pub http: ReqwestConfig,

    /// Dispatcher configuration.
    #[clap(flatten)]
    pub dispatcher: DispatcherConfig,

    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded first so clap's `env` fallbacks can see it.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.http
            .validate()
            .context("invalid HTTP configuration")?;
        self.dispatcher
            .validate()
            .context("invalid dispatcher configuration")?;
        if let Some(defaults) = self.command.subscription_defaults() {
            defaults
                .validate()
                .context("invalid subscription defaults")?;
        }
        Ok(())
    }

    /// Logs configuration at debug level (no secrets).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            command = self.command.name(),
            user_agent = %self.http.effective_user_agent(),
            connect_timeout_ms = self.http.connect_timeout_ms,
            pool_idle_timeout_secs = self.http.pool_idle_timeout_secs,
            max_concurrent_deliveries = self.dispatcher.max_concurrent_deliveries,
            "Configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_emit() {
        let cli = Cli::try_parse_from([
            "hookcast",
            "--webhook-max-concurrency",
            "4",
            "emit",
            "--subscriptions",
            "subs.json",
            "--tenant",
            "0190f5a4-1c3e-7c4b-9a51-2b7f3c1d9e10",
            "--event",
            "qr.validated",
            "--data",
            r#"{"code":"ABC123"}"#,
        ])
        .unwrap();

        assert_eq!(cli.dispatcher.max_concurrent_deliveries, 4);
        let Command::Emit(args) = cli.command else {
            panic!("expected emit command");
        };
        assert_eq!(args.event.as_str(), "qr.validated");
        assert_eq!(args.data["code"], "ABC123");
        assert!(args.metadata.is_none());
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let parsed = Cli::try_parse_from([
            "hookcast",
            "emit",
            "--subscriptions",
            "subs.json",
            "--tenant",
            "0190f5a4-1c3e-7c4b-9a51-2b7f3c1d9e10",
            "--event",
            "invoice.paid",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let cli = Cli::try_parse_from([
            "hookcast",
            "send-test",
            "--url",
            "https://example.com/hook",
            "--secret",
            "whsec",
            "--webhook-timeout-ms",
            "0",
        ])
        .unwrap();
        assert!(cli.validate().is_err());
    }
}
