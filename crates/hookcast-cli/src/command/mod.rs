//! Subcommand implementations.
//!
//! Every command writes a JSON report to stdout.

mod delivery;
mod signature;

use std::sync::Arc;

use anyhow::Context;
use hookcast_webhook::WebhookDispatcher;
use hookcast_webhook::reqwest::ReqwestClient;
use hookcast_webhook::store::InMemoryStore;
use serde::Serialize;

use crate::config::{Cli, Command};

/// Runs the parsed subcommand.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Sign(args) => signature::sign(args).await,
        Command::Verify(args) => signature::verify(args).await,
        Command::SendTest(args) => delivery::send_test(&cli, args).await,
        Command::Emit(args) => delivery::emit(&cli, args).await,
    }
}

/// Builds a dispatcher over in-memory stores and the reqwest transport.
fn create_dispatcher(cli: &Cli, store: Arc<InMemoryStore>) -> anyhow::Result<WebhookDispatcher> {
    let client = ReqwestClient::new(cli.http.clone()).context("failed to create HTTP client")?;

    WebhookDispatcher::builder()
        .store(store)
        .transport(Arc::new(client))
        .config(cli.dispatcher.clone())
        .build()
        .context("failed to create webhook dispatcher")
}

/// Prints a report as pretty JSON on stdout.
fn print_json(report: &impl Serialize) -> anyhow::Result<()> {
    let output = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    println!("{output}");
    Ok(())
}
