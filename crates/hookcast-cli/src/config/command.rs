//! Subcommands and their arguments.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use hookcast_webhook::{SubscriptionDefaults, WebhookEvent};
use url::Url;
use uuid::Uuid;

/// Operations exposed by the `hookcast` binary.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the hex HMAC-SHA256 signature of a payload
    Sign(SignArgs),
    /// Check a payload signature; exits with status 1 on mismatch
    Verify(VerifyArgs),
    /// Deliver a `webhook.test` event to one endpoint
    SendTest(SendTestArgs),
    /// Dispatch an event to subscriptions loaded from a JSON file
    Emit(EmitArgs),
}

impl Command {
    /// Returns the subcommand name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sign(_) => "sign",
            Self::Verify(_) => "verify",
            Self::SendTest(_) => "send-test",
            Self::Emit(_) => "emit",
        }
    }

    /// Returns the subscription defaults of delivering subcommands.
    pub fn subscription_defaults(&self) -> Option<&SubscriptionDefaults> {
        match self {
            Self::SendTest(args) => Some(&args.defaults),
            Self::Emit(args) => Some(&args.defaults),
            Self::Sign(_) | Self::Verify(_) => None,
        }
    }
}

/// Payload source shared by `sign` and `verify`.
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Subscription secret used as the HMAC key
    #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Payload file; stdin when omitted
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct SignArgs {
    #[clap(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Clone, Args)]
pub struct VerifyArgs {
    #[clap(flatten)]
    pub input: InputArgs,

    /// Hex signature from the `X-Webhook-Signature` header
    #[arg(long)]
    pub signature: String,
}

#[derive(Debug, Clone, Args)]
pub struct SendTestArgs {
    /// Endpoint URL
    #[arg(long)]
    pub url: Url,

    /// Subscription secret used to sign the delivery
    #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
    pub secret: String,

    #[clap(flatten)]
    pub defaults: SubscriptionDefaults,
}

#[derive(Debug, Clone, Args)]
pub struct EmitArgs {
    /// JSON file holding an array of subscriptions
    #[arg(long)]
    pub subscriptions: PathBuf,

    /// Tenant emitting the event
    #[arg(long)]
    pub tenant: Uuid,

    /// Catalog event name, e.g. `booking.created`
    #[arg(long)]
    pub event: WebhookEvent,

    /// Event data as a JSON document
    #[arg(long, default_value = "{}")]
    pub data: serde_json::Value,

    /// Optional metadata as a JSON document
    #[arg(long)]
    pub metadata: Option<serde_json::Value>,

    /// Delivery settings for subscriptions that do not set their own
    #[clap(flatten)]
    pub defaults: SubscriptionDefaults,
}
