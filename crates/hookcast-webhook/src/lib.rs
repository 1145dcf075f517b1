#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod delivery;
mod error;
mod event;
mod payload;
mod service;
mod subscription;
mod transport;

pub mod signer;
pub mod store;

#[cfg(feature = "reqwest")]
#[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
pub mod reqwest;

pub use config::{DispatcherConfig, SubscriptionDefaults};
pub use delivery::{DeliveryOutcome, DeliveryResult, DeliveryStatus, NewDelivery, WebhookDelivery};
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use event::{EventSelector, WebhookEvent};
pub use payload::{EncodedPayload, WebhookPayload};
pub use service::{
    DeliveryExecutor, DispatcherBuilder, EmitSummary, RetryCoordinator, RetryPolicy,
    StatisticsUpdater, WebhookDispatcher,
};
pub use signer::WebhookSigner;
pub use subscription::{WebhookSecret, WebhookSubscription};
pub use transport::{
    RESPONSE_BODY_LIMIT, WebhookRequest, WebhookResponse, WebhookTransport, headers,
};

/// Root tracing target for webhook operations.
pub const TRACING_TARGET: &str = "hookcast_webhook";
