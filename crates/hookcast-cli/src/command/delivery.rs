//! Commands that drive the full delivery pipeline.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use hookcast_webhook::store::{DeliveryStore, InMemoryStore};
use hookcast_webhook::{
    DeliveryResult, DeliveryStatus, EmitSummary, EventSelector, SubscriptionDefaults,
    WebhookDelivery, WebhookSecret, WebhookSubscription,
};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use super::{create_dispatcher, print_json};
use crate::TRACING_TARGET_COMMAND;
use crate::config::{Cli, EmitArgs, SendTestArgs};

/// One entry of the `--subscriptions` file.
#[derive(Debug, Clone, Deserialize)]
struct SubscriptionEntry {
    #[serde(default)]
    id: Option<Uuid>,
    tenant_id: Uuid,
    url: Url,
    secret: WebhookSecret,
    events: Vec<EventSelector>,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    timeout_ms: Option<u64>,
    #[serde(default)]
    retry_attempts: Option<u32>,
    #[serde(default)]
    retry_delay_secs: Option<u64>,
}

fn default_active() -> bool {
    true
}

impl SubscriptionEntry {
    fn into_subscription(self, defaults: &SubscriptionDefaults) -> WebhookSubscription {
        let mut subscription = WebhookSubscription::with_defaults(
            self.tenant_id,
            self.url,
            self.secret,
            self.events,
            defaults,
        )
        .with_active(self.active)
        .with_timeout_ms(self.timeout_ms.unwrap_or(defaults.timeout_ms))
        .with_retry(
            self.retry_attempts.unwrap_or(defaults.retry_attempts),
            self.retry_delay_secs.unwrap_or(defaults.retry_delay_secs),
        );

        if let Some(id) = self.id {
            subscription.id = id;
        }
        subscription
    }
}

/// Subscription counters, without the secret.
#[derive(Debug, Serialize)]
struct SubscriptionReport {
    id: Uuid,
    url: Url,
    active: bool,
    success_count: u64,
    failed_count: u64,
    last_delivery_at: Option<Timestamp>,
    last_delivery_status: Option<DeliveryStatus>,
}

impl From<WebhookSubscription> for SubscriptionReport {
    fn from(subscription: WebhookSubscription) -> Self {
        Self {
            id: subscription.id,
            url: subscription.url,
            active: subscription.active,
            success_count: subscription.success_count,
            failed_count: subscription.failed_count,
            last_delivery_at: subscription.last_delivery_at,
            last_delivery_status: subscription.last_delivery_status,
        }
    }
}

#[derive(Debug, Serialize)]
struct SendTestReport {
    result: DeliveryResult,
    deliveries: Vec<WebhookDelivery>,
    subscription: Option<SubscriptionReport>,
}

#[derive(Debug, Serialize)]
struct EmitReport {
    summary: EmitSummary,
    deliveries: Vec<WebhookDelivery>,
    subscriptions: Vec<SubscriptionReport>,
}

pub async fn send_test(cli: &Cli, args: &SendTestArgs) -> anyhow::Result<()> {
    let subscription = WebhookSubscription::with_defaults(
        Uuid::now_v7(),
        args.url.clone(),
        WebhookSecret::new(args.secret.as_str()),
        [EventSelector::All],
        &args.defaults,
    );
    let subscription_id = subscription.id;

    let store = Arc::new(InMemoryStore::with_subscriptions([subscription.clone()]));
    let dispatcher = create_dispatcher(cli, store.clone())?;

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        url = %args.url,
        max_attempts = subscription.max_attempts(),
        "Sending test webhook"
    );

    let result = dispatcher.send_test(&subscription).await;
    let deliveries = store
        .list_for_subscription(subscription_id)
        .await
        .context("failed to read delivery ledger")?;

    print_json(&SendTestReport {
        result,
        deliveries,
        subscription: store.subscription(subscription_id).map(Into::into),
    })
}

pub async fn emit(cli: &Cli, args: &EmitArgs) -> anyhow::Result<()> {
    let subscriptions = load_subscriptions(&args.subscriptions, &args.defaults).await?;
    let ids: Vec<Uuid> = subscriptions.iter().map(|s| s.id).collect();

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        subscriptions = subscriptions.len(),
        tenant_id = %args.tenant,
        event = %args.event,
        "Loaded subscriptions"
    );

    let store = Arc::new(InMemoryStore::with_subscriptions(subscriptions));
    let dispatcher = create_dispatcher(cli, store.clone())?;

    let summary = dispatcher
        .emit(args.tenant, args.event, args.data.clone(), args.metadata.clone())
        .await;

    print_json(&EmitReport {
        summary,
        deliveries: store.deliveries(),
        subscriptions: ids
            .into_iter()
            .filter_map(|id| store.subscription(id))
            .map(Into::into)
            .collect(),
    })
}

/// Reads and validates the subscriptions file.
async fn load_subscriptions(
    path: &Path,
    defaults: &SubscriptionDefaults,
) -> anyhow::Result<Vec<WebhookSubscription>> {
    let contents = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let subscriptions = parse_subscriptions(&contents, defaults)
        .with_context(|| format!("invalid subscriptions file {}", path.display()))?;
    Ok(subscriptions)
}

fn parse_subscriptions(
    contents: &[u8],
    defaults: &SubscriptionDefaults,
) -> anyhow::Result<Vec<WebhookSubscription>> {
    let entries: Vec<SubscriptionEntry> = serde_json::from_slice(contents)?;

    let mut subscriptions = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        if entry.events.is_empty() {
            bail!("subscription #{index} has no events");
        }
        let subscription = entry.into_subscription(defaults);
        if subscriptions
            .iter()
            .any(|s: &WebhookSubscription| s.id == subscription.id)
        {
            bail!("subscription #{index} reuses id {}", subscription.id);
        }
        subscriptions.push(subscription);
    }
    Ok(subscriptions)
}
