//! Event fan-out to matching subscriptions.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::Instrument;
use uuid::Uuid;

use super::{DeliveryExecutor, RetryCoordinator, StatisticsUpdater};
use crate::store::{DeliveryStore, StatisticsStore, SubscriptionStore};
use crate::{
    DeliveryResult, DispatcherConfig, EncodedPayload, Error, Result, WebhookEvent, WebhookPayload,
    WebhookSubscription, WebhookTransport,
};

/// Tracing target for event dispatch.
pub const TRACING_TARGET: &str = "hookcast_webhook::dispatcher";

/// Outcome counts of one [`WebhookDispatcher::emit`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitSummary {
    /// Subscriptions selected for the event.
    pub matched: usize,
    /// Sequences that ended with a delivered attempt.
    pub succeeded: usize,
    /// Sequences that exhausted their retries or never ran.
    pub failed: usize,
}

impl EmitSummary {
    /// Returns whether no subscription matched the event.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.matched == 0
    }

    /// Returns whether every matched subscription was notified.
    #[inline]
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.succeeded == self.matched
    }
}

struct DispatcherInner {
    subscriptions: Arc<dyn SubscriptionStore>,
    retry: RetryCoordinator,
    statistics: StatisticsUpdater,
    config: DispatcherConfig,
}

/// Publishes domain events to every subscription of a tenant.
///
/// Cloning is cheap; clones share the stores, the transport and the
/// configuration.
#[derive(Clone)]
pub struct WebhookDispatcher {
    inner: Arc<DispatcherInner>,
}

impl fmt::Debug for WebhookDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookDispatcher")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl WebhookDispatcher {
    /// Returns a builder for the dispatcher.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Returns the dispatcher configuration.
    pub fn config(&self) -> &DispatcherConfig {
        &self.inner.config
    }

    /// Notifies every active subscription of the tenant that listens to `event`.
    ///
    /// The payload is serialized once, so all subscriptions receive the same
    /// bytes. Delivery sequences run concurrently, bounded by
    /// [`DispatcherConfig::max_concurrent_deliveries`], and this call returns
    /// once all of them have settled. Failures are logged and counted, never
    /// returned.
    #[tracing::instrument(
        skip(self, data, metadata),
        fields(tenant_id = %tenant_id, event = %event)
    )]
    pub async fn emit(
        &self,
        tenant_id: Uuid,
        event: WebhookEvent,
        data: serde_json::Value,
        metadata: Option<serde_json::Value>,
    ) -> EmitSummary {
        let subscriptions = match self.inner.subscriptions.list_active(tenant_id).await {
            Ok(subscriptions) => subscriptions,
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %err,
                    "Failed to load webhook subscriptions"
                );
                return EmitSummary::default();
            }
        };

        let matched: Vec<_> = subscriptions
            .into_iter()
            .filter(|subscription| subscription.is_active() && subscription.subscribes_to(event))
            .collect();

        if matched.is_empty() {
            tracing::debug!(
                target: TRACING_TARGET,
                "No webhooks subscribed to event"
            );
            return EmitSummary::default();
        }

        let mut payload = WebhookPayload::new(event, data);
        if let Some(metadata) = metadata {
            payload = payload.with_metadata(metadata);
        }

        let payload = match payload.encode() {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %err,
                    "Failed to serialize webhook payload"
                );
                return EmitSummary {
                    matched: matched.len(),
                    succeeded: 0,
                    failed: matched.len(),
                };
            }
        };

        tracing::debug!(
            target: TRACING_TARGET,
            webhook_count = matched.len(),
            payload_size = payload.len(),
            "Found webhooks subscribed to event"
        );

        let summary = self.fan_out(matched, payload).await;

        tracing::info!(
            target: TRACING_TARGET,
            matched = summary.matched,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Webhook event dispatched"
        );

        summary
    }

    /// Spawns [`emit`](Self::emit) on the current runtime and returns at once.
    ///
    /// Producers that must not wait for delivery can drop the handle.
    pub fn emit_detached(
        &self,
        tenant_id: Uuid,
        event: WebhookEvent,
        data: serde_json::Value,
        metadata: Option<serde_json::Value>,
    ) -> JoinHandle<EmitSummary> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.emit(tenant_id, event, data, metadata).await })
    }

    /// Sends a `webhook.test` event to one subscription, ignoring its event
    /// filter, and records the outcome in its statistics.
    #[tracing::instrument(skip_all, fields(subscription_id = %subscription.id))]
    pub async fn send_test(&self, subscription: &WebhookSubscription) -> DeliveryResult {
        let payload = match WebhookPayload::test().encode() {
            Ok(payload) => payload,
            Err(err) => return DeliveryResult::rejected(err.message_or_kind().to_owned()),
        };

        let result = self.run_sequence(subscription, &payload).await;

        tracing::info!(
            target: TRACING_TARGET,
            success = result.success,
            status_code = ?result.status_code,
            "Test webhook sent"
        );

        result
    }

    async fn fan_out(
        &self,
        subscriptions: Vec<WebhookSubscription>,
        payload: EncodedPayload,
    ) -> EmitSummary {
        let permits = Arc::new(Semaphore::new(self.inner.config.max_concurrent_deliveries));
        let mut summary = EmitSummary {
            matched: subscriptions.len(),
            ..EmitSummary::default()
        };

        let mut sequences = JoinSet::new();
        for subscription in subscriptions {
            let dispatcher = self.clone();
            let payload = payload.clone();
            let permits = permits.clone();

            sequences.spawn(
                async move {
                    let _permit = permits.acquire_owned().await;
                    dispatcher.run_sequence(&subscription, &payload).await.success
                }
                .in_current_span(),
            );
        }

        while let Some(joined) = sequences.join_next().await {
            match joined {
                Ok(true) => summary.succeeded += 1,
                Ok(false) => summary.failed += 1,
                Err(err) => {
                    tracing::error!(
                        target: TRACING_TARGET,
                        error = %err,
                        "Webhook delivery task aborted"
                    );
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Runs the retry sequence for one subscription and folds its final
    /// result into the subscription counters.
    async fn run_sequence(
        &self,
        subscription: &WebhookSubscription,
        payload: &EncodedPayload,
    ) -> DeliveryResult {
        let result = self.inner.retry.deliver_with_retry(subscription, payload).await;

        // Sequences that never produced a ledger row leave the counters alone.
        if result.delivery_id.is_none() {
            return result;
        }

        if let Err(err) = self
            .inner
            .statistics
            .record_outcome(subscription.id, &result)
            .await
        {
            tracing::error!(
                target: TRACING_TARGET,
                subscription_id = %subscription.id,
                error = %err,
                "Failed to update webhook statistics"
            );
        }

        result
    }
}

/// Builder for [`WebhookDispatcher`].
#[derive(Default)]
pub struct DispatcherBuilder {
    subscriptions: Option<Arc<dyn SubscriptionStore>>,
    deliveries: Option<Arc<dyn DeliveryStore>>,
    statistics: Option<Arc<dyn StatisticsStore>>,
    transport: Option<Arc<dyn WebhookTransport>>,
    config: DispatcherConfig,
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DispatcherBuilder {
    /// Sets the subscription store.
    #[must_use]
    pub fn subscriptions(mut self, store: Arc<dyn SubscriptionStore>) -> Self {
        self.subscriptions = Some(store);
        self
    }

    /// Sets the delivery ledger.
    #[must_use]
    pub fn deliveries(mut self, store: Arc<dyn DeliveryStore>) -> Self {
        self.deliveries = Some(store);
        self
    }

    /// Sets the statistics store.
    #[must_use]
    pub fn statistics(mut self, store: Arc<dyn StatisticsStore>) -> Self {
        self.statistics = Some(store);
        self
    }

    /// Uses one store for subscriptions, deliveries and statistics.
    #[must_use]
    pub fn store<S>(self, store: Arc<S>) -> Self
    where
        S: SubscriptionStore + DeliveryStore + StatisticsStore + 'static,
    {
        self.subscriptions(store.clone())
            .deliveries(store.clone())
            .statistics(store)
    }

    /// Sets the HTTP transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn WebhookTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the dispatcher configuration.
    #[must_use]
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the configuration and builds the dispatcher.
    pub fn build(self) -> Result<WebhookDispatcher> {
        self.config.validate()?;

        let subscriptions = self.subscriptions.ok_or_else(|| missing("subscription store"))?;
        let deliveries = self.deliveries.ok_or_else(|| missing("delivery store"))?;
        let statistics = self.statistics.ok_or_else(|| missing("statistics store"))?;
        let transport = self.transport.ok_or_else(|| missing("transport"))?;

        let executor = DeliveryExecutor::new(transport, deliveries);

        Ok(WebhookDispatcher {
            inner: Arc::new(DispatcherInner {
                subscriptions,
                retry: RetryCoordinator::new(executor),
                statistics: StatisticsUpdater::new(statistics),
                config: self.config,
            }),
        })
    }
}

fn missing(component: &'static str) -> Error {
    Error::configuration()
        .with_message("webhook dispatcher is missing a component")
        .with_context(component)
}
