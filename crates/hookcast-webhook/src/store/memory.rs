//! In-memory implementation of the store ports.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use jiff::Timestamp;
use uuid::Uuid;

use super::{DeliveryStore, StatisticsStore, SubscriptionStore, TRACING_TARGET};
use crate::{
    DeliveryOutcome, DeliveryStatus, Error, NewDelivery, Result, WebhookDelivery,
    WebhookSubscription,
};

#[derive(Debug, Default)]
struct Inner {
    subscriptions: HashMap<Uuid, WebhookSubscription>,
    deliveries: Vec<WebhookDelivery>,
}

/// Process-local store backing subscriptions, the ledger and counters.
///
/// All mutations happen under one lock, which makes counter increments and
/// ledger finalization atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with subscriptions.
    pub fn with_subscriptions(subscriptions: impl IntoIterator<Item = WebhookSubscription>) -> Self {
        let subscriptions = subscriptions
            .into_iter()
            .map(|subscription| (subscription.id, subscription))
            .collect();

        Self {
            inner: Mutex::new(Inner {
                subscriptions,
                deliveries: Vec::new(),
            }),
        }
    }

    /// Inserts or replaces a subscription.
    pub fn insert_subscription(&self, subscription: WebhookSubscription) -> Result<()> {
        self.lock()?
            .subscriptions
            .insert(subscription.id, subscription);
        Ok(())
    }

    /// Returns a snapshot of a subscription.
    pub fn subscription(&self, subscription_id: Uuid) -> Option<WebhookSubscription> {
        self.lock()
            .ok()
            .and_then(|inner| inner.subscriptions.get(&subscription_id).cloned())
    }

    /// Returns a snapshot of the whole ledger, in insertion order.
    pub fn deliveries(&self) -> Vec<WebhookDelivery> {
        self.lock()
            .map(|inner| inner.deliveries.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::storage().with_message("in-memory store lock poisoned"))
    }

    fn record(&self, subscription_id: Uuid, at: Timestamp, status: DeliveryStatus) -> Result<()> {
        let mut inner = self.lock()?;
        let subscription = inner.subscriptions.get_mut(&subscription_id).ok_or_else(|| {
            Error::not_found().with_message(format!("subscription {subscription_id} not found"))
        })?;

        match status {
            DeliveryStatus::Success => subscription.success_count += 1,
            _ => subscription.failed_count += 1,
        }
        subscription.last_delivery_at = Some(at);
        subscription.last_delivery_status = Some(status);

        Ok(())
    }
}

#[async_trait::async_trait]
impl SubscriptionStore for InMemoryStore {
    async fn list_active(&self, tenant_id: Uuid) -> Result<Vec<WebhookSubscription>> {
        let inner = self.lock()?;
        let mut subscriptions: Vec<_> = inner
            .subscriptions
            .values()
            .filter(|s| s.tenant_id == tenant_id && s.is_active())
            .cloned()
            .collect();
        subscriptions.sort_by_key(|s| s.id);
        Ok(subscriptions)
    }

    async fn find(&self, subscription_id: Uuid) -> Result<Option<WebhookSubscription>> {
        Ok(self.lock()?.subscriptions.get(&subscription_id).cloned())
    }
}

#[async_trait::async_trait]
impl DeliveryStore for InMemoryStore {
    async fn create_pending(&self, delivery: NewDelivery) -> Result<Uuid> {
        let row = WebhookDelivery::pending(delivery);
        let id = row.id;

        tracing::trace!(
            target: TRACING_TARGET,
            delivery_id = %id,
            subscription_id = %row.subscription_id,
            attempt = row.attempt,
            "Created pending delivery"
        );

        self.lock()?.deliveries.push(row);
        Ok(id)
    }

    async fn finalize(&self, delivery_id: Uuid, outcome: DeliveryOutcome) -> Result<()> {
        if !outcome.status.is_terminal() {
            return Err(Error::invalid_input()
                .with_message("a delivery can only be finalized with a terminal status"));
        }

        let mut inner = self.lock()?;
        let row = inner
            .deliveries
            .iter_mut()
            .find(|row| row.id == delivery_id)
            .ok_or_else(|| {
                Error::not_found().with_message(format!("delivery {delivery_id} not found"))
            })?;

        if row.status.is_terminal() {
            return Err(Error::conflict()
                .with_message(format!("delivery {delivery_id} is already {}", row.status)));
        }

        row.apply(outcome);
        Ok(())
    }

    async fn find(&self, delivery_id: Uuid) -> Result<Option<WebhookDelivery>> {
        Ok(self
            .lock()?
            .deliveries
            .iter()
            .find(|row| row.id == delivery_id)
            .cloned())
    }

    async fn list_for_subscription(&self, subscription_id: Uuid) -> Result<Vec<WebhookDelivery>> {
        Ok(self
            .lock()?
            .deliveries
            .iter()
            .filter(|row| row.subscription_id == subscription_id)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl StatisticsStore for InMemoryStore {
    async fn increment_success(&self, subscription_id: Uuid, at: Timestamp) -> Result<()> {
        self.record(subscription_id, at, DeliveryStatus::Success)
    }

    async fn increment_failure(&self, subscription_id: Uuid, at: Timestamp) -> Result<()> {
        self.record(subscription_id, at, DeliveryStatus::Failed)
    }
}
