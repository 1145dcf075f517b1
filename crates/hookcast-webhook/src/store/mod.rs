//! Persistence ports consumed by the delivery core.
//!
//! - [`SubscriptionStore`]: reads a tenant's subscriptions
//! - [`DeliveryStore`]: the append-only delivery ledger
//! - [`StatisticsStore`]: atomic counter updates on subscriptions
//!
//! [`InMemoryStore`] implements all three for tests and the CLI.

mod memory;

use jiff::Timestamp;
use uuid::Uuid;

pub use self::memory::InMemoryStore;
use crate::{DeliveryOutcome, NewDelivery, Result, WebhookDelivery, WebhookSubscription};

/// Tracing target for store operations.
pub const TRACING_TARGET: &str = "hookcast_webhook::store";

/// Read access to webhook subscriptions.
#[async_trait::async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Lists the active subscriptions of a tenant.
    async fn list_active(&self, tenant_id: Uuid) -> Result<Vec<WebhookSubscription>>;

    /// Finds a subscription by id.
    async fn find(&self, subscription_id: Uuid) -> Result<Option<WebhookSubscription>>;
}

/// The delivery ledger: one row per HTTP attempt.
#[async_trait::async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Inserts a `pending` row and returns its id.
    async fn create_pending(&self, delivery: NewDelivery) -> Result<Uuid>;

    /// Moves a `pending` row to its terminal status.
    ///
    /// Finalizing a row twice is a [`Conflict`](crate::ErrorKind::Conflict).
    async fn finalize(&self, delivery_id: Uuid, outcome: DeliveryOutcome) -> Result<()>;

    /// Finds a ledger row by id.
    async fn find(&self, delivery_id: Uuid) -> Result<Option<WebhookDelivery>>;

    /// Lists the rows of one subscription, oldest first.
    async fn list_for_subscription(&self, subscription_id: Uuid) -> Result<Vec<WebhookDelivery>>;
}

/// Rolling delivery counters of subscriptions.
///
/// Both operations must be atomic at the store level so concurrent sequences
/// for the same subscription never lose an increment.
#[async_trait::async_trait]
pub trait StatisticsStore: Send + Sync {
    /// Increments the success counter and records the delivery time.
    async fn increment_success(&self, subscription_id: Uuid, at: Timestamp) -> Result<()>;

    /// Increments the failure counter and records the delivery time.
    async fn increment_failure(&self, subscription_id: Uuid, at: Timestamp) -> Result<()>;
}
