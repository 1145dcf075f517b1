//! Webhook subscription model.
//!
//! A subscription is a tenant's registration of an external endpoint. The
//! delivery core only reads subscriptions and bumps their rolling counters;
//! creation, edits and deletion belong to the admin surface.

use std::fmt;
use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::{DeliveryStatus, EventSelector, SubscriptionDefaults, WebhookEvent};

/// Shared HMAC secret of a subscription.
///
/// The value is never printed: `Debug` is redacted and there is no `Display`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    /// Wraps a raw secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the raw secret bytes used as the HMAC key.
    #[inline]
    pub fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(***)")
    }
}

/// A tenant's registration of an external webhook endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookSubscription {
    /// Unique subscription identifier.
    pub id: Uuid,
    /// Tenant that owns this subscription.
    pub tenant_id: Uuid,
    /// Endpoint receiving the callbacks.
    pub url: Url,
    /// HMAC-SHA256 signing secret, immutable after creation.
    pub secret: WebhookSecret,
    /// Subscribed events; may contain the `*` wildcard.
    pub events: Vec<EventSelector>,
    /// Inactive subscriptions are never dispatched to.
    pub active: bool,
    /// Hard deadline for one HTTP attempt, in milliseconds.
    pub timeout_ms: u64,
    /// Number of retries after the first attempt.
    pub retry_attempts: u32,
    /// Fixed delay between attempts, in seconds.
    pub retry_delay_secs: u64,
    /// Number of delivery sequences that ended in success.
    #[serde(default)]
    pub success_count: u64,
    /// Number of delivery sequences that exhausted their retries.
    #[serde(default)]
    pub failed_count: u64,
    /// When the last delivery sequence settled.
    #[serde(default)]
    pub last_delivery_at: Option<Timestamp>,
    /// Terminal status of the last delivery sequence.
    #[serde(default)]
    pub last_delivery_status: Option<DeliveryStatus>,
}

impl WebhookSubscription {
    /// Creates an active subscription with default delivery settings.
    pub fn new(
        tenant_id: Uuid,
        url: Url,
        secret: WebhookSecret,
        events: impl IntoIterator<Item = EventSelector>,
    ) -> Self {
        Self::with_defaults(tenant_id, url, secret, events, &SubscriptionDefaults::default())
    }

    /// Creates an active subscription using the given delivery defaults.
    pub fn with_defaults(
        tenant_id: Uuid,
        url: Url,
        secret: WebhookSecret,
        events: impl IntoIterator<Item = EventSelector>,
        defaults: &SubscriptionDefaults,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            tenant_id,
            url,
            secret,
            events: events.into_iter().collect(),
            active: true,
            timeout_ms: defaults.timeout_ms,
            retry_attempts: defaults.retry_attempts,
            retry_delay_secs: defaults.retry_delay_secs,
            success_count: 0,
            failed_count: 0,
            last_delivery_at: None,
            last_delivery_status: None,
        }
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Sets the retry budget and the fixed delay between attempts.
    #[must_use]
    pub fn with_retry(mut self, retry_attempts: u32, retry_delay_secs: u64) -> Self {
        self.retry_attempts = retry_attempts;
        self.retry_delay_secs = retry_delay_secs;
        self
    }

    /// Sets the active flag.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Returns whether the subscription receives events.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns whether the subscription is interested in the given event.
    pub fn subscribes_to(&self, event: WebhookEvent) -> bool {
        self.events.iter().any(|selector| selector.matches(event))
    }

    /// Returns the per-attempt timeout as a duration.
    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns the delay between attempts as a duration.
    #[inline]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Returns the total number of attempts, the first try included.
    #[inline]
    pub fn max_attempts(&self) -> u32 {
        self.retry_attempts.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(events: Vec<EventSelector>) -> WebhookSubscription {
        WebhookSubscription::new(
            Uuid::now_v7(),
            Url::parse("https://example.com/hooks").unwrap(),
            WebhookSecret::new("s3cr3t"),
            events,
        )
    }

    #[test]
    fn test_defaults_applied() {
        let sub = subscription(vec![EventSelector::All]);
        assert!(sub.is_active());
        assert_eq!(sub.timeout_ms, 30_000);
        assert_eq!(sub.retry_attempts, 3);
        assert_eq!(sub.retry_delay_secs, 60);
        assert_eq!(sub.max_attempts(), 4);
        assert_eq!(sub.success_count, 0);
        assert!(sub.last_delivery_status.is_none());
    }

    #[test]
    fn test_subscribes_to_literal_event_only() {
        let sub = subscription(vec![WebhookEvent::BookingCreated.into()]);
        assert!(sub.subscribes_to(WebhookEvent::BookingCreated));
        assert!(!sub.subscribes_to(WebhookEvent::BookingUpdated));
    }

    #[test]
    fn test_wildcard_subscribes_to_everything() {
        let sub = subscription(vec![EventSelector::All]);
        assert!(WebhookEvent::all().into_iter().all(|e| sub.subscribes_to(e)));
    }

    #[test]
    fn test_empty_event_set_matches_nothing() {
        let sub = subscription(vec![]);
        assert!(!sub.subscribes_to(WebhookEvent::TagAdded));
    }

    #[test]
    fn test_secret_is_redacted() {
        let sub = subscription(vec![EventSelector::All]);
        let debug = format!("{sub:?}");
        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("WebhookSecret(***)"));
    }

    #[test]
    fn test_builders() {
        let sub = subscription(vec![EventSelector::All])
            .with_timeout_ms(5_000)
            .with_retry(1, 2)
            .with_active(false);
        assert_eq!(sub.timeout(), Duration::from_secs(5));
        assert_eq!(sub.retry_delay(), Duration::from_secs(2));
        assert_eq!(sub.max_attempts(), 2);
        assert!(!sub.is_active());
    }

    #[test]
    fn test_deserialize_from_json() {
        let json = serde_json::json!({
            "id": "0190a0e0-0000-7000-8000-000000000001",
            "tenant_id": "0190a0e0-0000-7000-8000-000000000002",
            "url": "http://localhost:9000/hook",
            "secret": "abc",
            "events": ["qr.validated"],
            "active": true,
            "timeout_ms": 5000,
            "retry_attempts": 1,
            "retry_delay_secs": 1
        });
        let sub: WebhookSubscription = serde_json::from_value(json).unwrap();
        assert!(sub.subscribes_to(WebhookEvent::QrValidated));
        assert_eq!(sub.secret.expose(), b"abc");
        assert_eq!(sub.failed_count, 0);
    }
}
