//! Bounded retry loop with a fixed inter-attempt delay.

use std::time::Duration;

use super::DeliveryExecutor;
use crate::{DeliveryResult, EncodedPayload, WebhookSubscription};

/// Tracing target for retry sequences.
pub const TRACING_TARGET: &str = "hookcast_webhook::retry";

/// Retry policy of one subscription: `retry_attempts + 1` tries separated by
/// a fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy allowing `retry_attempts` retries after the first try.
    pub fn new(retry_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: retry_attempts.saturating_add(1),
            delay,
        }
    }

    /// Derives the policy from a subscription.
    pub fn from_subscription(subscription: &WebhookSubscription) -> Self {
        Self::new(subscription.retry_attempts, subscription.retry_delay())
    }

    /// Total number of attempts, the first try included.
    #[inline]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait before the given 1-based attempt.
    ///
    /// Returns `None` for the first attempt and for attempts past the budget.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        (attempt > 1 && attempt <= self.max_attempts).then_some(self.delay)
    }
}

/// Runs the executor until the first success or until the budget is spent.
#[derive(Debug, Clone)]
pub struct RetryCoordinator {
    executor: DeliveryExecutor,
}

impl RetryCoordinator {
    /// Wraps an executor.
    pub fn new(executor: DeliveryExecutor) -> Self {
        Self { executor }
    }

    /// Delivers the payload, retrying failed attempts per the subscription
    /// policy, and returns the result of the last attempt.
    ///
    /// Attempts are strictly sequential. An attempt that was never issued
    /// (no ledger row, e.g. an inactive subscription) ends the sequence.
    pub async fn deliver_with_retry(
        &self,
        subscription: &WebhookSubscription,
        payload: &EncodedPayload,
    ) -> DeliveryResult {
        let policy = RetryPolicy::from_subscription(subscription);
        let mut attempt = 1;

        loop {
            let result = self.executor.deliver(subscription, payload, attempt).await;

            if result.success {
                if attempt > 1 {
                    tracing::info!(
                        target: TRACING_TARGET,
                        subscription_id = %subscription.id,
                        attempt,
                        "Webhook delivered after retry"
                    );
                }
                return result;
            }

            if result.delivery_id.is_none() {
                return result;
            }

            let Some(delay) = policy.delay_before(attempt + 1) else {
                tracing::warn!(
                    target: TRACING_TARGET,
                    subscription_id = %subscription.id,
                    attempts = attempt,
                    error = ?result.error,
                    "Webhook delivery exhausted its retries"
                );
                return result;
            };

            tracing::debug!(
                target: TRACING_TARGET,
                subscription_id = %subscription.id,
                attempt,
                next_attempt = attempt + 1,
                delay_secs = delay.as_secs(),
                "Scheduling webhook retry"
            );

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use url::Url;
    use uuid::Uuid;

    use super::*;
    use crate::store::InMemoryStore;
    use crate::transport::headers;
    use crate::{
        DeliveryStatus, Error, EventSelector, Result, WebhookEvent, WebhookPayload,
        WebhookRequest, WebhookResponse, WebhookSecret, WebhookTransport,
    };

    /// Transport double replaying a queue of status codes (`0` = network error).
    struct SequenceTransport {
        replies: Mutex<VecDeque<u16>>,
        sent_at: Mutex<Vec<(tokio::time::Instant, String)>>,
    }

    impl SequenceTransport {
        fn new(replies: impl IntoIterator<Item = u16>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().collect()),
                sent_at: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(tokio::time::Instant, String)> {
            self.sent_at.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl WebhookTransport for SequenceTransport {
        async fn send(&self, request: &WebhookRequest) -> Result<WebhookResponse> {
            let attempt = request.header(headers::ATTEMPT).unwrap_or_default().to_owned();
            self.sent_at
                .lock()
                .unwrap()
                .push((tokio::time::Instant::now(), attempt));

            match self.replies.lock().unwrap().pop_front().unwrap_or(500) {
                0 => Err(Error::network_error().with_message("Connection refused")),
                code => Ok(WebhookResponse::new(code, format!("status {code}"))),
            }
        }
    }

    fn subscription(retry_attempts: u32, retry_delay_secs: u64) -> WebhookSubscription {
        WebhookSubscription::new(
            Uuid::now_v7(),
            Url::parse("https://example.com/hook").unwrap(),
            WebhookSecret::new("secret"),
            [EventSelector::All],
        )
        .with_retry(retry_attempts, retry_delay_secs)
    }

    fn coordinator(transport: Arc<SequenceTransport>, store: Arc<InMemoryStore>) -> RetryCoordinator {
        RetryCoordinator::new(DeliveryExecutor::new(transport, store))
    }

    fn payload() -> EncodedPayload {
        WebhookPayload::new(WebhookEvent::BookingUpdated, serde_json::json!({"id": 7}))
            .encode()
            .unwrap()
    }

    #[test]
    fn test_policy_delays() {
        let policy = RetryPolicy::new(2, Duration::from_secs(5));
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_before(1), None);
        assert_eq!(policy.delay_before(2), Some(Duration::from_secs(5)));
        assert_eq!(policy.delay_before(3), Some(Duration::from_secs(5)));
        assert_eq!(policy.delay_before(4), None);
    }

    #[test]
    fn test_policy_saturates() {
        let policy = RetryPolicy::new(u32::MAX, Duration::ZERO);
        assert_eq!(policy.max_attempts(), u32::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_exhausts_budget() {
        let transport = SequenceTransport::new([500, 0, 502]);
        let store = Arc::new(InMemoryStore::new());
        let sub = subscription(2, 1);

        let result = coordinator(transport.clone(), store.clone())
            .deliver_with_retry(&sub, &payload())
            .await;

        assert!(!result.success);
        assert_eq!(result.status_code, Some(502));

        let rows = store.deliveries();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows.iter().map(|row| row.attempt).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(rows.iter().all(|row| row.status == DeliveryStatus::Failed));
        assert_eq!(result.delivery_id, Some(rows[2].id));
        assert_eq!(result.error, rows[2].error_message);
        assert_eq!(rows[1].error_message.as_deref(), Some("Connection refused"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_after_first_success() {
        let transport = SequenceTransport::new([500, 200, 200]);
        let store = Arc::new(InMemoryStore::new());
        let sub = subscription(2, 1);

        let result = coordinator(transport.clone(), store.clone())
            .deliver_with_retry(&sub, &payload())
            .await;

        assert!(result.success);
        let rows = store.deliveries();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, DeliveryStatus::Failed);
        assert_eq!(rows[1].status, DeliveryStatus::Success);
        assert_eq!(rows[1].attempt, 2);
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_between_attempts() {
        let transport = SequenceTransport::new([500, 500, 500]);
        let store = Arc::new(InMemoryStore::new());
        let sub = subscription(2, 3);

        coordinator(transport.clone(), store)
            .deliver_with_retry(&sub, &payload())
            .await;

        let calls = transport.calls();
        let attempts: Vec<_> = calls.iter().map(|(_, attempt)| attempt.as_str()).collect();
        assert_eq!(attempts, vec!["1", "2", "3"]);
        assert_eq!(calls[1].0 - calls[0].0, Duration::from_secs(3));
        assert_eq!(calls[2].0 - calls[1].0, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_no_retries_configured() {
        let transport = SequenceTransport::new([500]);
        let store = Arc::new(InMemoryStore::new());
        let sub = subscription(0, 60);

        let result = coordinator(transport, store.clone())
            .deliver_with_retry(&sub, &payload())
            .await;

        assert!(!result.success);
        assert_eq!(store.deliveries().len(), 1);
    }

    #[tokio::test]
    async fn test_inactive_subscription_is_not_retried() {
        let transport = SequenceTransport::new([]);
        let store = Arc::new(InMemoryStore::new());
        let sub = subscription(3, 60).with_active(false);

        let result = coordinator(transport.clone(), store.clone())
            .deliver_with_retry(&sub, &payload())
            .await;

        assert!(!result.success);
        assert!(transport.calls().is_empty());
        assert!(store.deliveries().is_empty());
    }
}
