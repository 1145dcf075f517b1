//! Single delivery attempt.

use std::fmt;
use std::sync::Arc;

use tokio::time::Instant;

use crate::store::DeliveryStore;
use crate::transport::{RESPONSE_BODY_LIMIT, headers};
use crate::{
    DeliveryOutcome, DeliveryResult, DeliveryStatus, EncodedPayload, Error, ErrorKind,
    NewDelivery, WebhookRequest, WebhookResponse, WebhookSubscription, WebhookTransport, signer,
};

/// Tracing target for delivery attempts.
pub const TRACING_TARGET: &str = "hookcast_webhook::executor";

/// Error reported for attempts against inactive subscriptions.
pub const INACTIVE_SUBSCRIPTION: &str = "Webhook subscription is inactive";

/// Maximum number of response body bytes quoted in error messages.
pub const ERROR_EXCERPT_LIMIT: usize = 200;

/// Performs one signed HTTP attempt and records it in the ledger.
///
/// Every failure mode resolves to a [`DeliveryResult`] with `success == false`;
/// nothing is propagated to the caller.
#[derive(Clone)]
pub struct DeliveryExecutor {
    transport: Arc<dyn WebhookTransport>,
    deliveries: Arc<dyn DeliveryStore>,
}

impl fmt::Debug for DeliveryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryExecutor").finish_non_exhaustive()
    }
}

impl DeliveryExecutor {
    /// Creates an executor over a transport and a ledger.
    pub fn new(transport: Arc<dyn WebhookTransport>, deliveries: Arc<dyn DeliveryStore>) -> Self {
        Self {
            transport,
            deliveries,
        }
    }

    /// Delivers the payload to the subscription endpoint as attempt `attempt`.
    ///
    /// Inactive subscriptions are rejected without touching the ledger. For
    /// everything else a `pending` row is written before the request is sent
    /// and finalized once the request resolves or its deadline expires.
    pub async fn deliver(
        &self,
        subscription: &WebhookSubscription,
        payload: &EncodedPayload,
        attempt: u32,
    ) -> DeliveryResult {
        if !subscription.is_active() {
            tracing::debug!(
                target: TRACING_TARGET,
                subscription_id = %subscription.id,
                "Skipping inactive subscription"
            );
            return DeliveryResult::rejected(INACTIVE_SUBSCRIPTION);
        }

        let signature = signer::sign(payload.body(), subscription.secret.expose());

        let pending = NewDelivery {
            subscription_id: subscription.id,
            event: payload.event(),
            payload: payload.body_text(),
            payload_size: payload.len(),
            attempt,
        };

        let delivery_id = match self.deliveries.create_pending(pending).await {
            Ok(delivery_id) => delivery_id,
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    subscription_id = %subscription.id,
                    attempt,
                    error = %err,
                    "Failed to record pending delivery"
                );
                return DeliveryResult::rejected(format!(
                    "Failed to record delivery: {}",
                    err.message_or_kind()
                ));
            }
        };

        let request = WebhookRequest::new(delivery_id, subscription.url.clone(), payload.body().clone())
            .with_header(headers::SIGNATURE, signature)
            .with_header(headers::EVENT, payload.event().as_str())
            .with_header(headers::TIMESTAMP, payload.timestamp().to_string())
            .with_header(headers::ID, delivery_id.to_string())
            .with_header(headers::ATTEMPT, attempt.to_string());

        tracing::debug!(
            target: TRACING_TARGET,
            subscription_id = %subscription.id,
            delivery_id = %delivery_id,
            url = %subscription.url,
            event = %payload.event(),
            attempt,
            timeout_ms = subscription.timeout_ms,
            "Delivering webhook"
        );

        let started_at = Instant::now();
        let sent = tokio::time::timeout(subscription.timeout(), self.transport.send(&request)).await;
        let duration_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);

        let outcome = match sent {
            Ok(Ok(response)) => response_outcome(response, duration_ms),
            Ok(Err(err)) => transport_outcome(&err, subscription.timeout_ms, duration_ms),
            Err(_elapsed) => timeout_outcome(subscription.timeout_ms, duration_ms),
        };

        let result = DeliveryResult {
            success: outcome.status == DeliveryStatus::Success,
            status_code: outcome.status_code,
            duration_ms,
            error: outcome.error_message.clone(),
            delivery_id: Some(delivery_id),
        };

        if result.success {
            tracing::debug!(
                target: TRACING_TARGET,
                delivery_id = %delivery_id,
                status_code = ?result.status_code,
                duration_ms,
                "Webhook attempt succeeded"
            );
        } else {
            tracing::warn!(
                target: TRACING_TARGET,
                delivery_id = %delivery_id,
                subscription_id = %subscription.id,
                attempt,
                status_code = ?result.status_code,
                error = ?result.error,
                duration_ms,
                "Webhook attempt failed"
            );
        }

        if let Err(err) = self.deliveries.finalize(delivery_id, outcome).await {
            tracing::error!(
                target: TRACING_TARGET,
                delivery_id = %delivery_id,
                error = %err,
                "Failed to finalize delivery"
            );
        }

        result
    }
}

fn response_outcome(response: WebhookResponse, duration_ms: u64) -> DeliveryOutcome {
    let success = response.is_success();
    let error_message = (!success).then(|| {
        let excerpt = truncate(&response.body, ERROR_EXCERPT_LIMIT);
        if excerpt.is_empty() {
            format!("HTTP {}", response.status_code)
        } else {
            format!("HTTP {}: {excerpt}", response.status_code)
        }
    });

    DeliveryOutcome {
        status: if success {
            DeliveryStatus::Success
        } else {
            DeliveryStatus::Failed
        },
        status_code: Some(response.status_code),
        response_body: Some(truncate(&response.body, RESPONSE_BODY_LIMIT).to_owned()),
        duration_ms,
        error_message,
    }
}

fn transport_outcome(error: &Error, timeout_ms: u64, duration_ms: u64) -> DeliveryOutcome {
    if error.kind == ErrorKind::Timeout {
        return timeout_outcome(timeout_ms, duration_ms);
    }

    let message = error
        .message
        .as_deref()
        .filter(|message| !message.is_empty())
        .unwrap_or("Network error");

    failed_outcome(message.to_owned(), duration_ms)
}

fn timeout_outcome(timeout_ms: u64, duration_ms: u64) -> DeliveryOutcome {
    failed_outcome(format!("Timeout after {timeout_ms}ms"), duration_ms)
}

fn failed_outcome(error_message: String, duration_ms: u64) -> DeliveryOutcome {
    DeliveryOutcome {
        status: DeliveryStatus::Failed,
        status_code: None,
        response_body: None,
        duration_ms,
        error_message: Some(error_message),
    }
}

/// Truncates to at most `max_bytes` without splitting a UTF-8 character.
fn truncate(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
