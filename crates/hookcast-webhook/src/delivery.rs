//! Delivery ledger rows and per-attempt results.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::WebhookEvent;

/// Status of one delivery attempt in the ledger.
///
/// Rows are created `pending` and move to `success` or `failed` exactly once.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryStatus {
    /// The HTTP call has not resolved yet.
    #[default]
    Pending,
    /// The endpoint answered with a 2xx status.
    Success,
    /// The attempt failed or timed out.
    Failed,
}

impl DeliveryStatus {
    /// Returns whether the status is terminal.
    #[inline]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One ledger row: a single HTTP attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookDelivery {
    /// Unique delivery identifier, sent as `X-Webhook-ID`.
    pub id: Uuid,
    /// Subscription this attempt was made for.
    pub subscription_id: Uuid,
    /// Event carried by the payload.
    pub event: WebhookEvent,
    /// Serialized payload body.
    pub payload: String,
    /// Payload size in bytes.
    pub payload_size: usize,
    /// 1-based attempt number within the retry sequence.
    pub attempt: u32,
    /// Current status of the attempt.
    pub status: DeliveryStatus,
    /// HTTP status code, if a response was received.
    pub status_code: Option<u16>,
    /// Response body, truncated.
    pub response_body: Option<String>,
    /// Wall-clock duration of the attempt.
    pub duration_ms: Option<u64>,
    /// Failure description.
    pub error_message: Option<String>,
    /// When the row was created.
    pub created_at: Timestamp,
    /// When the row was finalized.
    pub completed_at: Option<Timestamp>,
}

impl WebhookDelivery {
    /// Builds a pending row from a ledger insert.
    pub fn pending(new: NewDelivery) -> Self {
        Self {
            id: Uuid::now_v7(),
            subscription_id: new.subscription_id,
            event: new.event,
            payload: new.payload,
            payload_size: new.payload_size,
            attempt: new.attempt,
            status: DeliveryStatus::Pending,
            status_code: None,
            response_body: None,
            duration_ms: None,
            error_message: None,
            created_at: Timestamp::now(),
            completed_at: None,
        }
    }

    /// Applies the terminal outcome to this row.
    pub fn apply(&mut self, outcome: DeliveryOutcome) {
        self.status = outcome.status;
        self.status_code = outcome.status_code;
        self.response_body = outcome.response_body;
        self.duration_ms = Some(outcome.duration_ms);
        self.error_message = outcome.error_message;
        self.completed_at = Some(Timestamp::now());
    }
}

/// Data needed to insert a pending ledger row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDelivery {
    /// Subscription the attempt is made for.
    pub subscription_id: Uuid,
    /// Event carried by the payload.
    pub event: WebhookEvent,
    /// Serialized payload body.
    pub payload: String,
    /// Payload size in bytes.
    pub payload_size: usize,
    /// 1-based attempt number.
    pub attempt: u32,
}

/// Terminal outcome written to a ledger row.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    /// `success` or `failed`.
    pub status: DeliveryStatus,
    /// HTTP status code, if a response was received.
    pub status_code: Option<u16>,
    /// Truncated response body.
    pub response_body: Option<String>,
    /// Attempt duration.
    pub duration_ms: u64,
    /// Failure description.
    pub error_message: Option<String>,
}

/// Result of one delivery attempt as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// Whether the endpoint answered with a 2xx status.
    pub success: bool,
    /// HTTP status code, if a response was received.
    pub status_code: Option<u16>,
    /// Attempt duration.
    pub duration_ms: u64,
    /// Failure description.
    pub error: Option<String>,
    /// Ledger row of the attempt; absent when no row was written.
    pub delivery_id: Option<Uuid>,
}

impl DeliveryResult {
    /// A failure that never reached the network and has no ledger row.
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code: None,
            duration_ms: 0,
            error: Some(error.into()),
            delivery_id: None,
        }
    }

    /// Returns the ledger status equivalent of this result.
    #[inline]
    pub fn status(&self) -> DeliveryStatus {
        if self.success {
            DeliveryStatus::Success
        } else {
            DeliveryStatus::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_delivery() -> NewDelivery {
        NewDelivery {
            subscription_id: Uuid::now_v7(),
            event: WebhookEvent::BookingCreated,
            payload: "{}".to_owned(),
            payload_size: 2,
            attempt: 1,
        }
    }

    #[test]
    fn test_pending_row() {
        let row = WebhookDelivery::pending(new_delivery());
        assert_eq!(row.status, DeliveryStatus::Pending);
        assert_eq!(row.attempt, 1);
        assert!(row.completed_at.is_none());
        assert!(!row.status.is_terminal());
    }

    #[test]
    fn test_apply_outcome() {
        let mut row = WebhookDelivery::pending(new_delivery());
        row.apply(DeliveryOutcome {
            status: DeliveryStatus::Failed,
            status_code: Some(500),
            response_body: Some("boom".to_owned()),
            duration_ms: 42,
            error_message: Some("HTTP 500: boom".to_owned()),
        });

        assert_eq!(row.status, DeliveryStatus::Failed);
        assert_eq!(row.status_code, Some(500));
        assert_eq!(row.duration_ms, Some(42));
        assert!(row.completed_at.is_some());
        assert!(row.status.is_terminal());
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(DeliveryStatus::Success.to_string(), "success");
        assert_eq!("failed".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::Failed);
        assert_eq!(
            serde_json::to_string(&DeliveryStatus::Pending).unwrap(),
            "\"pending\""
        );
    }

    #[test]
    fn test_rejected_result() {
        let result = DeliveryResult::rejected("inactive");
        assert!(!result.success);
        assert!(result.delivery_id.is_none());
        assert_eq!(result.status(), DeliveryStatus::Failed);
    }
}
