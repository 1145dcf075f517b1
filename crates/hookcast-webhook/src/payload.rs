//! Webhook payload envelope.

use bytes::Bytes;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{Result, WebhookEvent};

/// The envelope sent to webhook endpoints for one event occurrence.
///
/// Built once per emission and shared by every notified subscription, so all
/// of them receive byte-identical bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// The event that occurred, e.g. `booking.created`.
    pub event: WebhookEvent,

    /// When the event was emitted (RFC 3339).
    pub timestamp: Timestamp,

    /// Event-specific data produced by the payload builder.
    pub data: serde_json::Value,

    /// Free-form metadata, e.g. `{"source": "...", "action": "..."}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl WebhookPayload {
    /// Creates a payload stamped with the current time.
    pub fn new(event: WebhookEvent, data: serde_json::Value) -> Self {
        Self {
            event,
            timestamp: Timestamp::now(),
            data,
            metadata: None,
        }
    }

    /// Creates the payload of a `webhook.test` delivery.
    pub fn test() -> Self {
        Self::new(
            WebhookEvent::WebhookTest,
            serde_json::json!({
                "test": true,
                "message": "This is a test webhook delivery",
            }),
        )
    }

    /// Sets the metadata object.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Sets the emission timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Serializes the payload once into the bytes that are signed and sent.
    pub fn encode(&self) -> Result<EncodedPayload> {
        let body = serde_json::to_vec(self)?;
        Ok(EncodedPayload {
            event: self.event,
            timestamp: self.timestamp,
            body: Bytes::from(body),
        })
    }
}

/// A serialized payload, ready to be signed and transmitted.
///
/// Cloning is cheap: the body is reference-counted.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedPayload {
    event: WebhookEvent,
    timestamp: Timestamp,
    body: Bytes,
}

impl EncodedPayload {
    /// Returns the event of the encoded payload.
    #[inline]
    pub fn event(&self) -> WebhookEvent {
        self.event
    }

    /// Returns the emission timestamp.
    #[inline]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Returns the exact body bytes.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Returns whether the body is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Returns the body as text for the delivery ledger.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
