//! HTTP transport abstraction used by the delivery executor.

use bytes::Bytes;
use url::Url;
use uuid::Uuid;

use crate::Result;

/// Header names of the outbound wire protocol.
pub mod headers {
    /// Hex HMAC-SHA256 of the body.
    pub const SIGNATURE: &str = "X-Webhook-Signature";
    /// Namespaced event name.
    pub const EVENT: &str = "X-Webhook-Event";
    /// RFC 3339 emission timestamp of the payload.
    pub const TIMESTAMP: &str = "X-Webhook-Timestamp";
    /// Ledger row id, unique per attempt.
    pub const ID: &str = "X-Webhook-ID";
    /// 1-based attempt number.
    pub const ATTEMPT: &str = "X-Webhook-Attempt";
}

/// One outbound HTTP `POST`.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    /// Ledger row id of this attempt.
    pub delivery_id: Uuid,
    /// Endpoint URL.
    pub url: Url,
    /// Exact body bytes.
    pub body: Bytes,
    /// Protocol headers, in send order.
    pub headers: Vec<(&'static str, String)>,
}

impl WebhookRequest {
    /// Creates a request without headers.
    pub fn new(delivery_id: Uuid, url: Url, body: Bytes) -> Self {
        Self {
            delivery_id,
            url,
            body,
            headers: Vec::new(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Returns the value of a header, if set.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Response received from an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response body as text.
    pub body: String,
}

impl WebhookResponse {
    /// Creates a response.
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }

    /// Returns whether the delivery was successful (2xx status code).
    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Maximum number of response body bytes kept in the ledger.
///
/// Transports need not read past this many bytes of a response body.
pub const RESPONSE_BODY_LIMIT: usize = 1000;

/// Sends one webhook request over the network.
///
/// Implementations return `Err` only for transport-level failures (DNS,
/// connection, TLS, protocol); any HTTP response, whatever its status, is
/// `Ok`. The caller owns the deadline and drops the future when it expires.
#[async_trait::async_trait]
pub trait WebhookTransport: Send + Sync {
    /// Sends the request and reads the response.
    async fn send(&self, request: &WebhookRequest) -> Result<WebhookResponse>;
}
