//! Reqwest-based HTTP client for webhook delivery.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::{Client, Response};

use super::{Error, ReqwestConfig, TRACING_TARGET};
use crate::{RESPONSE_BODY_LIMIT, WebhookRequest, WebhookResponse, WebhookTransport};

/// Inner client that holds the HTTP client and configuration.
struct ReqwestClientInner {
    http: Client,
    config: ReqwestConfig,
}

/// Reqwest-based transport delivering signed payloads to subscriber endpoints.
///
/// The connection pool is shared by all clones. Redirects are not followed:
/// a `3xx` answer is reported back as a non-success status.
#[derive(Clone)]
pub struct ReqwestClient {
    inner: Arc<ReqwestClientInner>,
}

impl std::fmt::Debug for ReqwestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestClient {
    /// Creates a new reqwest client with the given configuration.
    pub fn new(config: ReqwestConfig) -> crate::Result<Self> {
        config.validate()?;
        let user_agent = config.effective_user_agent();

        tracing::debug!(
            target: TRACING_TARGET,
            user_agent = %user_agent,
            connect_timeout_ms = config.connect_timeout_ms,
            "Creating reqwest client"
        );

        let http = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(config.connect_timeout())
            .pool_idle_timeout(config.pool_idle_timeout())
            .redirect(Policy::none())
            .build()
            .map_err(Error::from)?;

        let inner = ReqwestClientInner { http, config };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Gets the underlying HTTP client.
    pub(crate) fn http(&self) -> &Client {
        &self.inner.http
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &ReqwestConfig {
        &self.inner.config
    }
}

#[async_trait::async_trait]
impl WebhookTransport for ReqwestClient {
    async fn send(&self, request: &WebhookRequest) -> crate::Result<WebhookResponse> {
        tracing::trace!(
            target: TRACING_TARGET,
            delivery_id = %request.delivery_id,
            url = %request.url,
            body_size = request.body.len(),
            "Sending webhook request"
        );

        let mut http_request = self
            .http()
            .post(request.url.clone())
            .header(CONTENT_TYPE, "application/json");

        for (name, value) in &request.headers {
            http_request = http_request.header(*name, value);
        }

        let http_response = http_request
            .body(request.body.clone())
            .send()
            .await
            .map_err(Error::from)?;

        let status_code = http_response.status().as_u16();
        let body = read_body(http_response, request.delivery_id).await;

        tracing::trace!(
            target: TRACING_TARGET,
            delivery_id = %request.delivery_id,
            status_code,
            "Webhook response received"
        );

        Ok(WebhookResponse::new(status_code, body))
    }
}

/// Reads at most [`RESPONSE_BODY_LIMIT`] bytes of the body, then drops the
/// response.
///
/// A read error after the status line keeps whatever arrived so far.
async fn read_body(mut response: Response, delivery_id: uuid::Uuid) -> String {
    let mut buffer = Vec::new();

    while buffer.len() < RESPONSE_BODY_LIMIT {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let remaining = RESPONSE_BODY_LIMIT - buffer.len();
                buffer.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
            }
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    delivery_id = %delivery_id,
                    error = %err,
                    bytes_read = buffer.len(),
                    "Failed to read webhook response body"
                );
                break;
            }
        }
    }

    // A character split at the cut is dropped rather than replaced.
    if let Err(err) = std::str::from_utf8(&buffer)
        && err.error_len().is_none()
    {
        buffer.truncate(err.valid_up_to());
    }

    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::ErrorKind;

    fn request_to(addr: std::net::SocketAddr) -> WebhookRequest {
        WebhookRequest::new(
            uuid::Uuid::now_v7(),
            url::Url::parse(&format!("http://{addr}/hook")).unwrap(),
            bytes::Bytes::from_static(b"{}"),
        )
    }

    /// Accepts one connection, reads the whole request and writes `reply`
    /// verbatim before closing the write half.
    async fn serve_raw(reply: Vec<u8>) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            while !received.ends_with(b"{}") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => received.extend_from_slice(&buf[..n]),
                }
            }

            let _ = socket.write_all(&reply).await;
            let _ = socket.shutdown().await;
            // Wait for the client to hang up.
            while let Ok(n) = socket.read(&mut buf).await {
                if n == 0 {
                    break;
                }
            }
        });

        addr
    }

    #[test]
    fn test_client_creation() {
        let client = ReqwestClient::new(ReqwestConfig::default()).unwrap();
        assert!(client.config().user_agent.is_none());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ReqwestConfig::default().with_connect_timeout_ms(0);
        let error = ReqwestClient::new(config).unwrap_err();
        assert_eq!(error.kind, ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Bind then drop to get a local port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ReqwestClient::new(ReqwestConfig::default()).unwrap();
        let error = client.send(&request_to(addr)).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::NetworkError);
        assert!(error.message_or_kind().starts_with("Connection failed"));
    }

    #[tokio::test]
    async fn test_large_body_is_read_up_to_limit() {
        let body = "x".repeat(4 * 1024 * 1024);
        let mut reply = format!(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: {}\r\n\r\n",
            body.len()
        )
        .into_bytes();
        reply.extend_from_slice(body.as_bytes());
        let addr = serve_raw(reply).await;

        let client = ReqwestClient::new(ReqwestConfig::default()).unwrap();
        let response = client.send(&request_to(addr)).await.unwrap();
        assert_eq!(response.status_code, 500);
        assert_eq!(response.body.len(), RESPONSE_BODY_LIMIT);
    }

    #[tokio::test]
    async fn test_truncated_body_keeps_status_code() {
        // Announces 100 bytes, sends 5, then closes the connection.
        let reply = b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 100\r\n\r\nbusy.".to_vec();
        let addr = serve_raw(reply).await;

        let client = ReqwestClient::new(ReqwestConfig::default()).unwrap();
        let response = client.send(&request_to(addr)).await.unwrap();
        assert_eq!(response.status_code, 503);
        assert!(response.body.len() <= 5);
    }
}
