//! Transports - how a [`PreparedRequest`] reaches the server.
//!
//! Every call is single-shot: there is no retry policy. A network error fails
//! the owning case and the run moves on.
//!
//! # Dyn Compatibility
//!
//! [`Transport`] returns `Pin<Box<dyn Future>>` instead of using `async fn` so
//! the runner can hold an `Arc<dyn Transport>` and tests can swap in the mock
//! transport from `api-chain-testing`.

use api_chain_core::{Method, PreparedRequest};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Maximum response size (50MB)
pub const MAX_RESPONSE_SIZE: usize = 50 * 1024 * 1024;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CapturedResponse, TransportError>> + Send + 'a>>;

/// Errors from sending a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Base URL or path did not form a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The request could not be built, e.g. an invalid header name or value.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Connection, TLS or timeout failure.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// Response body exceeded the size cap.
    #[error("Response too large (>{limit} bytes)")]
    ResponseTooLarge {
        /// The cap that was exceeded
        limit: usize,
    },

    /// Reading the response body failed.
    #[error("Failed to read response: {0}")]
    Body(String),
}

/// What came back from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers, lower-cased names
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy)
    pub body: String,
}

impl CapturedResponse {
    /// Response with a status and body and no headers.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// First header with this name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Parse the body as untyped JSON.
    ///
    /// # Errors
    ///
    /// Returns the parse error if the body is not JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Decode the body into a typed response schema.
    ///
    /// # Errors
    ///
    /// Returns the decode error when the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Sends prepared requests.
pub trait Transport: Send + Sync {
    /// Send one request and capture the response.
    ///
    /// Implementations must not retry.
    fn send(&self, request: PreparedRequest) -> TransportFuture<'_>;

    /// Absolute URL for a request path, used in diagnostics.
    fn url_for(&self, path: &str) -> String {
        path.to_string()
    }
}

/// reqwest-backed transport against a base server URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for `base_url` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] if `base_url` is not http(s) and
    /// [`TransportError::Request`] if the client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a transport with an explicit per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] if `base_url` is not http(s) and
    /// [`TransportError::Request`] if the client cannot be built.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let base_url = base_url.into();

        // Security: Only allow http:// and https://
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(TransportError::InvalidUrl(format!(
                "{base_url} (must start with http:// or https://)"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn execute(&self, request: PreparedRequest) -> Result<CapturedResponse, TransportError> {
        let url = self.url_for(&request.path);
        let parsed =
            reqwest::Url::parse(&url).map_err(|e| TransportError::InvalidUrl(format!("{url}: {e}")))?;
        let mut builder = match request.method {
            Method::Get => self.client.get(parsed),
            Method::Post => self.client.post(parsed),
            Method::Put => self.client.put(parsed),
            Method::Patch => self.client.patch(parsed),
            Method::Delete => self.client.delete(parsed),
            Method::Head => self.client.head(parsed),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                TransportError::InvalidRequest(e.to_string())
            } else {
                TransportError::Request(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or("<invalid>").to_string(),
                )
            })
            .collect();

        // Stream response with size limit
        let mut body_bytes = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| TransportError::Body(e.to_string()))?;

            if body_bytes.len() + chunk.len() > MAX_RESPONSE_SIZE {
                return Err(TransportError::ResponseTooLarge {
                    limit: MAX_RESPONSE_SIZE,
                });
            }

            body_bytes.extend_from_slice(&chunk);
        }

        Ok(CapturedResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&body_bytes).to_string(),
        })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: PreparedRequest) -> TransportFuture<'_> {
        Box::pin(self.execute(request))
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_base_url() {
        let result = HttpTransport::new("file:///etc/passwd");
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn test_url_joining() {
        let transport = HttpTransport::new("http://localhost:8088/").expect("valid base");
        assert_eq!(transport.base_url(), "http://localhost:8088");
        assert_eq!(
            transport.url_for("/events/E1/codes"),
            "http://localhost:8088/events/E1/codes"
        );
        assert_eq!(
            transport.url_for("tickets?query="),
            "http://localhost:8088/tickets?query="
        );
    }

    #[test]
    fn test_captured_response_helpers() {
        let mut response = CapturedResponse::new(201, r#"{"id": "TT1"}"#);
        response
            .headers
            .push(("content-type".to_string(), "application/json".to_string()));

        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.json().expect("json")["id"], "TT1");
        assert!(CapturedResponse::new(500, "oops").json().is_err());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Port 9 (discard) is not expected to accept HTTP connections.
        let transport = HttpTransport::with_timeout("http://127.0.0.1:9", Duration::from_secs(2))
            .expect("valid base");
        let result = transport
            .send(PreparedRequest {
                method: Method::Get,
                path: "/".to_string(),
                headers: Vec::new(),
                body: None,
            })
            .await;
        assert!(matches!(result, Err(TransportError::Request(_))));
    }

    #[tokio::test]
    async fn test_invalid_header_is_not_a_url_error() {
        let transport = HttpTransport::with_timeout("http://127.0.0.1:9", Duration::from_secs(2))
            .expect("valid base");
        let result = transport
            .send(PreparedRequest {
                method: Method::Get,
                path: "/".to_string(),
                headers: vec![("X Trace".to_string(), "1".to_string())],
                body: None,
            })
            .await;
        assert!(matches!(result, Err(TransportError::InvalidRequest(_))));
    }
}
