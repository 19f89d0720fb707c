//! In-memory transport for runner tests.
//!
//! Routes match on method and the rendered path (query string included).
//! Each route holds a FIFO of responses; the last one is replayed once the
//! queue is down to a single entry. Requests to unknown routes get a 404 with
//! a JSON error body, unless a fallback response is set.

use api_chain_core::{Method, PreparedRequest};
use api_chain_runtime::{CapturedResponse, Transport, TransportError, TransportFuture};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

/// Build a JSON response with a `content-type` header.
#[must_use]
pub fn json_response(status: u16, body: &Value) -> CapturedResponse {
    let mut response = CapturedResponse::new(status, body.to_string());
    response
        .headers
        .push(("content-type".to_string(), "application/json".to_string()));
    response
}

#[derive(Debug, Default)]
struct MockState {
    routes: HashMap<(Method, String), VecDeque<Result<CapturedResponse, TransportError>>>,
    fallback: Option<CapturedResponse>,
    requests: Vec<PreparedRequest>,
}

/// Transport that replays canned responses and records every request.
///
/// # Example
///
/// ```
/// use api_chain_core::{Method, PreparedRequest};
/// use api_chain_runtime::Transport;
/// use api_chain_testing::{MockTransport, json_response};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let transport = MockTransport::new()
///     .with_response(Method::Get, "/tickets", json_response(200, &json!({"data": []})));
///
/// let response = transport
///     .send(PreparedRequest {
///         method: Method::Get,
///         path: "/tickets".to_string(),
///         headers: Vec::new(),
///         body: None,
///     })
///     .await
///     .expect("mock never fails unless told to");
/// assert_eq!(response.status, 200);
/// assert_eq!(transport.requests().len(), 1);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    /// Transport with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `method path`.
    #[must_use]
    pub fn with_response(self, method: Method, path: impl Into<String>, response: CapturedResponse) -> Self {
        self.push(method, path, Ok(response));
        self
    }

    /// Queue a transport error for `method path`.
    #[must_use]
    pub fn with_error(self, method: Method, path: impl Into<String>, error: TransportError) -> Self {
        self.push(method, path, Err(error));
        self
    }

    /// Response for any request that matches no route.
    #[must_use]
    pub fn with_fallback(self, response: CapturedResponse) -> Self {
        self.lock().fallback = Some(response);
        self
    }

    /// Queue a response on a shared transport.
    pub fn push_response(&self, method: Method, path: impl Into<String>, response: CapturedResponse) {
        self.push(method, path, Ok(response));
    }

    /// Requests received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<PreparedRequest> {
        self.lock().requests.clone()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<PreparedRequest> {
        self.lock().requests.last().cloned()
    }

    fn push(
        &self,
        method: Method,
        path: impl Into<String>,
        response: Result<CapturedResponse, TransportError>,
    ) {
        self.lock()
            .routes
            .entry((method, path.into()))
            .or_default()
            .push_back(response);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn respond(&self, request: PreparedRequest) -> Result<CapturedResponse, TransportError> {
        let mut state = self.lock();
        let key = (request.method, request.path.clone());
        state.requests.push(request);

        if let Some(queue) = state.routes.get_mut(&key) {
            let next = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            if let Some(response) = next {
                return response;
            }
        }

        if let Some(fallback) = &state.fallback {
            return Ok(fallback.clone());
        }

        tracing::debug!(method = %key.0, path = %key.1, "No mock route");
        Ok(json_response(
            404,
            &json!({"error": format!("no mock route for {} {}", key.0, key.1)}),
        ))
    }
}

impl Transport for MockTransport {
    fn send(&self, request: PreparedRequest) -> TransportFuture<'_> {
        let response = self.respond(request);
        Box::pin(async move { response })
    }

    fn url_for(&self, path: &str) -> String {
        format!("mock://{path}")
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    fn get(path: &str) -> PreparedRequest {
        PreparedRequest {
            method: Method::Get,
            path: path.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn test_fifo_then_replay_last() {
        let transport = MockTransport::new()
            .with_response(Method::Get, "/a", CapturedResponse::new(500, ""))
            .with_response(Method::Get, "/a", CapturedResponse::new(200, ""));

        let statuses = [
            transport.send(get("/a")).await.expect("first").status,
            transport.send(get("/a")).await.expect("second").status,
            transport.send(get("/a")).await.expect("third").status,
        ];
        assert_eq!(statuses, [500, 200, 200]);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let transport = MockTransport::new();
        let response = transport.send(get("/missing")).await.expect("404 response");
        assert_eq!(response.status, 404);
        assert_eq!(transport.last_request().map(|r| r.path), Some("/missing".to_string()));
    }

    #[tokio::test]
    async fn test_queued_error() {
        let transport = MockTransport::new().with_error(
            Method::Get,
            "/down",
            TransportError::Request("connection refused".to_string()),
        );
        assert!(transport.send(get("/down")).await.is_err());
    }
}
