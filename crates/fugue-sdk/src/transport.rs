//! Transport layer for RPC communication
//!
//! The live and archive surfaces share one base URL; `HttpTransport`
//! normalizes accidental `/live/v1` or `/query/v1` suffixes so either form
//! of the configured URL works. `MockTransport` scripts responses per route
//! for tests and records every request it sees.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::retry::Backoff;
use crate::SdkError;

/// An RPC request: method, path relative to the base URL, optional JSON body.
#[derive(Debug, Clone)]
pub struct RpcRequest {
    /// HTTP method
    pub method: &'static str,
    /// Path, e.g. `/live/v1/tick-info`
    pub path: String,
    /// JSON body for POST requests
    pub body: Option<Value>,
}

impl RpcRequest {
    /// A GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: "GET",
            path: path.into(),
            body: None,
        }
    }

    /// A POST request with a JSON body
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: "POST",
            path: path.into(),
            body: Some(body),
        }
    }
}

/// Raw response from a transport.
///
/// Transports report every completed HTTP exchange as `Ok`, including non-2xx
/// statuses; the client layer decides which statuses are errors so that
/// distinguished signals (the archive's 404) survive.
#[derive(Debug, Clone)]
pub struct RpcResponse {
    /// Full URL the request was sent to
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// HTTP status text
    pub status_text: String,
    /// Response body as text
    pub body: String,
}

impl RpcResponse {
    /// True for 2xx statuses
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport trait for RPC communication (object-safe)
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request and return the raw response.
    async fn execute(&self, request: RpcRequest) -> Result<RpcResponse, SdkError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn execute(&self, request: RpcRequest) -> Result<RpcResponse, SdkError> {
        (**self).execute(request).await
    }
}

/// Strip a trailing slash and any accidental surface suffix from a base URL.
pub(crate) fn normalize_base_url(url: &str) -> String {
    let mut base = url.trim_end_matches('/').to_string();
    for suffix in ["/live/v1", "/query/v1"] {
        if let Some(stripped) = base.strip_suffix(suffix) {
            base = stripped.to_string();
            break;
        }
    }
    base
}

// ==================== HTTP transport ====================

/// HTTP transport over reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    retry: Backoff,
}

impl HttpTransport {
    /// Create a transport for the given base URL.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a transport with a custom reqwest client (timeouts, proxies).
    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: normalize_base_url(base_url),
            retry: Backoff::new(Duration::from_millis(250), Duration::from_secs(2), 2),
        }
    }

    /// Replace the connection-error retry schedule. `Backoff::none()`
    /// disables retries.
    pub fn with_retry(mut self, retry: Backoff) -> Self {
        self.retry = retry;
        self
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_once(&self, request: &RpcRequest, url: &str) -> Result<RpcResponse, reqwest::Error> {
        let builder = match request.method {
            "POST" => {
                let mut b = self.client.post(url);
                if let Some(body) = &request.body {
                    b = b.json(body);
                }
                b
            }
            _ => self.client.get(url),
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(RpcResponse {
            url: url.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: RpcRequest) -> Result<RpcResponse, SdkError> {
        let url = format!("{}{}", self.base_url, request.path);

        // Connection-level failures (refused, reset, DNS) are retried with
        // backoff; completed HTTP exchanges are returned as-is regardless of
        // status.
        let mut backoff = self.retry.clone();
        loop {
            match self.send_once(&request, &url).await {
                Ok(response) => return Ok(response),
                Err(e) => match backoff.next_delay() {
                    Some(delay) if e.is_connect() || e.is_timeout() => {
                        tracing::debug!(%url, error = %e, ?delay, "transport error, retrying");
                        tokio::time::sleep(delay).await;
                    }
                    _ => {
                        return Err(SdkError::RpcRequestFailed {
                            url,
                            method: request.method.to_string(),
                            status: 0,
                            status_text: String::new(),
                            body: e.to_string(),
                        });
                    }
                },
            }
        }
    }
}

// ==================== Mock transport ====================

/// One scripted mock response
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl MockResponse {
    /// A 200 response with a JSON body
    pub fn json(value: Value) -> Self {
        Self {
            status: 200,
            body: value.to_string(),
        }
    }

    /// A response with an explicit status
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Mock transport for testing.
///
/// Responses are scripted per path as FIFO sequences; when a sequence is
/// down to its last response, that response repeats so poll loops can run
/// past the scripted prefix. All requests are recorded for assertions.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<MockResponse>>>,
    requests: Mutex<Vec<RpcRequest>>,
}

impl MockTransport {
    /// Create an empty mock transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the (sticky) response for a path, replacing any prior script.
    pub fn set_json(&self, path: &str, value: Value) {
        let mut routes = self.routes.lock();
        routes.insert(path.to_string(), VecDeque::from([MockResponse::json(value)]));
    }

    /// Set a non-200 (sticky) response for a path.
    pub fn set_status(&self, path: &str, status: u16, body: impl Into<String>) {
        let mut routes = self.routes.lock();
        routes.insert(
            path.to_string(),
            VecDeque::from([MockResponse::status(status, body)]),
        );
    }

    /// Append a response to a path's script.
    pub fn push_response(&self, path: &str, response: MockResponse) {
        self.routes
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    /// All requests seen so far.
    pub fn requests(&self) -> Vec<RpcRequest> {
        self.requests.lock().clone()
    }

    /// Requests seen for one path.
    pub fn requests_for(&self, path: &str) -> Vec<RpcRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: RpcRequest) -> Result<RpcResponse, SdkError> {
        self.requests.lock().push(request.clone());

        let response = {
            let mut routes = self.routes.lock();
            match routes.get_mut(&request.path) {
                Some(script) if script.len() > 1 => script.pop_front(),
                Some(script) => script.front().cloned(),
                None => None,
            }
        };

        match response {
            Some(r) => Ok(RpcResponse {
                url: request.path.clone(),
                status: r.status,
                status_text: String::new(),
                body: r.body,
            }),
            None => Ok(RpcResponse {
                url: request.path.clone(),
                status: 404,
                status_text: "Not Found".to_string(),
                body: format!("no mock response for {}", request.path),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("https://rpc.example.org"), "https://rpc.example.org");
        assert_eq!(normalize_base_url("https://rpc.example.org/"), "https://rpc.example.org");
        assert_eq!(
            normalize_base_url("https://rpc.example.org/live/v1"),
            "https://rpc.example.org"
        );
        assert_eq!(
            normalize_base_url("https://rpc.example.org/query/v1/"),
            "https://rpc.example.org"
        );
    }

    #[tokio::test]
    async fn test_mock_sequence_then_sticky() {
        let mock = MockTransport::new();
        mock.push_response("/x", MockResponse::json(json!(1)));
        mock.push_response("/x", MockResponse::json(json!(2)));

        let a = mock.execute(RpcRequest::get("/x")).await.unwrap();
        let b = mock.execute(RpcRequest::get("/x")).await.unwrap();
        let c = mock.execute(RpcRequest::get("/x")).await.unwrap();
        assert_eq!(a.body, "1");
        assert_eq!(b.body, "2");
        assert_eq!(c.body, "2"); // last response repeats
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let mock = MockTransport::new();
        mock.set_json("/a", json!({}));
        mock.execute(RpcRequest::get("/a")).await.unwrap();
        mock.execute(RpcRequest::post("/b", json!({"k": 1}))).await.unwrap();

        assert_eq!(mock.requests().len(), 2);
        assert_eq!(mock.requests_for("/b").len(), 1);
        assert_eq!(mock.requests_for("/b")[0].method, "POST");
    }

    #[tokio::test]
    async fn test_mock_unknown_route_is_404() {
        let mock = MockTransport::new();
        let response = mock.execute(RpcRequest::get("/missing")).await.unwrap();
        assert_eq!(response.status, 404);
    }
}
