//! Mock HTTP client for testing.
//!
//! Responses are queued per URL pattern. Each request pops the front of the
//! matching queue; the last queued response is sticky, so a single
//! `set_response` answers every request.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::traits::{Headers, HttpClient, HttpError, Response};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method
    pub method: String,
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a response (any status)
    Success(Response),
    /// Return a transport error
    Error(HttpError),
}

/// Mock HTTP client for testing.
///
/// # Example
///
/// ```ignore
/// use appconfig_sync::adapters::mock::{MockHttpClient, MockResponse};
/// use appconfig_sync::traits::Response;
/// use bytes::Bytes;
///
/// let client = MockHttpClient::new();
///
/// // Throttle once, then succeed
/// client.push_response(
///     "https://demo.azconfig.io/kv",
///     MockResponse::Success(Response::new(429, Bytes::new()).header("retry-after-ms", "10")),
/// );
/// client.push_response(
///     "https://demo.azconfig.io/kv",
///     MockResponse::Success(Response::new(200, Bytes::from(r#"{"items":[]}"#))),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MockHttpClient {
    /// Queued responses by URL pattern
    responses: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    /// Default response when no pattern matches
    default_response: Arc<Mutex<Option<MockResponse>>>,
    /// Recorded requests for verification
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            default_response: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Replace the queue for a URL pattern with a single sticky response.
    ///
    /// Patterns match exactly or as a URL prefix; the longest matching
    /// pattern wins.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(url.to_string(), VecDeque::from([response]));
    }

    /// Append a response to the queue for a URL pattern.
    pub fn push_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses.entry(url.to_string()).or_default().push_back(response);
    }

    /// Set a default response for URLs without specific matches.
    pub fn set_default_response(&self, response: MockResponse) {
        let mut default = self.default_response.lock().unwrap();
        *default = Some(response);
    }

    /// Get all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests whose URL starts with `prefix`.
    pub fn request_count(&self, prefix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.starts_with(prefix))
            .count()
    }

    /// Clear all recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn record_request(&self, method: &str, url: &str, headers: &Headers) {
        let mut requests = self.requests.lock().unwrap();
        requests.push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
        });
    }

    /// Pop the response for a URL.
    fn next_response(&self, url: &str) -> Option<MockResponse> {
        let mut responses = self.responses.lock().unwrap();

        let pattern = responses
            .keys()
            .filter(|pattern| url == pattern.as_str() || url.starts_with(pattern.as_str()))
            .max_by_key(|pattern| pattern.len())
            .cloned();

        if let Some(queue) = pattern.and_then(|p| responses.get_mut(&p)) {
            let response = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            if response.is_some() {
                return response;
            }
        }

        let default = self.default_response.lock().unwrap();
        default.clone()
    }
}

impl Default for MockHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("GET", url, headers);

        match self.next_response(url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) => Err(err),
            None => Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_mock_http_client_new() {
        let client = MockHttpClient::new();
        assert!(client.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_get_with_response() {
        let client = MockHttpClient::new();
        client.set_response(
            "https://example.com/test",
            MockResponse::Success(Response::new(200, Bytes::from("Hello"))),
        );

        let response = client
            .get("https://example.com/test", &Headers::new())
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, Bytes::from("Hello"));

        let requests = client.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].url, "https://example.com/test");
    }

    #[tokio::test]
    async fn test_queue_pops_then_sticks() {
        let client = MockHttpClient::new();
        client.push_response(
            "https://example.com/kv",
            MockResponse::Success(Response::new(429, Bytes::new())),
        );
        client.push_response(
            "https://example.com/kv",
            MockResponse::Success(Response::new(200, Bytes::new())),
        );

        let url = "https://example.com/kv?key=a";
        let statuses = [
            client.get(url, &Headers::new()).await.unwrap().status,
            client.get(url, &Headers::new()).await.unwrap().status,
            client.get(url, &Headers::new()).await.unwrap().status,
        ];
        assert_eq!(statuses, [429, 200, 200]);
        assert_eq!(client.request_count("https://example.com/kv"), 3);
    }

    #[tokio::test]
    async fn test_longest_prefix_wins() {
        let client = MockHttpClient::new();
        client.set_response(
            "https://example.com/",
            MockResponse::Success(Response::new(404, Bytes::new())),
        );
        client.set_response(
            "https://example.com/kv",
            MockResponse::Success(Response::new(200, Bytes::new())),
        );

        let response = client
            .get("https://example.com/kv?x=1", &Headers::new())
            .await
            .unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_get_with_error() {
        let client = MockHttpClient::new();
        client.set_response(
            "https://example.com/error",
            MockResponse::Error(HttpError::Timeout("30s".to_string())),
        );

        let result = client.get("https://example.com/error", &Headers::new()).await;
        assert!(matches!(result, Err(HttpError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_no_mock_response() {
        let client = MockHttpClient::new();
        let result = client.get("https://unknown.com", &Headers::new()).await;
        assert!(matches!(result, Err(HttpError::Other(_))));
    }

    #[tokio::test]
    async fn test_default_response() {
        let client = MockHttpClient::new();
        client.set_default_response(MockResponse::Success(Response::new(
            200,
            Bytes::from("Default"),
        )));

        let response = client
            .get("https://any-url.com", &Headers::new())
            .await
            .unwrap();
        assert_eq!(response.body, Bytes::from("Default"));
    }
}
