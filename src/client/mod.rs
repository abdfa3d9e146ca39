//! Resilient, authenticated settings client.
//!
//! One implementation of retry, backoff and pagination behind
//! [`ConfigClient`]. A fetch:
//!
//! 1. builds the request URI from the selector,
//! 2. signs (or attaches a bearer token) and sends a GET,
//! 3. on 429, or any status carrying `retry-after-ms`, sleeps with capped
//!    exponential backoff and jitter until the retry budget is spent,
//! 4. on 404/416 returns [`FetchOutcome::Empty`],
//! 5. follows `Link: <...>; rel="next"` until there is no next page or the
//!    requested range is satisfied,
//! 6. restores label priority order when several labels were requested.

mod backoff;
pub mod correlation;
mod outcome;
pub mod uri;

pub use backoff::{backoff_slots, throttle_delay, RetryPolicy};
pub use outcome::FetchOutcome;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, warn};

use crate::auth::RequestSigner;
use crate::error::{ConfigError, FetchError};
use crate::models::{ApiPath, QuerySelector, Setting, SettingsPage, Store, StoreCredential};
use crate::traits::{ConfigClient, Headers, HttpClient, Response, TokenCredential};

pub const RETRY_AFTER_MS_HEADER: &str = "retry-after-ms";
pub const LINK_HEADER: &str = "link";
pub const RANGE_HEADER: &str = "Range";

/// Settings client with throttling recovery and a fail-fast deadline.
#[derive(Clone)]
pub struct ResilientHttpClient {
    http: Arc<dyn HttpClient>,
    policy: RetryPolicy,
    api_version: String,
    /// Start of the fail-fast grace period.
    process_started: Instant,
    token_credential: Option<Arc<dyn TokenCredential>>,
}

impl std::fmt::Debug for ResilientHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientHttpClient")
            .field("policy", &self.policy)
            .field("api_version", &self.api_version)
            .field("has_token_credential", &self.token_credential.is_some())
            .finish()
    }
}

impl ResilientHttpClient {
    pub fn new(http: Arc<dyn HttpClient>, policy: RetryPolicy, api_version: impl Into<String>) -> Self {
        Self {
            http,
            policy,
            api_version: api_version.into(),
            process_started: Instant::now(),
            token_credential: None,
        }
    }

    /// Token source for managed-identity stores.
    pub fn with_token_credential(mut self, credential: Arc<dyn TokenCredential>) -> Self {
        self.token_credential = Some(credential);
        self
    }

    /// Override the instant the fail-fast grace period is measured from.
    pub fn with_process_started(mut self, started: Instant) -> Self {
        self.process_started = started;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch all pages for a selector.
    pub async fn fetch_settings(
        &self,
        api: ApiPath,
        selector: &QuerySelector,
        store: &Store,
    ) -> FetchOutcome {
        let fetch_started = Instant::now();
        let mut url = uri::build_request_uri(&store.endpoint, api, selector, &self.api_version);
        let mut items: Vec<Setting> = Vec::new();

        loop {
            let response = match self.send(&url, api, selector, store, fetch_started).await {
                Ok(response) => response,
                Err(outcome) => return outcome,
            };

            if response.status == 404 || response.status == 416 {
                debug!(store = %store.name, status = response.status, "No settings found");
                if items.is_empty() {
                    return FetchOutcome::Empty;
                }
                break;
            }

            let page: SettingsPage = match response.json() {
                Ok(page) => page,
                Err(e) => {
                    error!(store = %store.name, "Unparsable settings page: {}", e);
                    return FetchOutcome::Fatal(FetchError::InvalidResponse {
                        endpoint: store.endpoint.clone(),
                        message: e.to_string(),
                    });
                }
            };
            items.extend(page.items.into_iter().map(|s| s.with_store(store.name.clone())));

            if let Some(range) = selector.range {
                if items.len() >= range.item_count() {
                    items.truncate(range.item_count());
                    break;
                }
            }

            match response
                .header_value(LINK_HEADER)
                .and_then(uri::parse_next_link)
            {
                Some(link) => {
                    url = uri::resolve_next_link(&store.endpoint, &link, &self.api_version);
                }
                None => break,
            }
        }

        if selector.has_multiple_labels() {
            sort_by_label_priority(&mut items, &selector.labels);
        }
        FetchOutcome::Items(items)
    }

    /// Send one page request, retrying transient failures.
    ///
    /// Returns the response for 2xx, 404 and 416; everything else ends as
    /// an `Err` outcome.
    async fn send(
        &self,
        url: &str,
        api: ApiPath,
        selector: &QuerySelector,
        store: &Store,
        fetch_started: Instant,
    ) -> Result<Response, FetchOutcome> {
        let mut retry_count: u32 = 0;

        loop {
            let headers = self
                .request_headers(url, api, selector, store)
                .await
                .map_err(|e| {
                    error!(store = %store.name, "Cannot authenticate request: {}", e);
                    FetchOutcome::Fatal(e)
                })?;

            debug!(store = %store.name, retry = retry_count, "GET {}", url);

            let response = match self.http.get(url, &headers).await {
                Ok(response) => response,
                Err(e) if e.is_transient() => {
                    if self.policy.exhausted(retry_count, fetch_started) {
                        let err = FetchError::Connection {
                            endpoint: store.endpoint.clone(),
                            message: e.to_string(),
                        };
                        self.hold_until_prekill(store).await;
                        return Err(FetchOutcome::Retryable(err));
                    }
                    let delay = self.policy.connection_delay(retry_count);
                    warn!(store = %store.name, "{}; retrying in {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                    continue;
                }
                Err(e) => {
                    error!(store = %store.name, "Request failed: {}", e);
                    self.hold_until_prekill(store).await;
                    return Err(FetchOutcome::Fatal(FetchError::Connection {
                        endpoint: store.endpoint.clone(),
                        message: e.to_string(),
                    }));
                }
            };

            if response.is_success() || response.status == 404 || response.status == 416 {
                return Ok(response);
            }

            let retry_after = response.header_value(RETRY_AFTER_MS_HEADER);
            if response.status == 429 || retry_after.is_some() {
                let retry_after_ms = match retry_after.and_then(|v| v.trim().parse::<i64>().ok()) {
                    Some(ms) if ms > 0 => ms as u64,
                    _ => {
                        error!(
                            store = %store.name,
                            status = response.status,
                            "Retry response without a usable {} header",
                            RETRY_AFTER_MS_HEADER
                        );
                        return Err(FetchOutcome::Fatal(FetchError::MissingRetryAfter {
                            endpoint: store.endpoint.clone(),
                            status: response.status,
                        }));
                    }
                };

                if self.policy.exhausted(retry_count, fetch_started) {
                    warn!(store = %store.name, retries = retry_count, "Throttling retries exhausted");
                    self.hold_until_prekill(store).await;
                    return Err(FetchOutcome::Retryable(FetchError::Throttled {
                        endpoint: store.endpoint.clone(),
                        retries: retry_count,
                    }));
                }

                let delay = throttle_delay(retry_after_ms, retry_count, &mut rand::thread_rng());
                debug!(
                    store = %store.name,
                    status = response.status,
                    retry = retry_count,
                    "Throttled; sleeping {:?}",
                    delay
                );
                tokio::time::sleep(delay).await;
                retry_count += 1;
                continue;
            }

            error!(store = %store.name, status = response.status, "Unexpected status from {}", url);
            self.hold_until_prekill(store).await;
            return Err(FetchOutcome::Fatal(FetchError::HttpStatus {
                endpoint: store.endpoint.clone(),
                status: response.status,
            }));
        }
    }

    /// Delay terminal failures of fail-fast stores until the prekill deadline.
    /// Stores without fail-fast skip the hold and report failures at once.
    async fn hold_until_prekill(&self, store: &Store) {
        if !store.fail_fast {
            return;
        }
        if let Some(remaining) = self.policy.prekill_remaining(self.process_started) {
            warn!(store = %store.name, "Delaying failure by {:?} before propagating", remaining);
            tokio::time::sleep(remaining).await;
        }
    }

    async fn request_headers(
        &self,
        url: &str,
        api: ApiPath,
        selector: &QuerySelector,
        store: &Store,
    ) -> Result<Headers, FetchError> {
        let mut headers = match &store.credential {
            StoreCredential::ConnectionSecret { id, secret } => {
                RequestSigner::new(id.clone(), secret)?.sign("GET", url, b"", Utc::now())?
            }
            StoreCredential::ManagedIdentity { client_id } => {
                let credential = self.token_credential.as_ref().ok_or_else(|| {
                    ConfigError::MissingTokenCredential {
                        store: store.name.clone(),
                    }
                })?;
                let token = credential
                    .token(client_id.as_deref())
                    .await
                    .map_err(|e| FetchError::Token {
                        store: store.name.clone(),
                        message: e.to_string(),
                    })?;
                let mut headers = Headers::new();
                headers.insert("Authorization".to_string(), format!("Bearer {}", token));
                headers.insert(
                    crate::auth::signer::CLIENT_REQUEST_ID_HEADER.to_string(),
                    uuid::Uuid::new_v4().to_string(),
                );
                headers
            }
        };

        correlation::apply_tracing_headers(&mut headers, api);
        if let Some(range) = selector.range {
            headers.insert(RANGE_HEADER.to_string(), range.to_string());
        }
        Ok(headers)
    }
}

#[async_trait]
impl ConfigClient for ResilientHttpClient {
    async fn fetch(&self, api: ApiPath, selector: &QuerySelector, store: &Store) -> FetchOutcome {
        self.fetch_settings(api, selector, store).await
    }
}

/// Stable sort by the position of each item's label in `labels`.
/// Unknown labels go last; ties keep server order.
pub fn sort_by_label_priority(items: &mut [Setting], labels: &[Option<String>]) {
    items.sort_by_key(|item| {
        labels
            .iter()
            .position(|label| label.as_deref() == item.label.as_deref())
            .unwrap_or(usize::MAX)
    });
}
