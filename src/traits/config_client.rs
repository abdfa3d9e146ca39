//! The single seam through which settings are read from a store.

use async_trait::async_trait;

use crate::client::FetchOutcome;
use crate::models::{ApiPath, QuerySelector, Store};

/// Reads settings from a remote store.
///
/// There is one implementation for production (the resilient HTTP client)
/// and a scripted one for tests. Callers vary only the selector and the API
/// path; retry, backoff and pagination live behind this trait.
#[async_trait]
pub trait ConfigClient: Send + Sync {
    async fn fetch(&self, api: ApiPath, selector: &QuerySelector, store: &Store) -> FetchOutcome;
}
