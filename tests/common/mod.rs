//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use appconfig_sync::adapters::ReqwestHttpClient;
use appconfig_sync::client::{ResilientHttpClient, RetryPolicy};
use appconfig_sync::models::{Setting, Store, StoreCredential};
use serde_json::{json, Value};

/// Base64 of `secret`.
pub const TEST_SECRET: &str = "c2VjcmV0";
pub const TEST_CREDENTIAL_ID: &str = "id-1";

/// Store authenticated by a connection secret pointing at `endpoint`.
pub fn signed_store(name: &str, endpoint: &str) -> Store {
    Store::new(
        name,
        endpoint,
        StoreCredential::ConnectionSecret {
            id: TEST_CREDENTIAL_ID.to_string(),
            secret: TEST_SECRET.to_string(),
        },
    )
}

/// Retry policy with short windows so failing tests end quickly.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        max_retry_time: Duration::from_secs(5),
        prekill_time: Duration::ZERO,
        connection_backoff_base: Duration::from_millis(10),
        connection_backoff_max: Duration::from_millis(50),
    }
}

pub fn test_client() -> ResilientHttpClient {
    ResilientHttpClient::new(
        Arc::new(ReqwestHttpClient::with_timeout(Duration::from_secs(5)).unwrap()),
        fast_policy(),
        "1.0",
    )
}

/// A `/kv` response page body.
pub fn page(items: &[(&str, &str, &str)]) -> Value {
    let items: Vec<Value> = items
        .iter()
        .map(|(key, value, etag)| json!({ "key": key, "value": value, "etag": etag }))
        .collect();
    json!({ "items": items })
}

pub fn setting(key: &str, value: &str, etag: &str) -> Setting {
    Setting::new(key, value).with_etag(etag)
}
