//! Unified error handling for the synchronization engine.
//!
//! - **Error Categories**: classification that drives retry/propagation decisions
//! - **Domain-specific Errors**: config, fetch and webhook errors
//! - **Unified Error Type**: `SyncError` consolidates all error types
//! - **Error Context**: operation/store/namespace attached to errors
//! - **Result Type Alias**: `SyncResult<T>`
//!
//! # Error Categories
//!
//! | Category | Examples | Handling |
//! |----------|----------|----------|
//! | Transient | 429, connection refused | Retried with backoff |
//! | EmptyResult | 404, 416 | Treated as "nothing found" |
//! | Protocol | 429 without `retry-after-ms` | Fatal |
//! | Terminal | other non-2xx, retries exhausted | Fail-fast propagates, otherwise logged |
//! | Configuration | malformed secret, missing credential | Fatal |
//! | Unauthorized | webhook token mismatch | 401 response |

mod category;
mod config;
mod context;
mod fetch;
mod result;
mod sync_error;
mod webhook;

pub use category::ErrorCategory;
pub use config::ConfigError;
pub use context::ErrorContext;
pub use fetch::FetchError;
pub use result::{ResultExt, SyncResult};
pub use sync_error::SyncError;
pub use webhook::WebhookError;

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn test_error_unification() {
        let errors: Vec<SyncError> = vec![
            ConfigError::MalformedSecret {
                credential: "id".to_string(),
            }
            .into(),
            FetchError::HttpStatus {
                endpoint: "https://demo.azconfig.io".to_string(),
                status: 500,
            }
            .into(),
            WebhookError::Unauthorized.into(),
        ];

        for err in &errors {
            assert!(!err.error_code().is_empty());
            assert!(!err.to_string().is_empty());
            assert!(!err.is_retryable(), "Expected {:?} to not be retryable", err);
        }
    }
}
