//! Errors raised while fetching settings from a remote store.

use thiserror::Error;

use super::category::ErrorCategory;
use super::config::ConfigError;

/// Fetch-specific error variants.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Throttled with a usable `retry-after-ms`, and the retry budget ran out.
    #[error("throttled by {endpoint} after {retries} retries")]
    Throttled { endpoint: String, retries: u32 },

    /// A retry response without a positive `retry-after-ms` header.
    #[error("status {status} from {endpoint} without a usable retry-after-ms header")]
    MissingRetryAfter { endpoint: String, status: u16 },

    /// Any other non-2xx status.
    #[error("unexpected status {status} from {endpoint}")]
    HttpStatus { endpoint: String, status: u16 },

    /// Connection failed or timed out.
    #[error("connection to {endpoint} failed: {message}")]
    Connection { endpoint: String, message: String },

    /// The response body could not be decoded.
    #[error("invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    /// Bearer token acquisition failed.
    #[error("could not acquire a token for store {store}: {message}")]
    Token { store: String, message: String },

    /// Request could not be built or authenticated.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl FetchError {
    /// Classify the error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            FetchError::Throttled { .. } | FetchError::Connection { .. } => {
                ErrorCategory::Transient
            }
            FetchError::MissingRetryAfter { .. } => ErrorCategory::Protocol,
            FetchError::HttpStatus { .. }
            | FetchError::InvalidResponse { .. }
            | FetchError::Token { .. } => ErrorCategory::Terminal,
            FetchError::Config(_) => ErrorCategory::Configuration,
        }
    }

    /// Check if this error is likely transient.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            FetchError::Throttled { .. } => "FETCH_THROTTLED",
            FetchError::MissingRetryAfter { .. } => "FETCH_NO_RETRY_AFTER",
            FetchError::HttpStatus { .. } => "FETCH_STATUS",
            FetchError::Connection { .. } => "FETCH_CONN",
            FetchError::InvalidResponse { .. } => "FETCH_BAD_BODY",
            FetchError::Token { .. } => "FETCH_TOKEN",
            FetchError::Config(err) => err.error_code(),
        }
    }
}
