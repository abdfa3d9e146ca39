//! Error category classification for unified error handling.
//!
//! Categories drive the engine's handling decisions: whether a failure is
//! retried, swallowed as "nothing found", or propagated immediately.

use std::fmt;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Throttling and connection failures before the retry budget is spent.
    /// Retried with backoff.
    Transient,

    /// 404 / 416 from the store. A valid "nothing found", never an error
    /// for the caller.
    EmptyResult,

    /// The server broke the protocol (e.g. a 429 without `retry-after-ms`).
    /// Fatal, never retried.
    Protocol,

    /// Any other non-2xx response, or retries exhausted.
    /// Propagated under fail-fast, logged otherwise.
    Terminal,

    /// Malformed secret, missing credential, invalid config file.
    /// Always fatal and immediate.
    Configuration,

    /// Inbound webhook failed token authentication.
    Unauthorized,
}

impl ErrorCategory {
    /// Returns true if errors in this category may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Transient)
    }

    /// Returns true if the failure must stop the caller regardless of the
    /// store's fail-fast setting.
    pub fn is_always_fatal(&self) -> bool {
        matches!(self, ErrorCategory::Protocol | ErrorCategory::Configuration)
    }

    /// Returns a short label for the category suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::EmptyResult => "empty_result",
            ErrorCategory::Protocol => "protocol",
            ErrorCategory::Terminal => "terminal",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Unauthorized => "unauthorized",
        }
    }

    /// Returns a human-readable description of the category.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "Temporary service or network issue",
            ErrorCategory::EmptyResult => "Nothing found",
            ErrorCategory::Protocol => "Unexpected response from the configuration store",
            ErrorCategory::Terminal => "Configuration store request failed",
            ErrorCategory::Configuration => "Configuration problem",
            ErrorCategory::Unauthorized => "Request was not authorized",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_retryable() {
        assert!(ErrorCategory::Transient.is_retryable());
        assert!(!ErrorCategory::EmptyResult.is_retryable());
        assert!(!ErrorCategory::Protocol.is_retryable());
        assert!(!ErrorCategory::Terminal.is_retryable());
        assert!(!ErrorCategory::Configuration.is_retryable());
        assert!(!ErrorCategory::Unauthorized.is_retryable());
    }

    #[test]
    fn test_category_always_fatal() {
        assert!(ErrorCategory::Protocol.is_always_fatal());
        assert!(ErrorCategory::Configuration.is_always_fatal());
        assert!(!ErrorCategory::Terminal.is_always_fatal());
        assert!(!ErrorCategory::Transient.is_always_fatal());
    }

    #[test]
    fn test_category_display() {
        assert_eq!(format!("{}", ErrorCategory::Transient), "transient");
        assert_eq!(format!("{}", ErrorCategory::EmptyResult), "empty_result");
        assert_eq!(format!("{}", ErrorCategory::Unauthorized), "unauthorized");
    }
}
