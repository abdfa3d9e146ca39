//! Result type alias for engine operations.

use super::context::ErrorContext;
use super::sync_error::SyncError;

/// Type alias for Results using SyncError.
pub type SyncResult<T> = Result<T, SyncError>;

/// Extension trait for Result types to add context to errors.
pub trait ResultExt<T> {
    /// Add context to an error if the result is Err.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use appconfig_sync::error::{ErrorContext, ResultExt};
    ///
    /// let settings = client
    ///     .fetch(ApiPath::Kv, &selector, &store)
    ///     .await
    ///     .into_result()
    ///     .context(ErrorContext::new("load_store").with_store(&store.name));
    /// ```
    fn context(self, ctx: ErrorContext) -> SyncResult<T>;

    /// Add context using a closure (only called on error).
    fn with_context<F>(self, f: F) -> SyncResult<T>
    where
        F: FnOnce() -> ErrorContext;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<SyncError>,
{
    fn context(self, ctx: ErrorContext) -> SyncResult<T> {
        self.map_err(|e| e.into().with_context(ctx))
    }

    fn with_context<F>(self, f: F) -> SyncResult<T>
    where
        F: FnOnce() -> ErrorContext,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, FetchError};

    #[test]
    fn test_context_on_sync_result() {
        let result: SyncResult<()> = Err(ConfigError::NoConfigDir.into());
        let err = result
            .context(ErrorContext::new("load_config"))
            .unwrap_err();
        assert_eq!(err.context().unwrap().operation, "load_config");
    }

    #[test]
    fn test_with_context_on_domain_error() {
        let result: Result<(), FetchError> = Err(FetchError::HttpStatus {
            endpoint: "https://demo.azconfig.io".to_string(),
            status: 500,
        });
        let err = result
            .with_context(|| ErrorContext::new("refresh").with_store("demo"))
            .unwrap_err();
        assert_eq!(err.context().unwrap().store.as_deref(), Some("demo"));
        assert_eq!(err.error_code(), "FETCH_STATUS");
    }

    #[test]
    fn test_ok_passes_through() {
        let result: Result<u32, ConfigError> = Ok(7);
        assert_eq!(result.context(ErrorContext::new("x")).unwrap(), 7);
    }
}
