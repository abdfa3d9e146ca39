//! Unified error type for the synchronization engine.

use std::fmt;

use super::category::ErrorCategory;
use super::config::ConfigError;
use super::context::ErrorContext;
use super::fetch::FetchError;
use super::webhook::WebhookError;

/// Unified error type for the synchronization engine.
#[derive(Debug)]
pub enum SyncError {
    /// Invalid or incomplete configuration.
    Config(ConfigError),

    /// Remote fetch failed.
    Fetch(FetchError),

    /// Inbound webhook rejected.
    Webhook(WebhookError),

    /// A secret reference could not be resolved.
    SecretResolution { uri: String, message: String },

    /// A feature flag setting could not be interpreted.
    InvalidFeatureFlag { key: String, message: String },

    /// Wrapped error with additional context.
    WithContext {
        error: Box<SyncError>,
        context: ErrorContext,
    },
}

impl SyncError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::Config(_) => ErrorCategory::Configuration,
            SyncError::Fetch(err) => err.category(),
            SyncError::Webhook(WebhookError::Unauthorized) => ErrorCategory::Unauthorized,
            SyncError::Webhook(_) => ErrorCategory::Protocol,
            SyncError::SecretResolution { .. } | SyncError::InvalidFeatureFlag { .. } => {
                ErrorCategory::Terminal
            }
            SyncError::WithContext { error, .. } => error.category(),
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            SyncError::Config(err) => err.error_code(),
            SyncError::Fetch(err) => err.error_code(),
            SyncError::Webhook(_) => "WEBHOOK",
            SyncError::SecretResolution { .. } => "SECRET_RESOLUTION",
            SyncError::InvalidFeatureFlag { .. } => "FEATURE_FLAG",
            SyncError::WithContext { error, .. } => error.error_code(),
        }
    }

    /// Attach context to this error.
    pub fn with_context(self, ctx: ErrorContext) -> Self {
        SyncError::WithContext {
            error: Box::new(self),
            context: ctx,
        }
    }

    /// Get the context if this error has one attached.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            SyncError::WithContext { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Get the innermost error, skipping context wrappers.
    pub fn root(&self) -> &SyncError {
        match self {
            SyncError::WithContext { error, .. } => error.root(),
            other => other,
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Config(err) => write!(f, "{}", err),
            SyncError::Fetch(err) => write!(f, "{}", err),
            SyncError::Webhook(err) => write!(f, "{}", err),
            SyncError::SecretResolution { uri, message } => {
                write!(f, "failed to resolve secret reference {}: {}", uri, message)
            }
            SyncError::InvalidFeatureFlag { key, message } => {
                write!(f, "invalid feature flag {}: {}", key, message)
            }
            SyncError::WithContext { error, context } => {
                write!(f, "{} [{}]", error, context.to_log_string())
            }
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Config(err) => Some(err),
            SyncError::Fetch(err) => Some(err),
            SyncError::Webhook(err) => Some(err),
            SyncError::WithContext { error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }
}

impl From<ConfigError> for SyncError {
    fn from(err: ConfigError) -> Self {
        SyncError::Config(err)
    }
}

impl From<FetchError> for SyncError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Config(inner) => SyncError::Config(inner),
            other => SyncError::Fetch(other),
        }
    }
}

impl From<WebhookError> for SyncError {
    fn from(err: WebhookError) -> Self {
        SyncError::Webhook(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_error_unwraps() {
        let err: SyncError = FetchError::Config(ConfigError::NoConfigDir).into();
        assert!(matches!(err, SyncError::Config(ConfigError::NoConfigDir)));
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_context_preserves_category() {
        let err: SyncError = FetchError::Connection {
            endpoint: "https://demo.azconfig.io".to_string(),
            message: "refused".to_string(),
        }
        .into();
        let wrapped = err.with_context(ErrorContext::new("poll").with_store("demo"));

        assert!(wrapped.is_retryable());
        assert_eq!(wrapped.context().map(|c| c.operation.as_str()), Some("poll"));
        assert!(matches!(wrapped.root(), SyncError::Fetch(_)));
        assert!(wrapped.to_string().contains("store=demo"));
    }

    #[test]
    fn test_webhook_categories() {
        let unauthorized: SyncError = WebhookError::Unauthorized.into();
        assert_eq!(unauthorized.category(), ErrorCategory::Unauthorized);

        let bad_body: SyncError = WebhookError::MissingTopic.into();
        assert_eq!(bad_body.category(), ErrorCategory::Protocol);
    }
}
