//! Configuration errors.
//!
//! Everything here is fatal and immediate: a malformed secret or a missing
//! credential will not fix itself on retry.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating engine configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Shared secret is not valid base64.
    #[error("secret for credential '{credential}' is not valid base64")]
    MalformedSecret { credential: String },

    /// Connection string did not match `Endpoint=...;Id=...;Secret=...`.
    #[error("invalid connection string: {reason}")]
    InvalidConnectionString { reason: String },

    /// A store was configured without any credential.
    #[error("store '{store}' has no credential configured")]
    MissingCredential { store: String },

    /// A store was configured with both a connection string and a managed identity.
    #[error("store '{store}' configures both a connection string and a managed identity")]
    ConflictingCredentials { store: String },

    /// A managed-identity store was used without a token provider.
    #[error("store '{store}' uses managed identity but no token credential is available")]
    MissingTokenCredential { store: String },

    /// Config file could not be read.
    #[error("failed to read config file {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    /// Config file is not valid JSON for the expected schema.
    #[error("failed to parse config file: {message}")]
    Parse { message: String },

    /// Platform config directory could not be determined.
    #[error("could not determine the user config directory")]
    NoConfigDir,

    /// A field failed validation.
    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::Invalid`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::MalformedSecret { .. } => "CFG_SECRET",
            ConfigError::InvalidConnectionString { .. } => "CFG_CONN_STR",
            ConfigError::MissingCredential { .. } => "CFG_NO_CRED",
            ConfigError::ConflictingCredentials { .. } => "CFG_CRED_CONFLICT",
            ConfigError::MissingTokenCredential { .. } => "CFG_NO_TOKEN",
            ConfigError::Read { .. } => "CFG_READ",
            ConfigError::Parse { .. } => "CFG_PARSE",
            ConfigError::NoConfigDir => "CFG_NO_DIR",
            ConfigError::Invalid { .. } => "CFG_INVALID",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_never_includes_secret_value() {
        let err = ConfigError::MalformedSecret {
            credential: "id-1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "secret for credential 'id-1' is not valid base64"
        );
    }

    #[test]
    fn test_invalid_helper() {
        let err = ConfigError::invalid("stores[0].label", "must not contain '*'");
        assert_eq!(
            err.to_string(),
            "invalid value for 'stores[0].label': must not contain '*'"
        );
        assert_eq!(err.error_code(), "CFG_INVALID");
    }

    #[test]
    fn test_read_error_shows_path() {
        let err = ConfigError::Read {
            path: PathBuf::from("/tmp/config.json"),
            message: "No such file".to_string(),
        };
        assert!(err.to_string().contains("/tmp/config.json"));
    }
}
