//! Token credential trait abstraction.
//!
//! Managed-identity stores authenticate with bearer tokens. Acquiring those
//! tokens is an external concern; the engine only asks for one per request.

use async_trait::async_trait;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CredentialsError {
    /// The identity endpoint refused or failed the request.
    #[error("Failed to acquire token: {0}")]
    AcquisitionFailed(String),
    #[error("No managed identity available")]
    Unavailable,
    #[error("Credentials error: {0}")]
    Other(String),
}

/// Supplies bearer tokens for managed-identity stores.
///
/// # Example
///
/// ```ignore
/// use appconfig_sync::traits::TokenCredential;
///
/// async fn bearer<C: TokenCredential>(cred: &C) -> Result<String, CredentialsError> {
///     Ok(format!("Bearer {}", cred.token(None).await?))
/// }
/// ```
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Get an access token for the store, optionally for a specific
    /// user-assigned identity.
    async fn token(&self, client_id: Option<&str>) -> Result<String, CredentialsError>;
}
