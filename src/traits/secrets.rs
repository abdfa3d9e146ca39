//! Secret reference resolution.

use async_trait::async_trait;

/// Resolves a secret reference URI (e.g. a key vault secret URL) to its value.
///
/// Decryption and vault access are outside the engine; it only hands over
/// the URI found in the setting body.
#[async_trait]
pub trait SecretResolver: Send + Sync {
    async fn resolve(&self, uri: &str) -> Result<String, String>;
}
