//! Static secret resolver for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::traits::SecretResolver;

/// Resolves secret URIs from a fixed map. Unknown URIs fail.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretResolver {
    secrets: Arc<Mutex<HashMap<String, String>>>,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl StaticSecretResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(self, uri: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.lock().unwrap().insert(uri.into(), value.into());
        self
    }

    /// URIs looked up so far.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecretResolver for StaticSecretResolver {
    async fn resolve(&self, uri: &str) -> Result<String, String> {
        self.lookups.lock().unwrap().push(uri.to_string());
        self.secrets
            .lock()
            .unwrap()
            .get(uri)
            .cloned()
            .ok_or_else(|| format!("secret not found: {}", uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_known_and_unknown() {
        let resolver = StaticSecretResolver::new()
            .with_secret("https://vault.example/secrets/db", "s3cret");

        assert_eq!(
            resolver.resolve("https://vault.example/secrets/db").await.unwrap(),
            "s3cret"
        );
        assert!(resolver.resolve("https://vault.example/secrets/x").await.is_err());
        assert_eq!(resolver.lookups().len(), 2);
    }
}
