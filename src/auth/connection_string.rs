//! Store connection strings: `Endpoint=https://<host>;Id=<id>;Secret=<secret>`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConfigError;

static CONN_STRING_REGEX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^Endpoint=https://([^;]+);Id=([^;]+);Secret=([^;]+)$").ok());

/// Parsed connection string.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    /// `https://<host>`, no trailing slash.
    pub endpoint: String,
    pub id: String,
    pub secret: String,
}

impl std::fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionString")
            .field("endpoint", &self.endpoint)
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let regex = CONN_STRING_REGEX
            .as_ref()
            .ok_or_else(|| ConfigError::InvalidConnectionString {
                reason: "pattern failed to compile".to_string(),
            })?;

        let captures = regex.captures(raw.trim()).ok_or_else(|| {
            ConfigError::InvalidConnectionString {
                reason: "expected Endpoint=https://<host>;Id=<id>;Secret=<secret>".to_string(),
            }
        })?;

        let host = captures[1].trim_end_matches('/');
        if host.is_empty() {
            return Err(ConfigError::InvalidConnectionString {
                reason: "endpoint host is empty".to_string(),
            });
        }

        Ok(Self {
            endpoint: format!("https://{}", host),
            id: captures[2].to_string(),
            secret: captures[3].to_string(),
        })
    }

    /// First DNS label of the endpoint host, used as the default store name.
    pub fn store_name(&self) -> &str {
        store_name_from_endpoint(&self.endpoint)
    }
}

/// `https://demo.azconfig.io` -> `demo`.
pub fn store_name_from_endpoint(endpoint: &str) -> &str {
    let host = endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .unwrap_or(endpoint);
    host.split(['.', ':', '/']).next().unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let conn = ConnectionString::parse(
            "Endpoint=https://demo.azconfig.io;Id=0-l0-s0:abc;Secret=c2VjcmV0",
        )
        .unwrap();
        assert_eq!(conn.endpoint, "https://demo.azconfig.io");
        assert_eq!(conn.id, "0-l0-s0:abc");
        assert_eq!(conn.secret, "c2VjcmV0");
        assert_eq!(conn.store_name(), "demo");
    }

    #[test]
    fn test_parse_rejects_missing_parts() {
        for raw in [
            "",
            "Endpoint=https://demo.azconfig.io;Id=abc",
            "Endpoint=http://demo.azconfig.io;Id=abc;Secret=x",
            "Id=abc;Secret=x",
            "Endpoint=https://demo.azconfig.io;Id=;Secret=x",
        ] {
            assert!(
                matches!(
                    ConnectionString::parse(raw),
                    Err(ConfigError::InvalidConnectionString { .. })
                ),
                "expected {:?} to be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let conn =
            ConnectionString::parse("Endpoint=https://demo.azconfig.io;Id=abc;Secret=topsecret")
                .unwrap();
        assert!(!format!("{:?}", conn).contains("topsecret"));
    }

    #[test]
    fn test_store_name_from_endpoint() {
        assert_eq!(store_name_from_endpoint("https://shop.azconfig.io"), "shop");
        assert_eq!(store_name_from_endpoint("http://127.0.0.1:9000"), "127");
        assert_eq!(store_name_from_endpoint("plain"), "plain");
    }
}
