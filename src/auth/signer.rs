//! HMAC-SHA256 request signing.
//!
//! The canonical string is
//!
//! ```text
//! METHOD \n path?query \n x-ms-date;host;x-ms-content-sha256
//! ```
//!
//! signed with the base64-decoded shared secret. The output must be
//! bit-exact; the store recomputes it server side.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::{Digest, Sha256};

use crate::error::ConfigError;
use crate::traits::Headers;

type HmacSha256 = Hmac<Sha256>;

/// Headers covered by the signature, in signing order.
pub const SIGNED_HEADERS: &str = "x-ms-date;host;x-ms-content-sha256";

pub const DATE_HEADER: &str = "x-ms-date";
pub const CONTENT_HASH_HEADER: &str = "x-ms-content-sha256";
pub const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Signs requests for one credential.
#[derive(Clone)]
pub struct RequestSigner {
    credential_id: String,
    key: Vec<u8>,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("credential_id", &self.credential_id)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Decode the secret up front; a malformed secret is a configuration
    /// error and is never retried.
    pub fn new(credential_id: impl Into<String>, secret_b64: &str) -> Result<Self, ConfigError> {
        let credential_id = credential_id.into();
        let key = BASE64
            .decode(secret_b64.trim())
            .map_err(|_| ConfigError::MalformedSecret {
                credential: credential_id.clone(),
            })?;
        Ok(Self { credential_id, key })
    }

    pub fn credential_id(&self) -> &str {
        &self.credential_id
    }

    /// Build the authentication headers for a request.
    pub fn sign(
        &self,
        method: &str,
        url: &str,
        body: &[u8],
        timestamp: DateTime<Utc>,
    ) -> Result<Headers, ConfigError> {
        let parsed = Url::parse(url)
            .map_err(|e| ConfigError::invalid("endpoint", format!("{}: {}", url, e)))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ConfigError::invalid("endpoint", format!("{} has no host", url)))?;

        let request_time = format_request_time(timestamp);
        let content_hash = content_hash(body);
        let to_sign = string_to_sign(
            method,
            &path_and_query(&parsed),
            &request_time,
            host,
            &content_hash,
        );
        let signature = self.signature(&to_sign)?;

        let mut headers = Headers::new();
        headers.insert(DATE_HEADER.to_string(), request_time);
        headers.insert(CONTENT_HASH_HEADER.to_string(), content_hash);
        headers.insert(
            CLIENT_REQUEST_ID_HEADER.to_string(),
            uuid::Uuid::new_v4().to_string(),
        );
        headers.insert(
            AUTHORIZATION_HEADER.to_string(),
            format!(
                "HMAC-SHA256 Credential={}, SignedHeaders={}, Signature={}",
                self.credential_id, SIGNED_HEADERS, signature
            ),
        );
        Ok(headers)
    }

    fn signature(&self, to_sign: &str) -> Result<String, ConfigError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).map_err(|_| ConfigError::MalformedSecret {
                credential: self.credential_id.clone(),
            })?;
        mac.update(to_sign.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

/// `base64(SHA256(body))`.
pub fn content_hash(body: &[u8]) -> String {
    BASE64.encode(Sha256::digest(body))
}

/// RFC 1123 style GMT timestamp, day of month unpadded.
pub fn format_request_time(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%a, %-d %b %Y %H:%M:%S GMT").to_string()
}

pub fn string_to_sign(
    method: &str,
    path_and_query: &str,
    request_time: &str,
    host: &str,
    content_hash: &str,
) -> String {
    format!(
        "{}\n{}\n{};{};{}",
        method.to_uppercase(),
        path_and_query,
        request_time,
        host,
        content_hash
    )
}

fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const URL: &str =
        "https://demo.azconfig.io/kv?key=%2Fapplication%2F%2A&label=%00&api-version=1.0";

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 4, 2, 18, 48, 59).unwrap()
    }

    #[test]
    fn test_empty_body_hash() {
        assert_eq!(
            content_hash(b""),
            "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
        assert_eq!(
            content_hash(br#"{"a":1}"#),
            "AVq9f1zFei3ZS3WQ8ErYCEJzkF7jPsXOvq5iJ2qX+GI="
        );
    }

    #[test]
    fn test_request_time_format() {
        assert_eq!(
            format_request_time(fixed_time()),
            "Tue, 2 Apr 2019 18:48:59 GMT"
        );
    }

    #[test]
    fn test_sign_is_bit_exact() {
        let signer = RequestSigner::new("id-1", "c2VjcmV0").unwrap();
        let headers = signer.sign("get", URL, b"", fixed_time()).unwrap();

        assert_eq!(headers[DATE_HEADER], "Tue, 2 Apr 2019 18:48:59 GMT");
        assert_eq!(
            headers[CONTENT_HASH_HEADER],
            "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
        assert_eq!(
            headers[AUTHORIZATION_HEADER],
            "HMAC-SHA256 Credential=id-1, SignedHeaders=x-ms-date;host;x-ms-content-sha256, \
             Signature=U0RDwf7aCCQQUGmTYWu8M0u2i1EPMP2mmSejOmwC1Kw="
        );
        assert!(uuid::Uuid::parse_str(&headers[CLIENT_REQUEST_ID_HEADER]).is_ok());
    }

    #[test]
    fn test_string_to_sign_layout() {
        let s = string_to_sign("get", "/kv?a=b", "T", "h", "H");
        assert_eq!(s, "GET\n/kv?a=b\nT;h;H");
    }

    #[test]
    fn test_malformed_secret_is_config_error() {
        let err = RequestSigner::new("id-1", "not base64!!").unwrap_err();
        assert!(matches!(err, ConfigError::MalformedSecret { ref credential } if credential == "id-1"));
    }

    #[test]
    fn test_debug_hides_key() {
        let signer = RequestSigner::new("id-1", "c2VjcmV0").unwrap();
        let debug = format!("{:?}", signer);
        assert!(debug.contains("id-1"));
        assert!(!debug.contains("secret"));
    }
}
