//! Request authentication.
//!
//! - Connection string parsing
//! - HMAC-SHA256 request signing for connection-secret stores
//!
//! Managed-identity stores use bearer tokens from a
//! [`TokenCredential`](crate::traits::TokenCredential) instead.

pub mod connection_string;
pub mod signer;

pub use connection_string::{store_name_from_endpoint, ConnectionString};
pub use signer::{content_hash, RequestSigner};
