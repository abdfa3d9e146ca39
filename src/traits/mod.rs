//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - raw HTTP GET transport
//! - [`ConfigClient`] - settings fetch with retry, backoff and pagination
//! - [`RefreshSink`] - destination of refresh notifications
//! - [`SecretResolver`] - secret reference resolution
//! - [`TokenCredential`] - bearer tokens for managed-identity stores

pub mod config_client;
pub mod credentials;
pub mod http;
pub mod secrets;
pub mod sink;

pub use config_client::ConfigClient;
pub use credentials::{CredentialsError, TokenCredential};
pub use http::{Headers, HttpClient, HttpError, Response};
pub use secrets::SecretResolver;
pub use sink::RefreshSink;
