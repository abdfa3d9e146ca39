//! Mock implementations for testing.
//!
//! These doubles let the client, detector, loader and webhook be tested
//! without network access.
//!
//! # Available Mocks
//!
//! - [`MockHttpClient`] - HTTP client with queued responses per URL
//! - [`ScriptedConfigClient`] - Canned fetch outcomes per store and query
//! - [`RecordingSink`] - Keeps every refresh event
//! - [`StaticSecretResolver`] - Secret URIs from a fixed map

pub mod config_client;
pub mod http;
pub mod secrets;
pub mod sink;

pub use config_client::{ScriptedCall, ScriptedConfigClient};
pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use secrets::StaticSecretResolver;
pub use sink::RecordingSink;
