//! Concrete implementations of trait abstractions.
//!
//! Production adapters implement the traits defined in `crate::traits`,
//! keeping the engine free of direct transport and channel dependencies.
//!
//! # Adapters
//!
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//! - [`ChannelSink`] - Refresh events into a tokio channel
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides test doubles:
//! - [`mock::MockHttpClient`] - Configurable HTTP responses
//! - [`mock::ScriptedConfigClient`] - Canned fetch outcomes
//! - [`mock::RecordingSink`] - Event recording
//! - [`mock::StaticSecretResolver`] - Fixed secret lookups

pub mod channel_sink;
pub mod mock;
pub mod reqwest_http;

pub use channel_sink::ChannelSink;
pub use mock::{MockHttpClient, RecordingSink, ScriptedConfigClient, StaticSecretResolver};
pub use reqwest_http::ReqwestHttpClient;
