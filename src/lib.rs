//! appconfig-sync - keeps in-memory application configuration in sync with
//! a remote versioned key-value configuration store.
//!
//! This library exposes modules for use in integration tests and by the
//! `appconfig-sync` binary.

pub mod adapters;
pub mod auth;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod models;
pub mod traits;
pub mod watcher;
pub mod webhook;

pub use cache::SettingsCache;
pub use client::{FetchOutcome, ResilientHttpClient};
pub use config::{EngineConfig, StoreConfig};
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use loader::{SettingsLoader, StoreSnapshot};
pub use models::{Setting, Store};
pub use watcher::{ChangeDetector, CycleOutcome, RefreshEvent};
