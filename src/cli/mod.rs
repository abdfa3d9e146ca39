//! Command-line interface.
//!
//! - `--check`: validate the configuration and list the resolved stores
//! - `--once`: load every store, run one detection cycle, print the
//!   properties as JSON and exit
//! - default: load, then keep polling (and serve push notifications when
//!   enabled) until Ctrl-C
//!
//! # Usage
//!
//! ```ignore
//! use appconfig_sync::cli::{parse_args, run_cli_command};
//!
//! let command = parse_args(std::env::args());
//! runtime.block_on(run_cli_command(command))?;
//! ```

pub mod args;
pub mod version;

pub use args::{parse_args, CliCommand};
pub use version::{version_line, VERSION};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;

use crate::adapters::{ChannelSink, ReqwestHttpClient};
use crate::config::EngineConfig;
use crate::engine::SyncEngine;
use crate::loader::StoreSnapshot;
use crate::traits::RefreshSink;
use crate::webhook::start_webhook_server_on;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Run a parsed CLI command to completion.
pub async fn run_cli_command(command: CliCommand) -> Result<()> {
    match command {
        CliCommand::Version => {
            println!("{}", version_line());
            Ok(())
        }
        CliCommand::Check { config } => handle_check_command(config.as_deref()),
        CliCommand::Once { config } => handle_once_command(config.as_deref()).await,
        CliCommand::Run { config } => handle_run_command(config.as_deref()).await,
    }
}

/// Read the config file (explicit path or the default location) and apply
/// environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let path: PathBuf = match path {
        Some(path) => path.to_path_buf(),
        None => EngineConfig::default_path()?,
    };
    tracing::debug!("Loading configuration from {}", path.display());
    Ok(EngineConfig::load_from_path(&path)?.with_env_overrides()?)
}

fn handle_check_command(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    let stores = config.validate()?;

    println!("Configuration OK: {} store(s)", stores.len());
    for store in &stores {
        println!(
            "  {} ({}) contexts={:?} fail_fast={} monitoring={}",
            store.name,
            store.endpoint,
            store.key_paths(),
            store.fail_fast,
            store.monitoring.enabled
        );
    }
    Ok(())
}

fn build_engine(config: EngineConfig, sink: Arc<dyn RefreshSink>) -> Result<SyncEngine> {
    let http = Arc::new(ReqwestHttpClient::with_timeout(HTTP_TIMEOUT)?);
    Ok(SyncEngine::with_http(config, http, None, sink)?)
}

async fn handle_once_command(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    let (sink, _rx) = ChannelSink::channel();
    let engine = build_engine(config, Arc::new(sink))?;

    let snapshots = engine.initial_load().await?;
    let outcome = engine.detect_changes().await?;
    tracing::debug!("Detection cycle finished: {:?}", outcome);

    print_snapshots(&snapshots)
}

fn print_snapshots(snapshots: &[StoreSnapshot]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(snapshots)?);
    Ok(())
}

async fn handle_run_command(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    let webhook = config.webhook.clone();
    let (sink, mut events) = ChannelSink::channel();
    let mut engine = build_engine(config, Arc::new(sink))?;

    let snapshots = engine.initial_load().await?;
    let loaded: usize = snapshots.iter().map(StoreSnapshot::len).sum();
    tracing::info!(
        "Loaded {} properties from {} store(s)",
        loaded,
        snapshots.len()
    );

    engine.start_polling();

    let server = if webhook.enabled {
        let (handle, addr) =
            start_webhook_server_on(webhook.bind_addr()?, engine.webhook_state()).await?;
        tracing::info!("Accepting push notifications on {}", addr);
        Some(handle)
    } else {
        None
    };

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                tracing::info!("{} ({})", event.message, event.source.description());
                match engine.refresh_all().await {
                    Ok(snapshots) => {
                        let count: usize = snapshots.iter().map(StoreSnapshot::len).sum();
                        tracing::info!("Refreshed, {} properties in effect", count);
                    }
                    Err(e) => tracing::error!("Refresh failed: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received, shutting down");
                break;
            }
        }
    }

    if let Some(handle) = server {
        handle.abort();
    }
    engine.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"{
        "stores": [
            { "connection_string": "Endpoint=https://demo.azconfig.io;Id=id-1;Secret=c2VjcmV0" }
        ]
    }"#;

    #[test]
    fn test_load_config_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.stores.len(), 1);
    }

    #[test]
    fn test_check_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(handle_check_command(Some(&missing)).is_err());
    }

    #[test]
    fn test_check_accepts_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        assert!(handle_check_command(Some(file.path())).is_ok());
    }
}
