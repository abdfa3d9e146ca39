//! Loading configuration files and applying environment overrides.

use std::io::Write;

use appconfig_sync::config::{EngineConfig, ENV_FAIL_FAST, ENV_WATCH_DELAY_SECS};
use appconfig_sync::error::ConfigError;
use serial_test::serial;
use tempfile::NamedTempFile;

const FULL_CONFIG: &str = r#"{
    "name": "orders",
    "profiles": ["dev"],
    "fail_fast": false,
    "watch": { "enabled": true, "delay_secs": 10 },
    "webhook": { "enabled": true, "bind": "0.0.0.0:9090" },
    "stores": [
        {
            "connection_string": "Endpoint=https://primary.azconfig.io;Id=id-1;Secret=c2VjcmV0",
            "label": "prod,",
            "prefix": "/team/",
            "monitoring": {
                "enabled": true,
                "triggers": [ { "key": "sentinel", "label": "prod" } ],
                "push_notification": {
                    "primary_token": { "name": "token", "secret": "s3cret" }
                }
            }
        },
        {
            "endpoint": "https://backup.azconfig.io",
            "managed_identity": { "client_id": "mi-client" },
            "fail_fast": true
        }
    ]
}"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_and_validate_full_document() {
    let file = write_config(FULL_CONFIG);
    let config = EngineConfig::load_from_path(file.path()).unwrap();
    let stores = config.validate().unwrap();

    assert_eq!(stores.len(), 2);

    let primary = &stores[0];
    assert_eq!(primary.name, "primary");
    assert_eq!(primary.labels, vec![None, Some("prod".to_string())]);
    assert_eq!(
        primary.key_paths(),
        vec![
            "/team/application/".to_string(),
            "/team/application_dev/".to_string(),
            "/team/orders/".to_string(),
            "/team/orders_dev/".to_string(),
        ]
    );
    assert!(!primary.fail_fast);
    assert!(primary.monitoring.enabled);

    let backup = &stores[1];
    assert_eq!(backup.name, "backup");
    assert!(backup.fail_fast);

    assert_eq!(config.webhook.bind_addr().unwrap().port(), 9090);
    assert_eq!(config.watch.delay().as_secs(), 10);
}

#[test]
fn test_missing_file_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = EngineConfig::load_from_path(&dir.path().join("nope.json"));
    assert!(matches!(result, Err(ConfigError::Read { .. })));
}

#[test]
fn test_duplicate_store_names_rejected() {
    let file = write_config(
        r#"{ "stores": [
            { "connection_string": "Endpoint=https://dup.azconfig.io;Id=a;Secret=c2VjcmV0" },
            { "endpoint": "https://dup.azconfig.io", "managed_identity": {} }
        ] }"#,
    );
    let config = EngineConfig::load_from_path(file.path()).unwrap();
    assert!(config.validate().is_err());
}

#[test]
#[serial]
fn test_env_overrides_apply() {
    std::env::set_var(ENV_FAIL_FAST, "no");
    std::env::set_var(ENV_WATCH_DELAY_SECS, "3");

    let file = write_config(r#"{ "fail_fast": true }"#);
    let config = EngineConfig::load_from_path(file.path())
        .unwrap()
        .with_env_overrides();

    std::env::remove_var(ENV_FAIL_FAST);
    std::env::remove_var(ENV_WATCH_DELAY_SECS);

    let config = config.unwrap();
    assert!(!config.fail_fast);
    assert_eq!(config.watch.delay_secs, 3);
}

#[test]
#[serial]
fn test_invalid_env_override_rejected() {
    std::env::set_var(ENV_FAIL_FAST, "sometimes");
    let result = EngineConfig::new().with_env_overrides();
    std::env::remove_var(ENV_FAIL_FAST);

    assert!(result.is_err());
}
