use std::env;
use std::io::Write;

use tempfile::NamedTempFile;

use crate::config::models::{AppConfig, ClusterBackend};
use crate::logging::LogFormat;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_defaults_when_nothing_configured() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.scheduler.reconcile_interval_seconds, 10);
    assert_eq!(config.cluster.backend, ClusterBackend::Memory);
    assert!(config.services.is_empty());
}

#[test]
fn test_load_from_file() {
    let file = write_config(
        r#"
[cluster]
backend = "redis"
member_id = "composer-a"
lock_ttl_ms = 15000

[cluster.redis]
url = "redis://cache:6379/2"

[executor]
max_concurrent_steps = 4

[[services]]
id = "rack-1"
base_url = "https://10.0.0.5:8443"

[[services]]
id = "rack-2"
base_url = "https://10.0.0.6:8443"
root_uri = "/redfish/v1/"

[observability]
log_format = "json"
"#,
    );

    let config = AppConfig::load(Some(file.path().to_str().unwrap())).unwrap();
    assert_eq!(config.cluster.backend, ClusterBackend::Redis);
    assert_eq!(config.cluster.member_id.as_deref(), Some("composer-a"));
    assert_eq!(config.cluster.lock_ttl_ms, 15_000);
    assert_eq!(config.cluster.redis.url, "redis://cache:6379/2");
    assert_eq!(config.cluster.redis.key_prefix, "composer");
    assert_eq!(config.executor.max_concurrent_steps, 4);
    assert_eq!(config.services.len(), 2);
    assert_eq!(config.services[0].root_uri, "/redfish/v1");
    assert_eq!(config.services[1].root_uri, "/redfish/v1/");
    assert_eq!(config.observability.log_format, LogFormat::Json);
}

#[test]
fn test_missing_file_is_an_error() {
    let err = AppConfig::load(Some("/nonexistent/composer.toml")).unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[test]
fn test_environment_override() {
    env::set_var("COMPOSER_SCHEDULER__STALE_AFTER_SECONDS", "95");
    let config = AppConfig::load(None);
    env::remove_var("COMPOSER_SCHEDULER__STALE_AFTER_SECONDS");

    let config = config.unwrap();
    assert_eq!(config.scheduler.stale_after_seconds, 95);
    assert_eq!(config.scheduler.reconcile_interval_seconds, 10);
}

#[test]
fn test_toml_round_trip() {
    let mut config = AppConfig::default();
    config.executor.max_concurrent_steps = 7;

    let serialized = config.to_toml().unwrap();
    let parsed = AppConfig::from_toml(&serialized).unwrap();
    assert_eq!(parsed.executor.max_concurrent_steps, 7);
}
