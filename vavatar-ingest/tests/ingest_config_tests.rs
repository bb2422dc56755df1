//! Ingest settings resolution tests
//!
//! Env-var tests are `#[serial]` so they never race on the process
//! environment.

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use vavatar_common::config::{IngestConfig, TomlConfig};
use vavatar_ingest::config::{resolve_ingest_settings, IN_MEMORY_PROBE_ENV_VAR, PROBE_TIMEOUT_ENV_VAR};
use vavatar_ingest::services::validation::{MAX_CLIP_BYTES, MAX_CLIP_DURATION};

fn clear_env() {
    env::remove_var(PROBE_TIMEOUT_ENV_VAR);
    env::remove_var(IN_MEMORY_PROBE_ENV_VAR);
}

#[test]
#[serial]
fn test_defaults() {
    clear_env();
    let settings = resolve_ingest_settings(&TomlConfig::default()).unwrap();

    assert_eq!(settings.probe_timeout, Duration::from_secs(2));
    assert!(settings.in_memory_probe);
    assert!(settings.staging_dir.ends_with("vavatar-staging"));
    assert_eq!(settings.policy.max_bytes, MAX_CLIP_BYTES);
    assert_eq!(settings.policy.max_duration, MAX_CLIP_DURATION);
}

#[test]
#[serial]
fn test_toml_values_are_used() {
    clear_env();
    let config = TomlConfig {
        ingest: IngestConfig {
            probe_timeout_ms: 500,
            in_memory_probe: false,
            staging_dir: Some(PathBuf::from("/var/tmp/clips")),
            max_clip_bytes: 1024,
            max_clip_seconds: 30,
        },
        ..TomlConfig::default()
    };

    let settings = resolve_ingest_settings(&config).unwrap();
    assert_eq!(settings.probe_timeout, Duration::from_millis(500));
    assert!(!settings.in_memory_probe);
    assert_eq!(settings.staging_dir, PathBuf::from("/var/tmp/clips"));
    assert_eq!(settings.policy.max_bytes, 1024);
    assert_eq!(settings.policy.max_duration, Duration::from_secs(30));
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    env::set_var(PROBE_TIMEOUT_ENV_VAR, "250");
    env::set_var(IN_MEMORY_PROBE_ENV_VAR, "off");

    let settings = resolve_ingest_settings(&TomlConfig::default()).unwrap();
    assert_eq!(settings.probe_timeout, Duration::from_millis(250));
    assert!(!settings.in_memory_probe);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_timeout_env_is_an_error() {
    clear_env();
    env::set_var(PROBE_TIMEOUT_ENV_VAR, "0");
    assert!(resolve_ingest_settings(&TomlConfig::default()).is_err());

    env::set_var(PROBE_TIMEOUT_ENV_VAR, "soon");
    assert!(resolve_ingest_settings(&TomlConfig::default()).is_err());

    clear_env();
}

#[test]
#[serial]
fn test_unrecognised_flag_keeps_toml_value() {
    clear_env();
    env::set_var(IN_MEMORY_PROBE_ENV_VAR, "sometimes");

    let settings = resolve_ingest_settings(&TomlConfig::default()).unwrap();
    assert!(settings.in_memory_probe);

    clear_env();
}
