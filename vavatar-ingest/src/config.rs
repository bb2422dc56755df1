//! Ingest settings resolution
//!
//! Priority: environment → TOML `[ingest]` → built-in defaults.

use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use vavatar_common::config::TomlConfig;
use vavatar_common::{Error, Result};

use crate::services::{StagingArea, ValidationPolicy};

/// Overrides `ingest.probe_timeout_ms`
pub const PROBE_TIMEOUT_ENV_VAR: &str = "VAVATAR_PROBE_TIMEOUT_MS";

/// Overrides `ingest.in_memory_probe`
pub const IN_MEMORY_PROBE_ENV_VAR: &str = "VAVATAR_IN_MEMORY_PROBE";

/// Resolved pipeline settings
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSettings {
    /// Ceiling on the duration-signal wait
    pub probe_timeout: Duration,
    /// Probe from memory when the engine allows it
    pub in_memory_probe: bool,
    pub staging_dir: PathBuf,
    pub policy: ValidationPolicy,
}

impl IngestSettings {
    pub fn staging_area(&self) -> StagingArea {
        StagingArea::new(self.staging_dir.clone())
    }
}

/// Resolve ingest settings from TOML plus environment overrides
pub fn resolve_ingest_settings(toml_config: &TomlConfig) -> Result<IngestSettings> {
    let mut ingest = toml_config.ingest.clone();

    if let Ok(raw) = std::env::var(PROBE_TIMEOUT_ENV_VAR) {
        match raw.trim().parse::<u64>() {
            Ok(ms) if ms > 0 => {
                info!(probe_timeout_ms = ms, "Probe timeout from environment variable");
                ingest.probe_timeout_ms = ms;
            }
            _ => {
                return Err(Error::Config(format!(
                    "{} must be a positive integer (got '{}')",
                    PROBE_TIMEOUT_ENV_VAR, raw
                )));
            }
        }
    }

    if let Ok(raw) = std::env::var(IN_MEMORY_PROBE_ENV_VAR) {
        match parse_flag(&raw) {
            Some(flag) => {
                info!(in_memory_probe = flag, "In-memory probing from environment variable");
                ingest.in_memory_probe = flag;
            }
            None => warn!(
                value = %raw,
                "Ignoring unrecognised {} value",
                IN_MEMORY_PROBE_ENV_VAR
            ),
        }
    }

    if ingest.probe_timeout_ms == 0 {
        return Err(Error::Config(
            "ingest.probe_timeout_ms must be greater than zero".to_string(),
        ));
    }

    let staging_dir = ingest
        .staging_dir
        .clone()
        .unwrap_or_else(|| StagingArea::system_default().dir().to_path_buf());

    Ok(IngestSettings {
        probe_timeout: Duration::from_millis(ingest.probe_timeout_ms),
        in_memory_probe: ingest.in_memory_probe,
        staging_dir,
        policy: ValidationPolicy::from_config(&ingest),
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
