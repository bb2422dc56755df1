//! Bootstrap configuration and root folder resolution
//!
//! The TOML file holds the root folder, logging, ingest tuning and the
//! HTTP bind address. A missing file is never fatal; the
//! built-in defaults are used and a warning is logged.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `VAVATAR_ROOT` environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_ENV_VAR: &str = "VAVATAR_ROOT";

/// Ceiling on the duration-signal wait before the explicit query fallback
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2_000;

/// Largest clip accepted into a batch (10 MiB)
pub const DEFAULT_MAX_CLIP_BYTES: u64 = 10 * 1024 * 1024;

/// Longest clip accepted into a batch (5 minutes)
pub const DEFAULT_MAX_CLIP_SECONDS: u64 = 5 * 60;

/// Default HTTP bind address for the ingest service
pub const DEFAULT_HTTP_BIND: &str = "127.0.0.1:5731";

const DATABASE_FILE: &str = "vavatar.db";
const CLIPS_DIR: &str = "clips";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the database and stored clips
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Ingest pipeline tuning (optional)
    #[serde(default)]
    pub ingest: IngestConfig,

    /// HTTP server settings (optional)
    #[serde(default)]
    pub http: HttpConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Ingest pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// How long a probe waits for the engine's duration signal
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Hand clip bytes straight to the decode engine when it supports it
    #[serde(default = "default_true")]
    pub in_memory_probe: bool,

    /// Directory for transient staged copies (system temp dir if unset)
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,

    /// Size ceiling per clip; may only be lowered
    #[serde(default = "default_max_clip_bytes")]
    pub max_clip_bytes: u64,

    /// Duration ceiling per clip in seconds; may only be lowered
    #[serde(default = "default_max_clip_seconds")]
    pub max_clip_seconds: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            in_memory_probe: true,
            staging_dir: None,
            max_clip_bytes: DEFAULT_MAX_CLIP_BYTES,
            max_clip_seconds: DEFAULT_MAX_CLIP_SECONDS,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Socket address to listen on
    #[serde(default = "default_http_bind")]
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_http_bind(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

fn default_max_clip_bytes() -> u64 {
    DEFAULT_MAX_CLIP_BYTES
}

fn default_max_clip_seconds() -> u64 {
    DEFAULT_MAX_CLIP_SECONDS
}

fn default_http_bind() -> String {
    DEFAULT_HTTP_BIND.to_string()
}

impl TomlConfig {
    /// Validate values that would otherwise loosen the clip policy
    pub fn validate(&self) -> Result<()> {
        let ingest = &self.ingest;

        if ingest.probe_timeout_ms == 0 {
            return Err(Error::Config(
                "ingest.probe_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if ingest.max_clip_bytes == 0 || ingest.max_clip_bytes > DEFAULT_MAX_CLIP_BYTES {
            return Err(Error::Config(format!(
                "ingest.max_clip_bytes must be between 1 and {} (got {})",
                DEFAULT_MAX_CLIP_BYTES, ingest.max_clip_bytes
            )));
        }
        if ingest.max_clip_seconds == 0 || ingest.max_clip_seconds > DEFAULT_MAX_CLIP_SECONDS {
            return Err(Error::Config(format!(
                "ingest.max_clip_seconds must be between 1 and {} (got {})",
                DEFAULT_MAX_CLIP_SECONDS, ingest.max_clip_seconds
            )));
        }
        if self.logging.level.trim().is_empty() {
            return Err(Error::Config("logging.level must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Default configuration file path for the platform
///
/// `<config_dir>/vavatar/config.toml`, e.g. `~/.config/vavatar/config.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vavatar").join("config.toml"))
}

/// Load and validate a TOML config file
///
/// A missing file yields the built-in defaults with a warning. A file
/// that exists but fails to parse or validate is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "Config file not found, using built-in defaults"
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;
    config.validate()?;

    info!(path = %path.display(), "Loaded config file");
    Ok(config)
}

/// Root folder resolution for one service
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
}

impl RootFolderResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
        }
    }

    /// Resolve the root folder by priority: CLI → ENV → TOML → OS default
    pub fn resolve(&self, cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
        if let Some(path) = cli_arg {
            info!(module = %self.module_name, path = %path.display(), "Root folder from command line");
            return path.to_path_buf();
        }

        if let Ok(path) = std::env::var(ROOT_ENV_VAR) {
            if !path.trim().is_empty() {
                info!(module = %self.module_name, path = %path, "Root folder from {}", ROOT_ENV_VAR);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &toml_config.root_folder {
            info!(module = %self.module_name, path = %path.display(), "Root folder from TOML config");
            return path.clone();
        }

        let path = default_root_folder();
        info!(module = %self.module_name, path = %path.display(), "Root folder from OS default");
        path
    }
}

/// OS-dependent default root folder
///
/// `<data_local_dir>/vavatar` (e.g. `~/.local/share/vavatar` on Linux).
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("vavatar"))
        .unwrap_or_else(|| PathBuf::from("./vavatar_data"))
}

/// Creates the root folder layout and derives the paths inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root folder and the clips directory if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root.exists() {
            info!(path = %self.root.display(), "Creating root folder");
        }
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.clips_dir())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn clips_dir(&self) -> PathBuf {
        self.root.join(CLIPS_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_clip_policy() {
        let config = TomlConfig::default();
        assert_eq!(config.ingest.probe_timeout_ms, 2_000);
        assert_eq!(config.ingest.max_clip_bytes, 10 * 1024 * 1024);
        assert_eq!(config.ingest.max_clip_seconds, 300);
        assert!(config.ingest.in_memory_probe);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.http.bind, DEFAULT_HTTP_BIND);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [ingest]
            probe_timeout_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.ingest.probe_timeout_ms, 500);
        assert_eq!(config.ingest.max_clip_bytes, DEFAULT_MAX_CLIP_BYTES);
        assert!(config.ingest.in_memory_probe);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validate_rejects_loosened_limits() {
        let mut config = TomlConfig::default();
        config.ingest.max_clip_bytes = DEFAULT_MAX_CLIP_BYTES + 1;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = TomlConfig::default();
        config.ingest.max_clip_seconds = 301;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = TomlConfig::default();
        config.ingest.probe_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_accepts_tightened_limits() {
        let mut config = TomlConfig::default();
        config.ingest.max_clip_bytes = 1024;
        config.ingest.max_clip_seconds = 30;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_initializer_paths() {
        let init = RootFolderInitializer::new(PathBuf::from("/srv/vavatar"));
        assert_eq!(init.database_path(), PathBuf::from("/srv/vavatar/vavatar.db"));
        assert_eq!(init.clips_dir(), PathBuf::from("/srv/vavatar/clips"));
    }
}
