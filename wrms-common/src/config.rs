//! Configuration loading
//!
//! Settings are resolved per key in priority order:
//! 1. Command-line argument / environment variable (handled by the binary)
//! 2. TOML config file
//! 3. Compiled default (fallback)
//!
//! A missing config file is not an error: a warning is logged and the
//! compiled defaults are used. A config file that exists but cannot be
//! parsed is a configuration error.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8080;

/// Default capacity of each observer's outbound event queue
pub const DEFAULT_SESSION_QUEUE_CAPACITY: usize = 256;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// HTTP server port
    pub port: u16,

    /// Playback backends to enable, by name
    pub backends: Vec<String>,

    /// Directory scanned by the local backend
    pub music_dir: Option<PathBuf>,

    /// Directory of static web assets served under /static
    pub static_dir: Option<PathBuf>,

    /// Capacity of each observer's outbound event queue
    pub session_queue_capacity: usize,

    /// Simulated track length for the dummy backend (seconds)
    pub dummy_track_secs: Option<u64>,

    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            backends: vec!["dummy".to_string()],
            music_dir: None,
            static_dir: None,
            session_queue_capacity: DEFAULT_SESSION_QUEUE_CAPACITY,
            dummy_track_secs: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit file path
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from `explicit` if given, else the platform
    /// config file, else compiled defaults
    ///
    /// An explicitly named file must exist. A missing platform file falls
    /// back to defaults with a warning.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!("Loading configuration from {}", path.display());
            return Self::from_file(path);
        }

        match find_config_file() {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)
            }
            None => {
                warn!("No config file found, using compiled defaults");
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.session_queue_capacity == 0 {
            return Err(Error::Config(
                "session_queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.backends.is_empty() {
            return Err(Error::Config("at least one backend must be enabled".to_string()));
        }
        Ok(())
    }
}

/// Locate the platform config file
///
/// Checks `<config dir>/wrms/config.toml` and, on Linux, `/etc/wrms/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("wrms").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/wrms/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Split a backend list given as a single string ("dummy local" or "dummy,local")
pub fn parse_backend_list(list: &str) -> Vec<String> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|name| !name.is_empty())
        .map(|name| name.to_lowercase())
        .collect()
}
