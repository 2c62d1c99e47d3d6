//! Server configuration
//!
//! Each setting comes from the command line (or its `WRMS_*` environment
//! variable), then the TOML file, then the compiled default.

use clap::Parser;
use std::path::PathBuf;
use wrms_common::config::{parse_backend_list, TomlConfig};

use crate::error::{Error, Result};

/// Smallest per-session queue; a join replay needs up to four slots
const MIN_SESSION_QUEUE_CAPACITY: usize = 4;

/// Command-line arguments for wrms
#[derive(Parser, Debug, Default)]
#[command(name = "wrms")]
#[command(about = "Collaborative, vote-driven music queue")]
#[command(version)]
pub struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "WRMS_PORT")]
    pub port: Option<u16>,

    /// Backends to enable, separated by commas or spaces (dummy, local)
    #[arg(short, long, env = "WRMS_BACKENDS")]
    pub backends: Option<String>,

    /// Music directory for the local backend
    #[arg(short, long, env = "WRMS_MUSIC_DIR")]
    pub music_dir: Option<PathBuf>,

    /// Directory served under /static
    #[arg(long, env = "WRMS_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "WRMS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Config file (default: platform config dir, then /etc/wrms)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub backends: Vec<String>,
    pub music_dir: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    pub session_queue_capacity: usize,
    pub dummy_track_secs: Option<u64>,
    pub log_level: String,
}

impl ServerConfig {
    /// Overlay command-line values on a loaded TOML config
    pub fn resolve(cli: Cli, file: TomlConfig) -> Result<Self> {
        let backends = match cli.backends {
            Some(list) => parse_backend_list(&list),
            None => file
                .backends
                .iter()
                .map(|name| name.trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
        };
        if backends.is_empty() {
            return Err(Error::Config("at least one backend must be enabled".to_string()));
        }

        Ok(Self {
            port: cli.port.unwrap_or(file.port),
            backends,
            music_dir: cli.music_dir.or(file.music_dir),
            static_dir: cli.static_dir.or(file.static_dir),
            session_queue_capacity: file.session_queue_capacity.max(MIN_SESSION_QUEUE_CAPACITY),
            dummy_track_secs: file.dummy_track_secs,
            log_level: cli.log_level.unwrap_or(file.logging.level),
        })
    }

    /// Load the TOML file named by `cli` (or found on the platform) and resolve
    pub fn load(cli: Cli) -> Result<Self> {
        let file = TomlConfig::load(cli.config.as_deref())?;
        Self::resolve(cli, file)
    }
}
