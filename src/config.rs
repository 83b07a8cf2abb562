use crate::error::LogStoreError;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::{debug, warn};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const APP_ID: &str = "updates-log";
const LOG_FILENAME: &str = "updates-logs.txt";

/// One day, the hard ceiling on how far back a read may look.
pub const DEFAULT_MAX_LOOKBACK_SECS: u64 = 86_400;
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Location of the flat log file
    pub log_path: PathBuf,
    /// Maximum lookback applied by the reader, at most one day
    pub max_lookback_secs: u64,
    /// Capacity of the store's submission queue
    pub queue_depth: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            max_lookback_secs: DEFAULT_MAX_LOOKBACK_SECS,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

impl StoreConfig {
    pub fn with_log_path(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> std::result::Result<(), LogStoreError> {
        if self.log_path.as_os_str().is_empty() {
            return Err(LogStoreError::Config("log_path must not be empty".to_string()));
        }
        if self.max_lookback_secs == 0 || self.max_lookback_secs > DEFAULT_MAX_LOOKBACK_SECS {
            return Err(LogStoreError::Config(format!(
                "max_lookback_secs must be between 1 and {}",
                DEFAULT_MAX_LOOKBACK_SECS
            )));
        }
        if self.queue_depth == 0 {
            return Err(LogStoreError::Config("queue_depth must be > 0".to_string()));
        }
        Ok(())
    }
}

fn default_log_path() -> PathBuf {
    match ProjectDirs::from("", "", APP_ID) {
        Some(dirs) => {
            let path = dirs.data_dir().join(LOG_FILENAME);
            debug!("Resolved default log path: {:?}", path);
            path
        }
        None => {
            warn!("Could not determine platform data directory, using current directory");
            PathBuf::from(".").join(LOG_FILENAME)
        }
    }
}

pub fn load_config(path: &Path) -> Result<StoreConfig> {
    let config_content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: StoreConfig =
        toml::from_str(&config_content).context("Failed to parse config file")?;

    config.validate().context("Invalid configuration")?;

    Ok(config)
}
