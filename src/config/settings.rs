/*
* Configuration layering for the machine monitor
* ----------------------------------------------
* Lowest to highest priority:
*   1. Hardcoded defaults (the constants in `config`)
*   2. <dir>/default.toml, then <dir>/local.toml (both optional)
*   3. MONITOR_* environment variables, `__` between section and key
*      e.g. MONITOR_SAMPLING__BATCH_SIZE=5
*
* CLI flags are applied on top by the caller (see `cli`).
*/

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::{
    DEFAULT_BATCH_SIZE, DEFAULT_DASHBOARD_QUEUE, DEFAULT_INTERVAL_SECS, DEFAULT_LOG_LEVEL,
    DEFAULT_STORE_PATH,
};
use crate::errors::MonitorError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub sampling: SamplingSettings,
    pub storage: StorageSettings,
    pub dashboard: DashboardSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingSettings {
    pub batch_size: usize,
    pub interval_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSettings {
    pub enabled: bool,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        generate_default_config()
    }
}

impl Settings {
    /// Loads settings from `CONFIG_PATH` (or `./config`) and the environment.
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config".to_string());
        Self::new_from_dir(config_path)
    }

    pub fn new_from_dir(config_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = config_dir.as_ref();
        info!("Loading configuration from path: {}", dir.display());

        let config = Self::defaults()?
            .add_source(File::from(dir.join("default")).required(false))
            .add_source(File::from(dir.join("local")).required(false))
            .add_source(
                Environment::with_prefix("MONITOR")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        config.try_deserialize()
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("sampling.batch_size", DEFAULT_BATCH_SIZE as i64)?
            .set_default("sampling.interval_secs", DEFAULT_INTERVAL_SECS as i64)?
            .set_default("storage.path", DEFAULT_STORE_PATH)?
            .set_default("dashboard.enabled", false)?
            .set_default("dashboard.queue_capacity", DEFAULT_DASHBOARD_QUEUE as i64)?
            .set_default("logging.level", DEFAULT_LOG_LEVEL)
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.sampling.batch_size == 0 {
            return Err(MonitorError::InvalidInput(
                "sampling.batch_size must be positive".to_string(),
            ));
        }
        if self.sampling.interval_secs == 0 {
            return Err(MonitorError::InvalidInput(
                "sampling.interval_secs must be positive".to_string(),
            ));
        }
        if self.dashboard.queue_capacity == 0 {
            return Err(MonitorError::InvalidInput(
                "dashboard.queue_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sampling.interval_secs)
    }
}

pub fn generate_default_config() -> Settings {
    Settings {
        sampling: SamplingSettings {
            batch_size: DEFAULT_BATCH_SIZE,
            interval_secs: DEFAULT_INTERVAL_SECS,
            seed: None,
        },
        storage: StorageSettings {
            path: PathBuf::from(DEFAULT_STORE_PATH),
        },
        dashboard: DashboardSettings {
            enabled: false,
            queue_capacity: DEFAULT_DASHBOARD_QUEUE,
        },
        logging: LoggingSettings {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        },
    }
}
