use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use log::{error, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lifestream::{
    LifestreamError,
    charts::CHART_REFRESH_MS,
    sensor::{
        DeviceConfig,
        producer::{DEFAULT_CHARACTERISTIC, DEFAULT_CONNECT_TIMEOUT_S, DEFAULT_DEVICE_ADDRESS},
    },
    upload::{
        UPLOAD_INTERVAL_S,
        mongo::{DEFAULT_COLLECTION, DEFAULT_DATABASE},
    },
};

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) device_address: String,
    pub(crate) characteristic_uuid: Uuid,
    pub(crate) connect_timeout_s: u64,
    pub(crate) upload_interval_s: u64,
    pub(crate) chart_refresh_ms: u64,
    pub(crate) database: String,
    pub(crate) collection: String,
    /// Last username typed in the monitor, restored on the next start
    pub(crate) username: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device_address: DEFAULT_DEVICE_ADDRESS.to_string(),
            characteristic_uuid: DEFAULT_CHARACTERISTIC,
            connect_timeout_s: DEFAULT_CONNECT_TIMEOUT_S,
            upload_interval_s: UPLOAD_INTERVAL_S,
            chart_refresh_ms: CHART_REFRESH_MS,
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            username: String::new(),
        }
    }
}

impl AppConfig {
    fn config_path() -> Result<PathBuf, LifestreamError> {
        Ok(dirs::config_dir()
            .ok_or(LifestreamError::NoConfigDir)?
            .join("lifestream")
            .join(CONFIG_FILE_NAME))
    }

    /// Config saved by a previous run, if there is a readable one.
    pub(crate) fn from_local_file() -> Option<Self> {
        let loaded = Self::config_path().and_then(|path| Self::load_from(&path));
        match loaded {
            Ok(config) => config,
            Err(e) => {
                error!("Ignoring config file: {}", e);
                None
            }
        }
    }

    pub(crate) fn load_from(path: &Path) -> Result<Option<Self>, LifestreamError> {
        if !path.exists() {
            return Ok(None);
        }
        let file =
            std::fs::File::open(path).map_err(|e| LifestreamError::ConfigIOError { source: e })?;
        let config: Self = serde_json::from_reader(file)
            .map_err(|e| LifestreamError::ConfigSerializeError { source: e })?;
        Ok(Some(config.with_valid_intervals()))
    }

    /// Zero periods cannot drive a timer, so they are replaced by the defaults.
    fn with_valid_intervals(mut self) -> Self {
        let defaults = Self::default();
        if self.upload_interval_s == 0 {
            warn!(
                "upload_interval_s must be positive, using {}s",
                defaults.upload_interval_s
            );
            self.upload_interval_s = defaults.upload_interval_s;
        }
        if self.chart_refresh_ms == 0 {
            warn!(
                "chart_refresh_ms must be positive, using {}ms",
                defaults.chart_refresh_ms
            );
            self.chart_refresh_ms = defaults.chart_refresh_ms;
        }
        if self.connect_timeout_s == 0 {
            warn!(
                "connect_timeout_s must be positive, using {}s",
                defaults.connect_timeout_s
            );
            self.connect_timeout_s = defaults.connect_timeout_s;
        }
        self
    }

    pub(crate) fn save(&self) -> Result<(), LifestreamError> {
        self.save_to(&Self::config_path()?)
    }

    pub(crate) fn save_to(&self, path: &Path) -> Result<(), LifestreamError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LifestreamError::ConfigIOError { source: e })?;
        }

        let file =
            std::fs::File::create(path).map_err(|e| LifestreamError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| LifestreamError::ConfigSerializeError { source: e })
    }

    pub(crate) fn device_config(&self) -> DeviceConfig {
        DeviceConfig {
            address: self.device_address.clone(),
            characteristic: self.characteristic_uuid,
            connect_timeout: Duration::from_secs(self.connect_timeout_s),
        }
    }

    pub(crate) fn upload_interval(&self) -> Duration {
        Duration::from_secs(self.upload_interval_s)
    }

    pub(crate) fn chart_refresh(&self) -> Duration {
        Duration::from_millis(self.chart_refresh_ms)
    }
}
