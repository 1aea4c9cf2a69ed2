//! Configuration management for crabcaps
//!
//! Provides configuration loading, saving, and validation for the capability
//! aggregator and the remote report store.

use crate::errors::CapsError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment overrides, e.g. `CRABCAPS__AGGREGATOR__AR_POLL_INTERVAL_MS`
pub const ENV_PREFIX: &str = "CRABCAPS";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapsConfig {
    pub aggregator: AggregatorConfig,
    pub remote: RemoteConfig,
}

/// Capability aggregation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Delay between AR availability polls while the status is transient
    pub ar_poll_interval_ms: u64,
    /// Give up polling AR availability after this long (0 polls forever)
    pub ar_poll_timeout_ms: u64,
    /// Enumerate physical sensors behind logical cameras
    pub query_physical_sensors: bool,
}

/// Remote report store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Top-level collection holding every report
    pub collection_root: String,
    /// Collection name that holds report documents for one device build
    pub node_marker: String,
    /// Minimum age of a browsed tree before a refresh reloads it
    pub repopulate_interval_secs: u64,
    /// Store reports even when an identical one already exists
    pub allow_duplicate_uploads: bool,
    /// Root directory for the directory-backed document store
    pub store_directory: String,
    /// Minimum gap between two uploads, and between two exports (0 disables)
    #[serde(default = "default_action_interval_secs")]
    pub min_action_interval_secs: u64,
}

fn default_action_interval_secs() -> u64 {
    30
}

impl Default for CapsConfig {
    fn default() -> Self {
        Self {
            aggregator: AggregatorConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            ar_poll_interval_ms: 200,
            ar_poll_timeout_ms: 30_000,
            query_physical_sensors: true,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            collection_root: "CameraData".to_string(),
            node_marker: "CameraDataNode".to_string(),
            repopulate_interval_secs: 30,
            allow_duplicate_uploads: false,
            store_directory: "./camera-data".to_string(),
            min_action_interval_secs: default_action_interval_secs(),
        }
    }
}

impl AggregatorConfig {
    pub fn ar_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ar_poll_interval_ms)
    }

    pub fn ar_poll_timeout(&self) -> Option<Duration> {
        match self.ar_poll_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

impl RemoteConfig {
    pub fn repopulate_interval(&self) -> Duration {
        Duration::from_secs(self.repopulate_interval_secs)
    }

    pub fn min_action_interval(&self) -> Duration {
        Duration::from_secs(self.min_action_interval_secs)
    }
}

impl CapsConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CapsError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CapsError::config(format!("Failed to read config file: {}", e)))?;

        let config: CapsConfig = toml::from_str(&contents)
            .map_err(|e| CapsError::config(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load defaults, then the TOML file if present, then `CRABCAPS__*` environment overrides
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self, CapsError> {
        let defaults = config::Config::try_from(&Self::default())
            .map_err(|e| CapsError::config(format!("Failed to seed defaults: {}", e)))?;

        let layered = config::Config::builder()
            .add_source(defaults)
            .add_source(
                config::File::from(path.as_ref())
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| CapsError::config(format!("Failed to layer configuration: {}", e)))?;

        let config: CapsConfig = layered
            .try_deserialize()
            .map_err(|e| CapsError::config(format!("Failed to parse configuration: {}", e)))?;

        config.validate().map_err(CapsError::config)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CapsError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    CapsError::config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CapsError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| CapsError::config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("crabcaps.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_layered(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.aggregator.ar_poll_interval_ms == 0 {
            return Err("AR poll interval must be greater than zero".to_string());
        }
        if self.aggregator.ar_poll_timeout_ms != 0
            && self.aggregator.ar_poll_timeout_ms < self.aggregator.ar_poll_interval_ms
        {
            return Err("AR poll timeout must be 0 or at least one poll interval".to_string());
        }

        if self.remote.collection_root.is_empty() || self.remote.collection_root.contains('/') {
            return Err("Collection root must be a single non-empty path segment".to_string());
        }
        if self.remote.node_marker.is_empty() || self.remote.node_marker.contains('/') {
            return Err("Node marker must be a single non-empty path segment".to_string());
        }
        if self.remote.store_directory.is_empty() {
            return Err("Store directory must not be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CapsConfig::default();
        assert_eq!(config.aggregator.ar_poll_interval(), Duration::from_millis(200));
        assert_eq!(config.remote.node_marker, "CameraDataNode");
        assert!(!config.remote.allow_duplicate_uploads);
        assert_eq!(config.remote.min_action_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_older_file_without_action_interval_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crabcaps.toml");
        let mut table = toml::Value::try_from(CapsConfig::default()).unwrap();
        table["remote"]
            .as_table_mut()
            .unwrap()
            .remove("min_action_interval_secs");
        fs::write(&path, toml::to_string(&table).unwrap()).unwrap();

        let loaded = CapsConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.remote.min_action_interval_secs, 30);
    }

    #[test]
    fn test_config_validation() {
        let config = CapsConfig::default();
        assert!(config.validate().is_ok());

        let mut bad_interval = config.clone();
        bad_interval.aggregator.ar_poll_interval_ms = 0;
        assert!(bad_interval.validate().is_err());

        let mut bad_marker = CapsConfig::default();
        bad_marker.remote.node_marker = "Camera/Data".to_string();
        assert!(bad_marker.validate().is_err());

        let mut unbounded = CapsConfig::default();
        unbounded.aggregator.ar_poll_timeout_ms = 0;
        assert!(unbounded.validate().is_ok());
        assert_eq!(unbounded.aggregator.ar_poll_timeout(), None);
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("nested").join("crabcaps.toml");

        let mut config = CapsConfig::default();
        config.remote.repopulate_interval_secs = 90;
        assert!(config.save_to_file(&config_path).is_ok());

        let loaded = CapsConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_toml_format() {
        let config = CapsConfig::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[aggregator]"));
        assert!(toml_string.contains("[remote]"));
        assert!(toml_string.contains("ar_poll_interval_ms"));
        assert!(toml_string.contains("node_marker"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = CapsConfig::load_from_file("nonexistent_file.toml");
        assert!(result.is_ok());
        assert_eq!(result.unwrap().aggregator.ar_poll_interval_ms, 200);
    }

    #[test]
    fn test_load_layered_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("crabcaps.toml");
        std::fs::write(
            &config_path,
            "[aggregator]\nar_poll_interval_ms = 50\nar_poll_timeout_ms = 500\nquery_physical_sensors = false\n",
        )
        .unwrap();

        let config = CapsConfig::load_layered(&config_path).unwrap();
        assert_eq!(config.aggregator.ar_poll_interval_ms, 50);
        assert!(!config.aggregator.query_physical_sensors);
        assert_eq!(config.remote, RemoteConfig::default());
    }
}
