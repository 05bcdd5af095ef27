//! Configuration management.
use crate::error::{SimError, SimResult};
use config::Config;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Application settings loaded from a TOML file.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Log level filter for consumers that wire up a logger.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Path to the YAML device/resource catalog.
    pub catalog: String,
    /// Default bounded wait for a response, in milliseconds.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl Settings {
    /// Load `config/<name>.toml` (default: `config/default.toml`).
    pub fn new(config_name: Option<&str>) -> SimResult<Self> {
        let config_path = format!("config/{}", config_name.unwrap_or("default"));
        let s = Config::builder()
            .add_source(config::File::with_name(&config_path))
            .build()
            .map_err(SimError::Config)?;

        s.try_deserialize().map_err(SimError::Config)
    }

    /// Load settings from an explicit file path.
    pub fn from_file(path: &Path) -> SimResult<Self> {
        let s = Config::builder()
            .add_source(config::File::from(path))
            .build()
            .map_err(SimError::Config)?;

        s.try_deserialize().map_err(SimError::Config)
    }

    /// Query timeout as a [`Duration`].
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_query_timeout_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_settings_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "catalog = \"catalog/devices.yaml\"").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.catalog, "catalog/devices.yaml");
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.query_timeout(), Duration::from_millis(1000));
    }

    #[test]
    fn overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "catalog = \"lab.yaml\"\nlog_level = \"debug\"\nquery_timeout_ms = 250\n",
        )
        .unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.query_timeout_ms, 250);
    }

    #[test]
    fn missing_catalog_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "log_level = \"info\"\n").unwrap();

        assert!(Settings::from_file(&path).is_err());
    }
}
