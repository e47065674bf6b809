//! Runtime configuration for the `joystick-monitor` binary
//!
//! Read from `<config dir>/joystick/monitor.toml` unless a path is given. Every
//! field is optional; a missing file means defaults.
//!
//! ```toml
//! device_path = "/dev/input/js1"
//! non_blocking = true
//! event_type = "button"
//! event_number = 7
//! ```

use crate::controller::MonitorSettings;
use crate::device::{EventKind, ReadMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    ParseError(#[from] toml::de::Error),
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorConfig {
    pub device_path: PathBuf,
    pub sixaxis_path: PathBuf,
    pub non_blocking: bool,
    pub idle_sleep_ms: u64,
    pub event_type: Option<EventKind>,
    pub event_number: Option<u8>,
    pub stats_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from("/dev/input/js0"),
            sixaxis_path: PathBuf::from("/dev/hidraw0"),
            non_blocking: false,
            idle_sleep_ms: 10,
            event_type: None,
            event_number: None,
            stats_interval_secs: 10,
        }
    }
}

impl MonitorConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("joystick").join("monitor.toml"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::parse(&raw)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Loads `explicit` if given (it must exist), else the default location if
    /// present, else defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("No configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            device_path: self.device_path.clone(),
            read_mode: ReadMode::from_non_blocking(self.non_blocking),
            idle_sleep_ms: self.idle_sleep_ms,
            event_type: self.event_type,
            event_number: self.event_number,
            stats_interval_secs: self.stats_interval_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = MonitorConfig::parse(
            r#"
            device_path = "/dev/input/js1"
            non_blocking = true
            event_type = "button"
            event_number = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.device_path, PathBuf::from("/dev/input/js1"));
        assert_eq!(config.sixaxis_path, PathBuf::from("/dev/hidraw0"));
        assert_eq!(config.event_type, Some(EventKind::Button));

        let settings = config.monitor_settings();
        assert_eq!(settings.read_mode, ReadMode::NonBlocking);
        assert_eq!(settings.event_number, Some(7));
    }

    #[test]
    fn invalid_toml_is_rejected() {
        let err = MonitorConfig::parse("non_blocking = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("monitor.toml");
        assert!(matches!(
            MonitorConfig::load_or_default(Some(&missing)),
            Err(ConfigError::ReadError { .. })
        ));

        fs::write(&missing, "idle_sleep_ms = 25\n").unwrap();
        let config = MonitorConfig::load_or_default(Some(&missing)).unwrap();
        assert_eq!(config.idle_sleep_ms, 25);
        assert_eq!(config.stats_interval_secs, 10);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = MonitorConfig {
            event_type: Some(EventKind::Axis),
            ..MonitorConfig::default()
        };
        let raw = toml::to_string(&config).unwrap();
        assert_eq!(MonitorConfig::parse(&raw).unwrap(), config);
    }
}
