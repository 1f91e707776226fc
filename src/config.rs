//! Configuration Management
//!
//! Optional settings file for tagbind, `<config_dir>/tagbind/config.json`.
//! Command-line flags win over the file, the file wins over built-in defaults.

use crate::error::{Result, TagError};
use crate::tagging::endpoint::{EndpointResolver, DEFAULT_API_ENDPOINT};
use crate::tagging::operation::{PollSettings, DEFAULT_OPERATION_TIMEOUT, DEFAULT_POLL_INTERVAL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Delay between operation polls
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    /// Give up on an operation after this long
    #[serde(default)]
    pub operation_timeout_secs: Option<u64>,
    /// Reduce zones (`us-central1-a`) to their region when picking a host
    #[serde(default)]
    pub derive_region_from_zone: Option<bool>,
    /// Global API base URL
    #[serde(default)]
    pub api_endpoint: Option<String>,
    /// Location used when a command does not name one
    #[serde(default)]
    pub location: Option<String>,
}

/// Values taken from the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub poll_interval_ms: Option<u64>,
    pub operation_timeout_secs: Option<u64>,
    pub derive_region_from_zone: Option<bool>,
    pub api_endpoint: Option<String>,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub poll: PollSettings,
    pub derive_region_from_zone: bool,
    pub api_endpoint: String,
    pub default_location: Option<String>,
}

impl Settings {
    pub fn resolver(&self) -> Result<EndpointResolver> {
        EndpointResolver::new(&self.api_endpoint, self.derive_region_from_zone)
    }
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tagbind").join("config.json"))
    }

    /// Load configuration from disk; anything unreadable yields defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config file {:?}: {}", path, e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Failed to read config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TagError::Config(format!("cannot create {:?}: {}", parent, e)))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| TagError::Config(format!("cannot write {:?}: {}", path, e)))?;

        Ok(())
    }

    /// Combine with CLI overrides (CLI > config > default)
    pub fn effective(&self, overrides: &Overrides) -> Result<Settings> {
        let interval = overrides
            .poll_interval_ms
            .or(self.poll_interval_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        let timeout = overrides
            .operation_timeout_secs
            .or(self.operation_timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_OPERATION_TIMEOUT);

        if interval.is_zero() {
            return Err(TagError::Config("poll interval must be greater than zero".to_string()));
        }

        let api_endpoint = overrides
            .api_endpoint
            .clone()
            .or_else(|| self.api_endpoint.clone())
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());

        let settings = Settings {
            poll: PollSettings { interval, timeout },
            derive_region_from_zone: overrides
                .derive_region_from_zone
                .or(self.derive_region_from_zone)
                .unwrap_or(true),
            api_endpoint,
            default_location: self.location.clone().filter(|l| !l.trim().is_empty()),
        };

        // fail early on a bad endpoint
        settings.resolver()?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Config::default().effective(&Overrides::default()).unwrap();
        assert_eq!(settings.poll, PollSettings::default());
        assert!(settings.derive_region_from_zone);
        assert_eq!(settings.api_endpoint, DEFAULT_API_ENDPOINT);
        assert_eq!(settings.default_location, None);
    }

    #[test]
    fn test_cli_overrides_config() {
        let config = Config {
            poll_interval_ms: Some(500),
            operation_timeout_secs: Some(10),
            derive_region_from_zone: Some(false),
            api_endpoint: None,
            location: Some("us-east1".to_string()),
        };
        let overrides = Overrides {
            poll_interval_ms: Some(100),
            derive_region_from_zone: Some(true),
            ..Default::default()
        };

        let settings = config.effective(&overrides).unwrap();
        assert_eq!(settings.poll.interval, Duration::from_millis(100));
        assert_eq!(settings.poll.timeout, Duration::from_secs(10));
        assert!(settings.derive_region_from_zone);
        assert_eq!(settings.default_location.as_deref(), Some("us-east1"));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let zero = Overrides {
            poll_interval_ms: Some(0),
            ..Default::default()
        };
        assert!(matches!(Config::default().effective(&zero), Err(TagError::Config(_))));

        let bad_endpoint = Overrides {
            api_endpoint: Some("::nope".to_string()),
            ..Default::default()
        };
        assert!(Config::default().effective(&bad_endpoint).is_err());
    }

    #[test]
    fn test_camel_case_file_format() {
        let config: Config = serde_json::from_str(
            r#"{"pollIntervalMs": 250, "deriveRegionFromZone": false, "apiEndpoint": "http://localhost:9000/v3"}"#,
        )
        .unwrap();
        assert_eq!(config.poll_interval_ms, Some(250));
        assert_eq!(config.derive_region_from_zone, Some(false));
        assert_eq!(config.api_endpoint.as_deref(), Some("http://localhost:9000/v3"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("tagbind-config-test-{}", std::process::id()));
        let path = dir.join("config.json");
        let config = Config {
            operation_timeout_secs: Some(30),
            ..Default::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);

        std::fs::write(&path, "{ broken").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_is_default() {
        assert_eq!(
            Config::load_from(Path::new("/nonexistent/tagbind/config.json")),
            Config::default()
        );
    }
}
