//! Global eventdesk configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_API_URL, DEFAULT_HOST_ID, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS};
use crate::error::{EventDeskError, EventDeskResult};

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_host_id() -> i64 {
    DEFAULT_HOST_ID
}

/// Configuration at ~/.config/eventdesk/config.toml
///
/// Every key can be overridden with an `EVENTDESK_`-prefixed environment
/// variable, e.g. `EVENTDESK_API_KEY`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EventDeskConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub base_id: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_host_id")]
    pub default_host_id: i64,
}

impl Default for EventDeskConfig {
    fn default() -> Self {
        EventDeskConfig {
            api_url: default_api_url(),
            base_id: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            default_host_id: default_host_id(),
        }
    }
}

impl EventDeskConfig {
    pub fn config_path() -> EventDeskResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| EventDeskError::Config("Could not determine config directory".into()))?
            .join("eventdesk");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the config, creating a commented default file on first use.
    pub fn load() -> EventDeskResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    /// Load from an explicit file (missing file means defaults) plus env overrides.
    pub fn load_from(path: &Path) -> EventDeskResult<Self> {
        Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("EVENTDESK").try_parsing(true))
            .build()
            .map_err(|e| EventDeskError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| EventDeskError::Config(e.to_string()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base ID and API key, or a config error telling the user where to put them.
    pub fn credentials(&self) -> EventDeskResult<(&str, &str)> {
        let base_id = self.base_id.as_deref().filter(|s| !s.trim().is_empty());
        let api_key = self.api_key.as_deref().filter(|s| !s.trim().is_empty());

        match (base_id, api_key) {
            (Some(base_id), Some(api_key)) => Ok((base_id, api_key)),
            _ => {
                let path = Self::config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "config.toml".into());
                Err(EventDeskError::Config(format!(
                    "base_id and api_key must be set in {path} \
                     (or via EVENTDESK_BASE_ID / EVENTDESK_API_KEY)"
                )))
            }
        }
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> EventDeskResult<()> {
        let contents = format!(
            "\
# eventdesk configuration

# Hosted table API:
# api_url = \"{DEFAULT_API_URL}\"
# base_id = \"appXXXXXXXXXXXXXX\"
# api_key = \"patXXXXXXXXXXXXXX\"

# Per-request timeout and retries for transient failures:
# timeout_secs = {DEFAULT_TIMEOUT_SECS}
# max_retries = {DEFAULT_MAX_RETRIES}

# Host whose events are listed by default:
# default_host_id = {DEFAULT_HOST_ID}
"
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                EventDeskError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| EventDeskError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_file_parses_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eventdesk").join("config.toml");

        EventDeskConfig::create_default_config(&path).unwrap();
        let config = EventDeskConfig::load_from(&path).unwrap();

        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn reads_values_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "base_id = \"appTest\"\napi_key = \"patTest\"\ntimeout_secs = 5\ndefault_host_id = 1234\n",
        )
        .unwrap();

        let config = EventDeskConfig::load_from(&path).unwrap();

        assert_eq!(config.credentials().unwrap(), ("appTest", "patTest"));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.default_host_id, 1234);
    }

    #[test]
    fn missing_credentials_is_a_config_error() {
        let config = EventDeskConfig {
            base_id: Some("appTest".into()),
            api_key: Some("  ".into()),
            ..EventDeskConfig::default()
        };

        assert!(matches!(
            config.credentials(),
            Err(EventDeskError::Config(_))
        ));
    }
}
