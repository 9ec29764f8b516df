//! Configuration management for airlookup.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "airlookup";

/// Placeholder substituted with the lowercased ICAO24 in the online URL template.
pub const ICAO24_PLACEHOLDER: &str = "{icao24}";

/// Public aircraft metadata endpoint.
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://opensky-network.org/api/metadata/aircraft/icao/{icao24}";

/// Vault holding the table connection string.
pub const DEFAULT_VAULT_URL: &str = "https://planewatch-kv.vault.azure.net/";

/// Name of the secret holding the table connection string.
pub const DEFAULT_SECRET_NAME: &str = "Storage--ConnectionString";

/// Table holding aircraft rows.
pub const DEFAULT_TABLE_NAME: &str = "Aircraft";

/// Partition all aircraft rows live in.
pub const DEFAULT_PARTITION_KEY: &str = "Aircraft";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `AIRLOOKUP_`, sections split on `__`)
/// 2. TOML config file at `~/.config/airlookup/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Online metadata service configuration.
    pub online: OnlineConfig,
    /// Secret vault configuration.
    pub vault: VaultConfig,
    /// Aircraft table configuration.
    pub table: TableConfig,
}

/// Online lookup configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnlineConfig {
    /// URL template; `{icao24}` is replaced with the lowercased address.
    pub url_template: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Secret vault configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Base URL of the key vault.
    pub url: String,
    /// Name of the secret holding the table connection string.
    pub secret_name: String,
}

/// Aircraft table configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Table name.
    pub name: String,
    /// Partition key shared by every aircraft row.
    pub partition_key: String,
    /// Connection string used instead of the vault secret when set.
    /// Never serialized, so `config show` cannot leak it.
    #[serde(skip_serializing)]
    pub connection_string: Option<String>,
    /// Create the table before writing if it does not exist.
    pub create_if_missing: bool,
}

impl Default for OnlineConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            timeout_secs: 10,
        }
    }
}

impl OnlineConfig {
    /// Get the request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_VAULT_URL.to_string(),
            secret_name: DEFAULT_SECRET_NAME.to_string(),
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_TABLE_NAME.to_string(),
            partition_key: DEFAULT_PARTITION_KEY.to_string(),
            connection_string: None,
            create_if_missing: false,
        }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("AIRLOOKUP_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Apply command-line overrides for the vault location and secret name.
    pub fn apply_vault_overrides(&mut self, vault: Option<String>, secret: Option<String>) {
        if let Some(url) = vault {
            self.vault.url = url;
        }
        if let Some(name) = secret {
            self.vault.secret_name = name;
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if !self.online.url_template.contains(ICAO24_PLACEHOLDER) {
            return Err(Error::ConfigValidation {
                message: format!("online.url_template must contain {ICAO24_PLACEHOLDER}"),
            });
        }

        if self.online.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "online.timeout_secs must be greater than 0".to_string(),
            });
        }

        if reqwest::Url::parse(&self.vault.url).is_err() {
            return Err(Error::ConfigValidation {
                message: format!("vault.url is not a valid URL: {}", self.vault.url),
            });
        }

        if self.vault.secret_name.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "vault.secret_name cannot be empty".to_string(),
            });
        }

        if self.table.name.trim().is_empty() || self.table.partition_key.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "table.name and table.partition_key cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}
