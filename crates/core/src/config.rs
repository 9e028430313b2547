//! Configuration management for pinpilot

use crate::error::{Error, Result};
use crate::pinata::{PinataOptions, DEFAULT_BASE_URL};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration directory name
const CONFIG_DIR: &str = "pinpilot";

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub pinata: PinataConfig,
    pub advanced: Option<AdvancedConfig>,
    pub logging: Option<LoggingConfig>,
}

/// Pinata configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct PinataConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for PinataConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            secret_api_key: None,
            base_url: default_base_url(),
        }
    }
}

impl std::fmt::Debug for PinataConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinataConfig")
            .field("api_key", &self.api_key.as_deref().map(mask_secret))
            .field("secret_api_key", &self.secret_api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl PinataConfig {
    /// Credentials in the shape the Pinata builder expects
    pub fn options(&self) -> PinataOptions {
        PinataOptions {
            api_key: self.api_key.clone(),
            secret_api_key: self.secret_api_key.clone(),
        }
    }
}

/// Advanced configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Request timeout in seconds, 0 disables it
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Upload dot-files and dot-directories
    #[serde(default)]
    pub include_hidden: bool,
    /// Follow symbolic links; when off a link fails the pin
    #[serde(default = "default_follow_links")]
    pub follow_links: bool,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            include_hidden: false,
            follow_links: default_follow_links(),
        }
    }
}

impl AdvancedConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default values
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    300 // 5 minutes
}

fn default_follow_links() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Show the first 4 characters of a secret
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() > 4 {
        format!("{}***", visible)
    } else {
        "***".to_string()
    }
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let home = home_dir().ok_or_else(|| Error::Config("Cannot determine home directory".to_string()))?;
    Ok(home.join(".config").join(CONFIG_DIR))
}

/// Get the configuration file path
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE))
}

/// Load configuration from the default location
pub fn load_config() -> Result<ConfigFile> {
    load_config_from(&get_config_path()?)
}

/// Load configuration from an explicit file
pub fn load_config_from(config_path: &Path) -> Result<ConfigFile> {
    if !config_path.exists() {
        return Err(Error::ConfigNotFound(config_path.to_path_buf()));
    }

    let content = fs::read_to_string(config_path).map_err(|e| {
        Error::InvalidConfig(format!("Failed to read config file: {}", e))
    })?;

    let config: ConfigFile = toml::from_str(&content).map_err(|e| {
        Error::InvalidConfig(format!("Failed to parse config file: {}", e))
    })?;

    Ok(config)
}

/// Save configuration to the default location
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
    let config_path = get_config_path()?;
    save_config_to(config, &config_path)?;
    Ok(config_path)
}

/// Save configuration to an explicit file
pub fn save_config_to(config: &ConfigFile, config_path: &Path) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
    }

    let content = toml::to_string_pretty(config)?;

    fs::write(config_path, content).map_err(|e| {
        Error::Config(format!("Failed to write config file: {}", e))
    })?;

    // Credentials live in this file: owner read/write only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(config_path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(config_path, perms)?;
    }

    Ok(())
}

/// Validate configuration
pub fn validate_config(config: &ConfigFile) -> Result<()> {
    let has_key = config
        .pinata
        .api_key
        .as_deref()
        .is_some_and(|k| !k.trim().is_empty());
    let has_secret = config
        .pinata
        .secret_api_key
        .as_deref()
        .is_some_and(|k| !k.trim().is_empty());

    match (has_key, has_secret) {
        (true, true) => {}
        (false, false) => {
            return Err(Error::Config(
                "No Pinata credentials configured. Both api_key and secret_api_key must be set".to_string(),
            ))
        }
        (false, true) => return Err(Error::Config("Pinata api_key is missing".to_string())),
        (true, false) => return Err(Error::Config("Pinata secret_api_key is missing".to_string())),
    }

    let base_url = &config.pinata.base_url;
    if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
        return Err(Error::InvalidConfig(format!(
            "Pinata base_url must be an http(s) URL, got '{}'",
            base_url
        )));
    }

    if let Some(logging) = &config.logging {
        if logging.level.parse::<tracing::Level>().is_err() {
            return Err(Error::InvalidConfig(format!(
                "Unknown log level '{}' (expected trace, debug, info, warn or error)",
                logging.level
            )));
        }
    }

    Ok(())
}

/// Check if configuration exists
pub fn config_exists() -> bool {
    get_config_path().map(|p| p.exists()).unwrap_or(false)
}

/// Public alias for ConfigFile (used by lib.rs)
pub use ConfigFile as Config;
