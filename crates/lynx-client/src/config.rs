//! Configuration for the Lynx client
//!
//! Provides:
//! - Config file discovery (CLI flag, env var, standard paths)
//! - TOML parsing with serde
//! - Environment variable overrides
//! - Validation of the API base and broker URI

use crate::auth::Auth;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LynxConfig {
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,

    /// REST API base URL (`http`, `https`, `h2c` or `h2`)
    pub api_base: String,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,

    /// Credentials for both HTTP and MQTT
    pub auth: Auth,

    /// MQTT settings, absent when telemetry is not used
    pub mqtt: Option<MqttConfig>,
}

impl Default for LynxConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            api_base: "https://lynx.iotopen.se".to_string(),
            timeout_ms: 5000,
            auth: Auth::None,
            mqtt: None,
        }
    }
}

impl LynxConfig {
    /// Config pointing at `api_base` with the given credentials
    pub fn new(api_base: impl Into<String>, auth: Auth) -> Self {
        Self {
            api_base: api_base.into(),
            auth,
            ..Default::default()
        }
    }

    /// Add MQTT settings
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = Some(mqtt);
        self
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// MQTT connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker URI, e.g. `tcp://lynx.iotopen.se:1883` or `ssl://lynx.iotopen.se:8883`
    pub broker: String,

    /// Client ID (generated when empty)
    pub client_id: String,

    /// Log connects and connection losses
    pub connection_log: bool,

    /// Connect timeout in milliseconds
    pub timeout_ms: u64,

    /// Keep-alive interval in seconds
    pub keep_alive_secs: u64,

    /// Start with a clean session
    pub clean_session: bool,

    /// Keep polling after the connection drops
    pub auto_reconnect: bool,

    /// Delay between reconnect attempts in milliseconds
    pub retry_interval_ms: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: "tcp://localhost:1883".to_string(),
            client_id: String::new(),
            connection_log: false,
            timeout_ms: 30_000,
            keep_alive_secs: 30,
            clean_session: true,
            auto_reconnect: true,
            retry_interval_ms: 5000,
        }
    }
}

impl MqttConfig {
    /// Settings for `broker` with defaults for everything else
    pub fn new(broker: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            ..Default::default()
        }
    }

    /// Set the client ID
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Get connect timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get keep-alive as Duration
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// Get reconnect delay as Duration
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

/// Configuration loader
pub struct ConfigLoader {
    /// Path to config file (if specified via CLI)
    cli_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self { cli_path: None }
    }

    /// Set the config path from CLI argument
    pub fn with_cli_path(mut self, path: Option<PathBuf>) -> Self {
        self.cli_path = path;
        self
    }

    /// Load configuration with the following precedence:
    /// 1. CLI --config flag
    /// 2. LYNX_CONFIG environment variable
    /// 3. ~/.config/lynx/config.toml
    /// 4. /etc/lynx/config.toml
    /// 5. Default values
    pub fn load(&self) -> ConfigResult<LynxConfig> {
        let mut config = match self.find_config_file() {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                Self::load_from_file(&path)?
            }
            None => {
                debug!("No config file found, using defaults");
                LynxConfig::default()
            }
        };

        Self::apply_env_overrides(&mut config);
        Self::validate(&config)?;

        Ok(config)
    }

    /// Find the config file to use
    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!("CLI config path does not exist: {}", path.display());
        }

        if let Ok(env_path) = std::env::var("LYNX_CONFIG") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
            warn!("LYNX_CONFIG path does not exist: {}", env_path);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("lynx").join("config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        #[cfg(unix)]
        {
            let path = PathBuf::from("/etc/lynx/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> ConfigResult<LynxConfig> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: LynxConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(config: &mut LynxConfig) {
        if let Ok(val) = std::env::var("LYNX_LOG_LEVEL") {
            config.log_level = val;
        }
        if let Ok(val) = std::env::var("LYNX_API_BASE") {
            config.api_base = val;
        }
        if let Ok(val) = std::env::var("LYNX_API_KEY") {
            config.auth = Auth::api_key(val);
        } else if let Ok(val) = std::env::var("LYNX_BEARER_TOKEN") {
            config.auth = Auth::bearer(val);
        }
        if let Ok(val) = std::env::var("LYNX_MQTT_BROKER") {
            config
                .mqtt
                .get_or_insert_with(MqttConfig::default)
                .broker = val;
        }
    }

    /// Validate configuration
    pub fn validate(config: &LynxConfig) -> ConfigResult<()> {
        if config.api_base.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "api_base must not be empty".to_string(),
            ));
        }
        url::Url::parse(&config.api_base).map_err(|e| {
            ConfigError::ValidationError(format!("api_base {}: {}", config.api_base, e))
        })?;

        if let Some(mqtt) = &config.mqtt {
            crate::mqtt::BrokerAddress::parse(&mqtt.broker)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level '{}', must be one of: {:?}",
                config.log_level, valid_levels
            )));
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper module for platform-specific directories
mod dirs {
    use std::path::PathBuf;

    /// Get the user's config directory
    pub fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        }

        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
        }

        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }
}
