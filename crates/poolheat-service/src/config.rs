//! Exporter configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use poolheat_core::aquatemp::DEFAULT_BASE_URL;

/// Exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Metrics endpoint settings.
    pub server: ServerConfig,
    /// Credential store settings.
    pub storage: StorageConfig,
    /// AquaTemp cloud account.
    pub aquatemp: AquaTempConfig,
    /// Hue bridge settings.
    pub hue: HueConfig,
    /// Poll loop settings.
    pub poll: PollConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// A missing file yields the defaults, which fail validation until the
    /// AquaTemp account is filled in.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// All sections are checked and every problem is reported at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.aquatemp.validate());
        errors.extend(self.hue.validate());
        errors.extend(self.poll.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Metrics endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8023").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8023".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError::new(
                "server.bind",
                "bind address cannot be empty",
            ));
            return errors;
        }

        match self.bind.rsplit_once(':') {
            None => errors.push(ValidationError::new(
                "server.bind",
                format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            )),
            Some((_, port)) => match port.parse::<u16>() {
                Ok(0) => errors.push(ValidationError::new("server.bind", "port cannot be 0")),
                Ok(_) => {}
                Err(_) => errors.push(ValidationError::new(
                    "server.bind",
                    format!("invalid port '{}': must be a number 1-65535", port),
                )),
            },
        }

        errors
    }
}

/// Credential store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: poolheat_store::default_db_path(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.path",
                "database path cannot be empty",
            ));
        }

        errors
    }
}

/// AquaTemp account configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AquaTempConfig {
    /// Account user name (usually an e-mail address).
    pub username: String,
    /// Account password in clear text.
    pub password: String,
    /// API root.
    pub base_url: String,
}

impl Default for AquaTempConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl fmt::Debug for AquaTempConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AquaTempConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AquaTempConfig {
    /// The password wrapped for the client.
    pub fn password(&self) -> SecretString {
        SecretString::from(self.password.clone())
    }

    /// Validate account configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.username.trim().is_empty() {
            errors.push(ValidationError::new(
                "aquatemp.username",
                "username cannot be empty",
            ));
        }
        if self.password.is_empty() {
            errors.push(ValidationError::new(
                "aquatemp.password",
                "password cannot be empty",
            ));
        }
        if let Some(error) = validate_url("aquatemp.base_url", &self.base_url) {
            errors.push(error);
        }

        errors
    }
}

/// Minimum discovery timeout in seconds.
pub const MIN_DISCOVERY_TIMEOUT: u64 = 1;
/// Maximum discovery timeout in seconds (5 minutes).
pub const MAX_DISCOVERY_TIMEOUT: u64 = 300;

/// Hue bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HueConfig {
    /// Name of the bridge device that switches the pool pump.
    pub pump_name: String,
    /// How long to browse for the bridge at startup, in seconds.
    pub discovery_timeout: u64,
    /// Fixed bridge URL. Skips discovery when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge_url: Option<String>,
}

impl Default for HueConfig {
    fn default() -> Self {
        Self {
            pump_name: "Poolpump".to_string(),
            discovery_timeout: 30,
            bridge_url: None,
        }
    }
}

impl HueConfig {
    /// Discovery bound as a [`Duration`].
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout)
    }

    /// Validate bridge configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.pump_name.is_empty() {
            errors.push(ValidationError::new(
                "hue.pump_name",
                "pump name cannot be empty",
            ));
        }

        if !(MIN_DISCOVERY_TIMEOUT..=MAX_DISCOVERY_TIMEOUT).contains(&self.discovery_timeout) {
            errors.push(ValidationError::new(
                "hue.discovery_timeout",
                format!(
                    "discovery timeout {} is out of range ({}-{} seconds)",
                    self.discovery_timeout, MIN_DISCOVERY_TIMEOUT, MAX_DISCOVERY_TIMEOUT
                ),
            ));
        }

        if let Some(url) = &self.bridge_url
            && let Some(error) = validate_url("hue.bridge_url", url)
        {
            errors.push(error);
        }

        errors
    }
}

/// Minimum poll interval in seconds (10 seconds).
pub const MIN_POLL_INTERVAL: u64 = 10;
/// Maximum poll interval in seconds (1 hour).
pub const MAX_POLL_INTERVAL: u64 = 3600;

/// Poll loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Seconds between poll cycles.
    pub interval: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval: 60 }
    }
}

impl PollConfig {
    /// Poll period as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Validate poll configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.interval < MIN_POLL_INTERVAL {
            errors.push(ValidationError::new(
                "poll.interval",
                format!(
                    "poll interval {} is too short (minimum {} seconds)",
                    self.interval, MIN_POLL_INTERVAL
                ),
            ));
        } else if self.interval > MAX_POLL_INTERVAL {
            errors.push(ValidationError::new(
                "poll.interval",
                format!(
                    "poll interval {} is too long (maximum {} seconds / 1 hour)",
                    self.interval, MAX_POLL_INTERVAL
                ),
            ));
        }

        errors
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory receiving the daily log files.
    pub directory: PathBuf,
    /// Also log to the console.
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_dir(),
            console: true,
        }
    }
}

fn validate_url(field: &str, url: &str) -> Option<ValidationError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        None
    } else {
        Some(ValidationError::new(
            field,
            format!("URL must start with http:// or https://, got '{}'", url),
        ))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `poll.interval`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("poolheatmetrics")
        .join("config.toml")
}

/// Default log directory.
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("poolheatmetrics")
        .join("logs")
}
