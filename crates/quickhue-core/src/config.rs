//! Controller configuration.
//!
//! ```toml
//! [retry.toggle]
//! max_attempts = 5
//! delay_ms = 75
//!
//! [retry.brightness]
//! max_attempts = 3
//! delay_ms = 50
//!
//! [storage]
//! path = "/var/lib/quickhue/settings.json"
//!
//! [channel]
//! outbox_size = 636
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use quickhue_types::OUTBOX_SIZE;
use quickhue_types::dictionary::{DICT_HEADER_LEN, TUPLE_HEADER_LEN};

use crate::retry::RetryConfig;
use crate::settings::{ADDRESS_BUDGET, CREDENTIAL_BUDGET};
use crate::storage::default_storage_path;

/// Upper bound for configured retry attempts.
pub const MAX_RETRY_ATTEMPTS: u32 = 20;

/// Upper bound for the delay between retries. The outbox stays locked while
/// a command retries.
pub const MAX_RETRY_DELAY_MS: u64 = 1000;

/// Smallest outbox that still fits a settings push with full-length values.
pub const MIN_OUTBOX_SIZE: usize =
    DICT_HEADER_LEN + 3 * TUPLE_HEADER_LEN + ADDRESS_BUDGET + CREDENTIAL_BUDGET + 1;

/// Controller configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Retry policies per command.
    pub retry: RetryPolicies,
    /// Settings storage.
    pub storage: StorageConfig,
    /// Message channel limits.
    pub channel: ChannelConfig,
}

impl ControlConfig {
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

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        // Create parent directories if needed
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Retry attempts are between 1 and [`MAX_RETRY_ATTEMPTS`]
    /// - Retry delays do not exceed [`MAX_RETRY_DELAY_MS`]
    /// - The storage path, if set, is not empty
    /// - The outbox fits a full settings push
    ///
    /// # Example
    ///
    /// ```
    /// use quickhue_core::ControlConfig;
    ///
    /// let config = ControlConfig::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.retry.toggle.validate("retry.toggle"));
        errors.extend(self.retry.brightness.validate("retry.brightness"));
        errors.extend(self.storage.validate());
        errors.extend(self.channel.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    ///
    /// This is a convenience method that combines `load()` and `validate()`.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Retry policies for the retried commands. Settings pushes are never
/// retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicies {
    pub toggle: RetryPolicy,
    pub brightness: RetryPolicy,
}

impl Default for RetryPolicies {
    fn default() -> Self {
        Self {
            toggle: RetryPolicy {
                max_attempts: 5,
                delay_ms: 75,
            },
            brightness: RetryPolicy {
                max_attempts: 3,
                delay_ms: 50,
            },
        }
    }
}

/// A fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay between attempts in milliseconds.
    pub delay_ms: u64,
}

impl RetryPolicy {
    /// Build the runtime retry configuration.
    pub fn to_retry_config(self) -> RetryConfig {
        RetryConfig::new(self.max_attempts, Duration::from_millis(self.delay_ms))
    }

    fn validate(&self, prefix: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.max_attempts == 0 {
            errors.push(ValidationError {
                field: format!("{}.max_attempts", prefix),
                message: "must be at least 1".to_string(),
            });
        } else if self.max_attempts > MAX_RETRY_ATTEMPTS {
            errors.push(ValidationError {
                field: format!("{}.max_attempts", prefix),
                message: format!(
                    "{} is too many (max {})",
                    self.max_attempts, MAX_RETRY_ATTEMPTS
                ),
            });
        }

        if self.delay_ms > MAX_RETRY_DELAY_MS {
            errors.push(ValidationError {
                field: format!("{}.delay_ms", prefix),
                message: format!(
                    "{} ms is too long (max {} ms)",
                    self.delay_ms, MAX_RETRY_DELAY_MS
                ),
            });
        }

        errors
    }
}

/// Settings storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Settings file; the platform data directory when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// The configured path, or the default one.
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_storage_path)
    }

    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if let Some(path) = &self.path
            && path.as_os_str().is_empty()
        {
            errors.push(ValidationError {
                field: "storage.path".to_string(),
                message: "path cannot be empty".to_string(),
            });
        }
        errors
    }
}

/// Message channel configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Largest encoded outbound message, in bytes.
    pub outbox_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            outbox_size: OUTBOX_SIZE,
        }
    }
}

impl ChannelConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.outbox_size < MIN_OUTBOX_SIZE {
            errors.push(ValidationError {
                field: "channel.outbox_size".to_string(),
                message: format!(
                    "{} bytes cannot hold a settings push (min {})",
                    self.outbox_size, MIN_OUTBOX_SIZE
                ),
            });
        }
        errors
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
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path (e.g., `retry.toggle.max_attempts`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
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
        .join("quickhue")
        .join("config.toml")
}
