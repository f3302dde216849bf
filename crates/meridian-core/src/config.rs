//! Configuration module for the Remote Client Layer.
//!
//! Provides typed configuration structs that map to a YAML configuration
//! file, with loading, validation, defaults, and a builder pattern for
//! programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for the remote client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub transfer: TransferConfig,
    pub retry: RetryConfig,
    pub longpoll: LongPollConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
}

/// Upload/download chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Files at or below this size (in bytes) are uploaded in a single request.
    pub small_file_threshold_bytes: u64,
    /// Default chunk size (in bytes) for a chunked upload session.
    pub chunk_size_bytes: u64,
    /// Smallest chunk size the client will accept, in bytes.
    pub chunk_size_min_bytes: u64,
    /// Largest chunk size the client will accept, in bytes.
    pub chunk_size_max_bytes: u64,
}

/// Retry settings applied to transient transport failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first) for a retried operation.
    pub max_attempts: u32,
}

/// Long-poll change notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongPollConfig {
    /// Default timeout, in seconds, passed to the long-poll request.
    pub timeout_seconds: u32,
    /// Smallest timeout the client will accept, in seconds.
    pub timeout_min_seconds: u32,
    /// Largest timeout the client will accept, in seconds.
    pub timeout_max_seconds: u32,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Path to the log file.
    pub file: PathBuf,
    /// Maximum size of a single log file (in MiB) before rotation.
    pub max_size_mb: u64,
    /// Maximum number of rotated log files to keep.
    pub max_files: u32,
}

/// Authentication / OAuth settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// OAuth2 client (application) ID. `None` until the user links an account.
    pub app_id: Option<String>,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/meridian/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("meridian")
            .join("config.yaml")
    }
}

// Config derives Default because all its fields implement Default.
// (clippy::derivable_impls)

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            small_file_threshold_bytes: 150 * 1024 * 1024,
            chunk_size_bytes: 8 * 1024 * 1024,
            chunk_size_min_bytes: 100_000,
            chunk_size_max_bytes: 150_000_000,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl Default for LongPollConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            timeout_min_seconds: 30,
            timeout_max_seconds: 480,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("meridian");
        Self {
            level: "info".to_string(),
            file: data_dir.join("meridian.log"),
            max_size_mb: 50,
            max_files: 5,
        }
    }
}

// AuthConfig derives Default (Option<String> defaults to None).
// (clippy::derivable_impls)

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"retry.max_attempts"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- transfer ---
        if self.transfer.chunk_size_bytes < self.transfer.chunk_size_min_bytes
            || self.transfer.chunk_size_bytes > self.transfer.chunk_size_max_bytes
        {
            errors.push(ValidationError {
                field: "transfer.chunk_size_bytes".into(),
                message: format!(
                    "must be in range {}..={}",
                    self.transfer.chunk_size_min_bytes, self.transfer.chunk_size_max_bytes
                ),
            });
        }
        if self.transfer.chunk_size_min_bytes > self.transfer.chunk_size_max_bytes {
            errors.push(ValidationError {
                field: "transfer.chunk_size_min_bytes".into(),
                message: "must not exceed chunk_size_max_bytes".into(),
            });
        }
        if self.transfer.small_file_threshold_bytes == 0 {
            errors.push(ValidationError {
                field: "transfer.small_file_threshold_bytes".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- retry ---
        if self.retry.max_attempts == 0 {
            errors.push(ValidationError {
                field: "retry.max_attempts".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- longpoll ---
        if self.longpoll.timeout_min_seconds > self.longpoll.timeout_max_seconds {
            errors.push(ValidationError {
                field: "longpoll.timeout_min_seconds".into(),
                message: "must not exceed timeout_max_seconds".into(),
            });
        }
        if self.longpoll.timeout_seconds < self.longpoll.timeout_min_seconds
            || self.longpoll.timeout_seconds > self.longpoll.timeout_max_seconds
        {
            errors.push(ValidationError {
                field: "longpoll.timeout_seconds".into(),
                message: format!(
                    "must be in range {}..={}",
                    self.longpoll.timeout_min_seconds, self.longpoll.timeout_max_seconds
                ),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if self.logging.max_size_mb == 0 {
            errors.push(ValidationError {
                field: "logging.max_size_mb".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.logging.max_files == 0 {
            errors.push(ValidationError {
                field: "logging.max_files".into(),
                message: "must be greater than 0".into(),
            });
        }

        errors
    }
}

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use meridian_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .retry_max_attempts(5)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- transfer ---

    pub fn transfer_chunk_size_bytes(mut self, bytes: u64) -> Self {
        self.config.transfer.chunk_size_bytes = bytes;
        self
    }

    pub fn transfer_small_file_threshold_bytes(mut self, bytes: u64) -> Self {
        self.config.transfer.small_file_threshold_bytes = bytes;
        self
    }

    // --- retry ---

    pub fn retry_max_attempts(mut self, n: u32) -> Self {
        self.config.retry.max_attempts = n;
        self
    }

    // --- longpoll ---

    pub fn longpoll_timeout_seconds(mut self, seconds: u32) -> Self {
        self.config.longpoll.timeout_seconds = seconds;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_file(mut self, file: PathBuf) -> Self {
        self.config.logging.file = file;
        self
    }

    pub fn logging_max_size_mb(mut self, mb: u64) -> Self {
        self.config.logging.max_size_mb = mb;
        self
    }

    pub fn logging_max_files(mut self, n: u32) -> Self {
        self.config.logging.max_files = n;
        self
    }

    // --- auth ---

    pub fn auth_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.config.auth.app_id = Some(app_id.into());
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
