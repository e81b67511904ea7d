use serde::{Deserialize, Serialize};

use super::capture::CaptureConfig;
use super::database::DatabaseConfig;
use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::sinks::SinkConfig;

/// Main configuration structure for passivedns
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Path to the dnstap Unix socket to create, or an existing frame
    /// file to replay. Mandatory; usually supplied on the command line.
    #[serde(default)]
    pub input: Option<String>,

    /// Ingestion pipeline tuning (workers, queue, frame limits)
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Enabled output sinks
    #[serde(default)]
    pub sinks: SinkConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// SQLite sink configuration
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. passivedns.toml in current directory
    /// 3. /etc/passivedns/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new("passivedns.toml").exists() {
            Self::from_file("passivedns.toml")?
        } else if std::path::Path::new("/etc/passivedns/config.toml").exists() {
            Self::from_file("/etc/passivedns/config.toml")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(input) = overrides.input {
            self.input = Some(input);
        }
        if overrides.text {
            self.sinks.text = true;
        }
        if overrides.json {
            self.sinks.json = true;
        }
        if let Some(db) = overrides.sqlite_path {
            self.sinks.sqlite = true;
            self.database.path = db;
        }
        if let Some(size) = overrides.batch_size {
            self.database.flush_batch_size = size;
        }
        if let Some(workers) = overrides.workers {
            self.capture.workers = workers;
        }
        if let Some(capacity) = overrides.queue_capacity {
            self.capture.queue_capacity = capacity;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Startup validation; runs before any worker is spawned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.input {
            None => {
                return Err(ConfigError::Validation(
                    "Missing input path (-i/--input <socket-or-file>)".to_string(),
                ))
            }
            Some(input) if input.is_empty() => {
                return Err(ConfigError::Validation("Input path is empty".to_string()))
            }
            Some(_) => {}
        }
        if self.sinks.sqlite && self.database.path.is_empty() {
            return Err(ConfigError::Validation(
                "SQLite sink enabled without a database path".to_string(),
            ));
        }
        if self.database.flush_batch_size == 0 {
            return Err(ConfigError::Validation(
                "flush_batch_size must be at least 1".to_string(),
            ));
        }
        if self.capture.max_frame_size == 0 {
            return Err(ConfigError::Validation(
                "max_frame_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub input: Option<String>,
    pub text: bool,
    pub json: bool,
    pub sqlite_path: Option<String>,
    pub batch_size: Option<usize>,
    pub workers: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub log_level: Option<String>,
}
