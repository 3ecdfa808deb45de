use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::types::Config;
use crate::show::{Pin, Show};

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

const MAX_READ_TIMEOUT_MS: u64 = 60_000;

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/pyroseq/config.toml` on Unix/macOS,
    /// or equivalent on other platforms via `dirs::config_dir()`.
    /// Falls back to current directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("pyroseq").join("config.toml")
    }

    /// Loads configuration from the default config file.
    ///
    /// - If the file doesn't exist, returns `Config::default()`.
    /// - Otherwise behaves like [`Config::load_from`].
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();

        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file; using defaults");
            return Ok(Config::default());
        }

        Self::load_from(&path)
    }

    /// Loads and validates configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - A serial port and a non-zero baud rate are set
    /// - The read timeout is between 1 ms and 60 s
    /// - The test pin range is well formed
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.port.trim().is_empty() {
            return Err(invalid("serial.port must not be empty".to_string()));
        }

        if self.serial.baud_rate == 0 {
            return Err(invalid("serial.baud_rate must be greater than zero".to_string()));
        }

        if !(1..=MAX_READ_TIMEOUT_MS).contains(&self.serial.read_timeout_ms) {
            return Err(invalid(format!(
                "serial.read_timeout_ms must be between 1 and {}, got {}",
                MAX_READ_TIMEOUT_MS, self.serial.read_timeout_ms
            )));
        }

        self.pin_test_show().map(|_| ())
    }

    /// Builds the `--test` diagnostic show from the `[test]` section.
    pub fn pin_test_show(&self) -> Result<Show, ConfigError> {
        let test = &self.test;
        let first = Pin::new(test.first_pin)
            .map_err(|e| invalid(format!("test.first_pin: {}", e)))?;
        let last =
            Pin::new(test.last_pin).map_err(|e| invalid(format!("test.last_pin: {}", e)))?;

        if first > last {
            return Err(invalid(format!(
                "test.first_pin ({}) must not exceed test.last_pin ({})",
                first, last
            )));
        }

        Show::pin_test(first, last, test.delay_seconds)
            .map_err(|e| invalid(format!("test.delay_seconds: {}", e)))
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::ValidationError { message }
}
