use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub show: ShowConfig,
    #[serde(default)]
    pub test: PinTestConfig,
}

/// Serial connection to the firing controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Device path (e.g., "/dev/ttyUSB0", "COM3").
    #[serde(default = "default_port")]
    pub port: String,
    /// Line speed (default: 9600).
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// How long to wait for each reply in milliseconds (default: 1000).
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// What to do when the controller misses the keepalive before a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LivenessPolicy {
    /// Do not fire the step; save a checkpoint and abort.
    #[default]
    FailFast,
    /// Log the failure and fire anyway.
    Advisory,
}

/// Show and checkpoint locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowConfig {
    #[serde(default = "default_show_path")]
    pub show_path: PathBuf,
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,
    #[serde(default)]
    pub liveness: LivenessPolicy,
}

/// The `--test` sequence: every pin in `first_pin..=last_pin`, one per step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinTestConfig {
    #[serde(default = "default_first_pin")]
    pub first_pin: u8,
    #[serde(default = "default_last_pin")]
    pub last_pin: u8,
    #[serde(default = "default_test_delay")]
    pub delay_seconds: f64,
}

fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_read_timeout_ms() -> u64 {
    1000
}

fn default_show_path() -> PathBuf {
    PathBuf::from("ignition.json")
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("ignition_recovery.json")
}

fn default_first_pin() -> u8 {
    26
}

fn default_last_pin() -> u8 {
    49
}

fn default_test_delay() -> f64 {
    3.0
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Default for ShowConfig {
    fn default() -> Self {
        Self {
            show_path: default_show_path(),
            checkpoint_path: default_checkpoint_path(),
            liveness: LivenessPolicy::default(),
        }
    }
}

impl Default for PinTestConfig {
    fn default() -> Self {
        Self {
            first_pin: default_first_pin(),
            last_pin: default_last_pin(),
            delay_seconds: default_test_delay(),
        }
    }
}
