//! Tool configuration: serial settings, file locations, diagnostics.

mod loader;
mod types;

pub use loader::ConfigError;
pub use types::{Config, LivenessPolicy, PinTestConfig, SerialConfig, ShowConfig};
