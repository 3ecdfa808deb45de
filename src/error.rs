use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;
use crate::show::{Pin, ShowLoadError};

/// Errors that stop a show before or outside the firing sequence.
///
/// An unacknowledged fire command is not an error: it is reported as
/// [`RunOutcome::Aborted`](crate::runner::RunOutcome::Aborted).
#[derive(Debug, Error)]
pub enum ShowError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Show(#[from] ShowLoadError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("Start step {start} is out of range for a show with {len} steps")]
    StartOutOfRange { start: usize, len: usize },

    #[error("Failed to open serial port '{port}': {source}")]
    SerialOpen {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    /// Firing failed and the resume point could not be recorded.
    #[error(
        "Step {step_index} pin {failed_pin} was not acknowledged and the checkpoint \
         could not be saved: {source}"
    )]
    CheckpointSave {
        step_index: usize,
        failed_pin: Pin,
        #[source]
        source: CheckpointError,
    },
}
