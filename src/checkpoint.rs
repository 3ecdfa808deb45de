//! Resume checkpoint persistence.
//!
//! A checkpoint is written when a fire command goes unacknowledged and is
//! consumed exactly once by the next recovery run. On disk it is the JSON
//! pair `[step_index, failed_pin]`.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::show::Pin;

/// Where a failed run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(usize, Pin)", into = "(usize, Pin)")]
pub struct Checkpoint {
    pub step_index: usize,
    pub failed_pin: Pin,
}

impl From<(usize, Pin)> for Checkpoint {
    fn from((step_index, failed_pin): (usize, Pin)) -> Self {
        Self {
            step_index,
            failed_pin,
        }
    }
}

impl From<Checkpoint> for (usize, Pin) {
    fn from(checkpoint: Checkpoint) -> Self {
        (checkpoint.step_index, checkpoint.failed_pin)
    }
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("No checkpoint found at '{path}'; nothing to recover")]
    NotFound { path: PathBuf },

    #[error("Failed to read checkpoint '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse checkpoint '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write checkpoint '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Storage for the single resume checkpoint.
pub trait CheckpointStore {
    /// Persists `checkpoint`, replacing any earlier one.
    fn save(&mut self, checkpoint: Checkpoint) -> Result<(), CheckpointError>;

    /// Returns the checkpoint and removes it.
    ///
    /// Fails with [`CheckpointError::NotFound`] when there is none.
    fn load_and_clear(&mut self) -> Result<Checkpoint, CheckpointError>;
}

/// Checkpoint kept in a JSON file.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the checkpoint without consuming it.
    pub fn peek(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CheckpointError::Read {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| CheckpointError::Parse {
                path: self.path.clone(),
                source: e,
            })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_error(&self, source: std::io::Error) -> CheckpointError {
        CheckpointError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&mut self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        let mut body = serde_json::to_string(&checkpoint).map_err(|e| CheckpointError::Parse {
            path: self.path.clone(),
            source: e,
        })?;
        body.push('\n');

        // Write-then-rename so a crash never leaves a truncated checkpoint.
        let temp = self.temp_path();
        if let Err(e) = write_then_rename(&temp, &self.path, body.as_bytes()) {
            let _ = fs::remove_file(&temp);
            return Err(self.write_error(e));
        }

        tracing::info!(
            path = %self.path.display(),
            step = checkpoint.step_index,
            pin = %checkpoint.failed_pin,
            "Checkpoint saved"
        );
        Ok(())
    }

    fn load_and_clear(&mut self) -> Result<Checkpoint, CheckpointError> {
        let checkpoint = self.peek()?.ok_or_else(|| CheckpointError::NotFound {
            path: self.path.clone(),
        })?;

        fs::remove_file(&self.path).map_err(|e| self.write_error(e))?;
        tracing::info!(path = %self.path.display(), "Checkpoint consumed");
        Ok(checkpoint)
    }
}

fn write_then_rename(temp: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(temp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(temp, target)
}
