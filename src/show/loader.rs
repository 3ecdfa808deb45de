use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::model::{FiringStep, Pin, Show, StepError};

/// Errors that can occur when loading a show definition.
#[derive(Debug, Error)]
pub enum ShowLoadError {
    #[error("Failed to read show file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse show file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid step {index} in show file '{path}': {source}")]
    InvalidStep {
        path: PathBuf,
        index: usize,
        #[source]
        source: StepError,
    },
}

/// Raw on-disk entry: `[delay_seconds, [pin, ...]]`.
type RawStep = (f64, Vec<i64>);

/// Loads and validates a show from a JSON file.
pub fn load_show(path: &Path) -> Result<Show, ShowLoadError> {
    let content = fs::read_to_string(path).map_err(|e| ShowLoadError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let show = parse_show(&content, path)?;

    tracing::debug!(path = %path.display(), steps = show.len(), "Loaded show");
    Ok(show)
}

/// Parses show JSON. `origin` is only used to label errors.
pub fn parse_show(content: &str, origin: &Path) -> Result<Show, ShowLoadError> {
    let raw: Vec<RawStep> = serde_json::from_str(content).map_err(|e| ShowLoadError::Parse {
        path: origin.to_path_buf(),
        source: e,
    })?;

    raw.into_iter()
        .enumerate()
        .map(|(index, (delay, pins))| {
            build_step(delay, pins).map_err(|source| ShowLoadError::InvalidStep {
                path: origin.to_path_buf(),
                index,
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Show::new)
}

fn build_step(delay: f64, pins: Vec<i64>) -> Result<FiringStep, StepError> {
    let pins = pins
        .into_iter()
        .map(Pin::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    FiringStep::new(delay, pins)
}
