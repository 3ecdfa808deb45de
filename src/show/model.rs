use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest pin the wire payload (a signed byte) can carry.
pub const MAX_PIN: u8 = i8::MAX as u8;

/// Errors for pin identifiers outside the addressable range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PinError {
    /// Pin 0 is the controller's "no failure" sentinel.
    #[error("pin 0 is reserved and cannot be fired")]
    Reserved,

    #[error("pin {0} is outside the valid range 1..={max}", max = MAX_PIN)]
    OutOfRange(i64),
}

/// Errors for a single firing step.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error(transparent)]
    Pin(#[from] PinError),

    #[error("delay {0} is not a representable, non-negative number of seconds")]
    Delay(f64),
}

/// An igniter output on the firing controller.
///
/// Always in `1..=MAX_PIN`; the reserved sentinel `0` cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Pin(u8);

impl Pin {
    pub fn new(value: u8) -> Result<Self, PinError> {
        Self::try_from(i64::from(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Wire representation: the pin as a signed byte.
    pub fn payload(self) -> i8 {
        // Range is 1..=127, so the cast is lossless.
        self.0 as i8
    }
}

impl TryFrom<i64> for Pin {
    type Error = PinError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Err(PinError::Reserved),
            raw if (1..=i64::from(MAX_PIN)).contains(&raw) => Ok(Pin(raw as u8)),
            _ => Err(PinError::OutOfRange(value)),
        }
    }
}

impl From<Pin> for u8 {
    fn from(pin: Pin) -> Self {
        pin.0
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One unit of a show: fire `pins` in order, then hold for the delay.
#[derive(Debug, Clone, PartialEq)]
pub struct FiringStep {
    delay_seconds: f64,
    delay: Duration,
    pins: Vec<Pin>,
}

impl FiringStep {
    /// Builds a step. An empty pin list makes a pure delay step.
    ///
    /// Delays must be non-negative and fit in a [`Duration`].
    pub fn new(delay_seconds: f64, pins: Vec<Pin>) -> Result<Self, StepError> {
        let delay = Duration::try_from_secs_f64(delay_seconds)
            .map_err(|_| StepError::Delay(delay_seconds))?;
        Ok(Self {
            delay_seconds,
            delay,
            pins,
        })
    }

    pub fn delay_seconds(&self) -> f64 {
        self.delay_seconds
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }
}

/// Immutable, ordered sequence of firing steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Show {
    steps: Vec<FiringStep>,
}

impl Show {
    pub fn new(steps: Vec<FiringStep>) -> Self {
        Self { steps }
    }

    /// Diagnostic show that fires a single pin with no delay.
    pub fn single_pin(pin: Pin) -> Self {
        Self::new(vec![FiringStep {
            delay_seconds: 0.0,
            delay: Duration::ZERO,
            pins: vec![pin],
        }])
    }

    /// Diagnostic show that fires every pin in `first..=last`, one per step.
    pub fn pin_test(first: Pin, last: Pin, delay_seconds: f64) -> Result<Self, StepError> {
        (first.get()..=last.get())
            .map(|raw| FiringStep::new(delay_seconds, vec![Pin::new(raw)?]))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    pub fn steps(&self) -> &[FiringStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Sum of the delays of every step at or after `start`.
    pub fn remaining_seconds(&self, start: usize) -> f64 {
        self.steps
            .iter()
            .skip(start)
            .map(FiringStep::delay_seconds)
            .sum()
    }

    /// What a run starting at `start` will do, step by step.
    pub fn plan(&self, start: usize) -> ShowPlan {
        let entries = self
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                if index < start {
                    PlanEntry::Skipped { index }
                } else {
                    PlanEntry::Run {
                        index,
                        pins: step.pins.clone(),
                        delay_seconds: step.delay_seconds,
                    }
                }
            })
            .collect();

        ShowPlan {
            start,
            entries,
            total_seconds: self.remaining_seconds(start),
        }
    }
}

/// Announcement of a run: every step and whether it will execute.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowPlan {
    pub start: usize,
    pub entries: Vec<PlanEntry>,
    pub total_seconds: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanEntry {
    Skipped {
        index: usize,
    },
    Run {
        index: usize,
        pins: Vec<Pin>,
        delay_seconds: f64,
    },
}

impl fmt::Display for ShowPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Running this show starting at step {} with {} total steps:",
            self.start,
            self.entries.len()
        )?;
        for entry in &self.entries {
            match entry {
                PlanEntry::Skipped { index } => writeln!(f, "Skipping step {index}")?,
                PlanEntry::Run {
                    index,
                    pins,
                    delay_seconds,
                } => {
                    writeln!(f, "Step {index}:")?;
                    writeln!(f, "\tfire pins: {}", format_pins(pins))?;
                    writeln!(f, "\tthen delay: {delay_seconds} seconds")?;
                }
            }
        }
        write!(f, "Total show time is {} seconds", self.total_seconds)
    }
}

pub(crate) fn format_pins(pins: &[Pin]) -> String {
    let joined = pins
        .iter()
        .map(Pin::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{joined}]")
}
