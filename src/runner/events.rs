use std::time::Duration;

use parking_lot::Mutex;

use super::RunOutcome;
use crate::checkpoint::Checkpoint;
use crate::countdown::WaitOutcome;
use crate::link::Reply;
use crate::show::{Pin, ShowPlan};

/// Progress reported by [`ShowRunner`](super::ShowRunner).
#[derive(Debug, Clone, PartialEq)]
pub enum ShowEvent {
    Announced(ShowPlan),
    StepSkipped {
        index: usize,
    },
    StepStarted {
        index: usize,
        pins: Vec<Pin>,
        delay_seconds: f64,
    },
    LivenessChecked {
        index: usize,
        reply: Reply,
    },
    PinFired {
        index: usize,
        pin: Pin,
    },
    PinFailed {
        index: usize,
        pin: Pin,
    },
    CountdownTick {
        index: usize,
        remaining: Duration,
    },
    StepWaited {
        index: usize,
        delay: Duration,
        outcome: WaitOutcome,
    },
    CheckpointSaved(Checkpoint),
    Finished(RunOutcome),
}

pub trait ShowObserver {
    fn on_event(&self, event: &ShowEvent);
}

impl<O: ShowObserver + ?Sized> ShowObserver for &O {
    fn on_event(&self, event: &ShowEvent) {
        (**self).on_event(event)
    }
}

/// Observer that only records events.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<ShowEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ShowEvent> {
        self.events.lock().clone()
    }

    /// Pins acknowledged by the controller, in firing order.
    pub fn fired_pins(&self) -> Vec<Pin> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ShowEvent::PinFired { pin, .. } => Some(*pin),
                _ => None,
            })
            .collect()
    }

    /// Completed countdowns as `(step index, configured delay, outcome)`.
    pub fn waits(&self) -> Vec<(usize, Duration, WaitOutcome)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ShowEvent::StepWaited {
                    index,
                    delay,
                    outcome,
                } => Some((*index, *delay, *outcome)),
                _ => None,
            })
            .collect()
    }
}

impl ShowObserver for EventLog {
    fn on_event(&self, event: &ShowEvent) {
        self.events.lock().push(event.clone());
    }
}
