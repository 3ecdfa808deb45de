//! Show execution state machine.
//!
//! ```text
//! Announce → for each step ≥ start:
//!     CheckLiveness → FirePins → Countdown → Advance
//! → Completed | Aborted | Interrupted
//! ```
//!
//! Firing is never retried. The first unacknowledged pin stops the run and
//! records a checkpoint; pins already fired stay fired.

mod events;

pub use events::{EventLog, ShowEvent, ShowObserver};

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::LivenessPolicy;
use crate::countdown::{CountdownGate, SkipSignal};
use crate::error::ShowError;
use crate::link::{protocol, Frame, Link};
use crate::show::{FiringStep, Pin, Show};
use crate::shutdown::ShutdownHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortCause {
    /// A fire command was rejected or went unanswered.
    FireNotAcknowledged,
    /// The keepalive before the step failed; nothing in the step was fired.
    LinkDown,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed {
        steps_run: usize,
    },
    Aborted {
        step_index: usize,
        failed_pin: Pin,
        cause: AbortCause,
    },
    /// Stopped by the operator; resume with `next_step` as the start.
    Interrupted {
        next_step: usize,
    },
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Completed { .. } => 0,
            RunOutcome::Aborted { .. } => 2,
            RunOutcome::Interrupted { .. } => 130,
        }
    }
}

/// Rejects start offsets past the end of a non-empty show.
pub fn check_start(show: &Show, start: usize) -> Result<(), ShowError> {
    if !show.is_empty() && start >= show.len() {
        return Err(ShowError::StartOutOfRange {
            start,
            len: show.len(),
        });
    }
    Ok(())
}

pub struct ShowRunner<L, C, O> {
    link: L,
    store: C,
    observer: O,
    gate: CountdownGate,
    skip: SkipSignal,
    shutdown: ShutdownHandle,
    liveness: LivenessPolicy,
}

impl<L, C, O> ShowRunner<L, C, O>
where
    L: Link,
    C: CheckpointStore,
    O: ShowObserver,
{
    pub fn new(link: L, store: C, observer: O, skip: SkipSignal, shutdown: ShutdownHandle) -> Self {
        Self {
            link,
            store,
            observer,
            gate: CountdownGate::new(shutdown.clone()),
            skip,
            shutdown,
            liveness: LivenessPolicy::default(),
        }
    }

    pub fn with_liveness(mut self, liveness: LivenessPolicy) -> Self {
        self.liveness = liveness;
        self
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    /// Runs `show` from step `start` to the end or the first failure.
    pub async fn run(&mut self, show: &Show, start: usize) -> Result<RunOutcome, ShowError> {
        check_start(show, start)?;

        let plan = show.plan(start);
        tracing::info!(
            start,
            steps = show.len(),
            total_seconds = plan.total_seconds,
            "Starting show"
        );
        self.observer.on_event(&ShowEvent::Announced(plan));

        let mut steps_run = 0;
        for (index, step) in show.steps().iter().enumerate() {
            if index < start {
                self.observer.on_event(&ShowEvent::StepSkipped { index });
                continue;
            }

            if self.shutdown.is_shutting_down() {
                tracing::warn!(next_step = index, "Show stopped by operator");
                return Ok(self.finish(RunOutcome::Interrupted { next_step: index }));
            }

            tracing::info!(step = index, pins = step.pins().len(), "Running step");
            self.observer.on_event(&ShowEvent::StepStarted {
                index,
                pins: step.pins().to_vec(),
                delay_seconds: step.delay_seconds(),
            });

            if let Some(outcome) = self.check_liveness(index, step).await? {
                return Ok(self.finish(outcome));
            }

            if let Some(pin) = self.fire_pins(index, step).await {
                let outcome = self.abort(index, pin, AbortCause::FireNotAcknowledged)?;
                return Ok(self.finish(outcome));
            }
            steps_run += 1;

            let observer = &self.observer;
            let outcome = self
                .gate
                .wait(step.delay(), &mut self.skip, |remaining| {
                    observer.on_event(&ShowEvent::CountdownTick { index, remaining })
                })
                .await;
            tracing::debug!(step = index, ?outcome, "Delay finished");
            self.observer.on_event(&ShowEvent::StepWaited {
                index,
                delay: step.delay(),
                outcome,
            });
        }

        tracing::info!(steps_run, "Show completed");
        Ok(self.finish(RunOutcome::Completed { steps_run }))
    }

    /// Consumes the stored checkpoint and reruns from its step, inclusive.
    pub async fn resume(&mut self, show: &Show) -> Result<RunOutcome, ShowError> {
        let checkpoint = self.store.load_and_clear()?;
        tracing::info!(
            step = checkpoint.step_index,
            pin = %checkpoint.failed_pin,
            "Resuming from checkpoint"
        );
        self.run(show, checkpoint.step_index).await
    }

    async fn check_liveness(
        &mut self,
        index: usize,
        step: &FiringStep,
    ) -> Result<Option<RunOutcome>, ShowError> {
        let reply = protocol::check_liveness(&mut self.link).await;
        self.observer
            .on_event(&ShowEvent::LivenessChecked { index, reply });
        if reply.is_ack() {
            return Ok(None);
        }

        match (self.liveness, step.pins().first()) {
            (LivenessPolicy::FailFast, Some(&pin)) => {
                tracing::error!(step = index, "Controller missed keepalive; not firing step");
                self.abort(index, pin, AbortCause::LinkDown).map(Some)
            }
            _ => {
                tracing::warn!(step = index, "Controller missed keepalive; continuing");
                Ok(None)
            }
        }
    }

    /// Fires the step's pins in order. Returns the first pin not acknowledged.
    async fn fire_pins(&mut self, index: usize, step: &FiringStep) -> Option<Pin> {
        for &pin in step.pins() {
            let reply = self.link.exchange(Frame::fire(pin)).await;
            if !reply.is_ack() {
                self.observer.on_event(&ShowEvent::PinFailed { index, pin });
                return Some(pin);
            }
            tracing::debug!(step = index, %pin, "Pin fired");
            self.observer.on_event(&ShowEvent::PinFired { index, pin });
        }
        None
    }

    fn abort(
        &mut self,
        step_index: usize,
        failed_pin: Pin,
        cause: AbortCause,
    ) -> Result<RunOutcome, ShowError> {
        let checkpoint = Checkpoint {
            step_index,
            failed_pin,
        };
        self.store
            .save(checkpoint)
            .map_err(|source| ShowError::CheckpointSave {
                step_index,
                failed_pin,
                source,
            })?;
        self.observer.on_event(&ShowEvent::CheckpointSaved(checkpoint));

        tracing::error!(
            step = step_index,
            pin = %failed_pin,
            ?cause,
            "Firing halted; run with --recover to retry from step {}",
            step_index
        );
        Ok(RunOutcome::Aborted {
            step_index,
            failed_pin,
            cause,
        })
    }

    fn finish(&self, outcome: RunOutcome) -> RunOutcome {
        self.observer.on_event(&ShowEvent::Finished(outcome));
        outcome
    }
}
