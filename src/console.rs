//! Operator-facing console output.

use std::io::Write;

use crate::countdown::WaitOutcome;
use crate::link::Reply;
use crate::runner::{AbortCause, RunOutcome, ShowEvent, ShowObserver};
use crate::show::format_pins;

/// Prints run progress to stdout.
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl ConsoleObserver {
    pub fn new() -> Self {
        Self
    }
}

impl ShowObserver for ConsoleObserver {
    fn on_event(&self, event: &ShowEvent) {
        let mut out = std::io::stdout().lock();
        // Console output is best effort; a closed stdout must not stop a show.
        let _ = write_event(&mut out, event).and_then(|()| out.flush());
    }
}

fn write_event(out: &mut impl Write, event: &ShowEvent) -> std::io::Result<()> {
    match event {
        ShowEvent::Announced(plan) => writeln!(out, "{plan}"),
        ShowEvent::StepSkipped { index } => writeln!(out, "\nSkipping step {index}"),
        ShowEvent::StepStarted { index, pins, .. } => {
            writeln!(out, "\nRunning step {index}")?;
            writeln!(out, "\tFiring pin(s) {}", format_pins(pins))
        }
        ShowEvent::LivenessChecked { reply, .. } => match reply {
            Reply::Ack => writeln!(out, "\tController: OK"),
            Reply::Nack => writeln!(out, "\tController: NO RESPONSE"),
        },
        ShowEvent::PinFired { pin, .. } => writeln!(out, "\tPin {pin}: fired"),
        ShowEvent::PinFailed { pin, .. } => writeln!(out, "\tPin {pin}: NOT ACKNOWLEDGED"),
        ShowEvent::CountdownTick { remaining, .. } => writeln!(
            out,
            "\t{:.1}s remaining (press Enter to skip)",
            remaining.as_secs_f64()
        ),
        ShowEvent::StepWaited { outcome, .. } => match outcome {
            WaitOutcome::Skipped => writeln!(out, "\tDelay skipped"),
            WaitOutcome::Interrupted => writeln!(out, "\tDelay interrupted"),
            WaitOutcome::Elapsed => Ok(()),
        },
        ShowEvent::CheckpointSaved(checkpoint) => writeln!(
            out,
            "\nCheckpoint written for step {} pin {}",
            checkpoint.step_index, checkpoint.failed_pin
        ),
        ShowEvent::Finished(outcome) => write_outcome(out, outcome),
    }
}

fn write_outcome(out: &mut impl Write, outcome: &RunOutcome) -> std::io::Result<()> {
    match outcome {
        RunOutcome::Completed { steps_run } => {
            writeln!(out, "\nShow complete: {steps_run} step(s) fired")
        }
        RunOutcome::Aborted {
            step_index,
            failed_pin,
            cause,
        } => {
            let reason = match cause {
                AbortCause::FireNotAcknowledged => "did not get an OK from the firing controller",
                AbortCause::LinkDown => "the firing controller did not answer the keepalive",
            };
            writeln!(
                out,
                "\nABORTED at step {step_index} pin {failed_pin}: {reason}.\n\
                 Run with --recover to retry from step {step_index}."
            )
        }
        RunOutcome::Interrupted { next_step } => writeln!(
            out,
            "\nStopped by operator. Run with --start {next_step} to continue."
        ),
    }
}
