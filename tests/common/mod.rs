//! Shared test utilities and mock infrastructure.

#![allow(dead_code, unused_imports)]

pub mod controller;

use pyroseq::checkpoint::{Checkpoint, CheckpointError, CheckpointStore};
use pyroseq::link::{Frame, Link, Opcode, Reply};
use pyroseq::show::{FiringStep, Pin, Show};
use std::path::PathBuf;

/// Builds a show from `(delay_seconds, pins)` pairs.
pub fn show(steps: &[(f64, &[u8])]) -> Show {
    Show::new(
        steps
            .iter()
            .map(|(delay, pins)| {
                FiringStep::new(*delay, pins.iter().map(|&p| pin(p)).collect())
                    .expect("valid test step")
            })
            .collect(),
    )
}

pub fn pin(raw: u8) -> Pin {
    Pin::new(raw).expect("valid test pin")
}

pub fn raw_pins(pins: &[Pin]) -> Vec<u8> {
    pins.iter().map(|p| p.get()).collect()
}

/// The show used throughout the scenario tests: `[[2,[1,2]],[0,[3]]]`.
pub fn two_step_show() -> Show {
    show(&[(2.0, &[1, 2]), (0.0, &[3])])
}

/// In-process controller that records every frame and answers from a script.
#[derive(Debug, Default)]
pub struct ScriptedLink {
    pub frames: Vec<Frame>,
    nack_pins: Vec<u8>,
    keepalive_down: bool,
}

impl ScriptedLink {
    pub fn acking() -> Self {
        Self::default()
    }

    pub fn nacking(pins: &[u8]) -> Self {
        Self {
            nack_pins: pins.to_vec(),
            ..Self::default()
        }
    }

    pub fn keepalive_down(mut self) -> Self {
        self.keepalive_down = true;
        self
    }

    /// Pins a fire command was sent for, acknowledged or not.
    pub fn fire_commands(&self) -> Vec<u8> {
        self.frames
            .iter()
            .filter(|f| f.opcode() == Opcode::Fire)
            .map(|f| f.payload() as u8)
            .collect()
    }

    pub fn keepalives(&self) -> usize {
        self.frames
            .iter()
            .filter(|f| f.opcode() == Opcode::Keepalive)
            .count()
    }
}

impl Link for ScriptedLink {
    async fn exchange(&mut self, frame: Frame) -> Reply {
        self.frames.push(frame);
        match frame.opcode() {
            Opcode::Keepalive if self.keepalive_down => Reply::Nack,
            Opcode::Keepalive => Reply::Ack,
            Opcode::Fire if self.nack_pins.contains(&(frame.payload() as u8)) => Reply::Nack,
            Opcode::Fire => Reply::Ack,
        }
    }
}

/// Checkpoint store held in memory.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    pub slot: Option<Checkpoint>,
    pub fail_saves: bool,
}

impl MemoryCheckpointStore {
    pub fn holding(checkpoint: Checkpoint) -> Self {
        Self {
            slot: Some(checkpoint),
            fail_saves: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            slot: None,
            fail_saves: true,
        }
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn save(&mut self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        if self.fail_saves {
            return Err(CheckpointError::Write {
                path: PathBuf::from("memory"),
                source: std::io::Error::other("disk full"),
            });
        }
        self.slot = Some(checkpoint);
        Ok(())
    }

    fn load_and_clear(&mut self) -> Result<Checkpoint, CheckpointError> {
        self.slot.take().ok_or_else(|| CheckpointError::NotFound {
            path: PathBuf::from("memory"),
        })
    }
}
