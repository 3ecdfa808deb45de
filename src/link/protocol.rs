//! Wire format of the controller protocol.
//!
//! ```text
//! request:  [opcode: u8][payload: i8]
//! response: [status: u8]    b'A' = ack, anything else = nack
//! ```

use super::Link;
use crate::show::Pin;

/// Response byte the controller sends on success.
pub const SUCCESS_BYTE: u8 = b'A';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Liveness probe; payload ignored.
    Keepalive,
    /// Fire the pin given in the payload.
    Fire,
}

impl Opcode {
    pub const fn byte(self) -> u8 {
        match self {
            Opcode::Keepalive => b'K',
            Opcode::Fire => b'H',
        }
    }
}

/// A single request frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    opcode: Opcode,
    payload: i8,
}

impl Frame {
    pub const LEN: usize = 2;

    pub fn keepalive() -> Self {
        Self {
            opcode: Opcode::Keepalive,
            payload: 0,
        }
    }

    pub fn fire(pin: Pin) -> Self {
        Self {
            opcode: Opcode::Fire,
            payload: pin.payload(),
        }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn payload(&self) -> i8 {
        self.payload
    }

    pub fn encode(&self) -> [u8; Self::LEN] {
        [self.opcode.byte(), self.payload as u8]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Ack,
    /// Rejected, garbled, or unanswered. The pin state is unconfirmed.
    Nack,
}

impl Reply {
    /// Classifies a response byte; `None` means nothing arrived in time.
    pub fn decode(byte: Option<u8>) -> Self {
        match byte {
            Some(SUCCESS_BYTE) => Reply::Ack,
            _ => Reply::Nack,
        }
    }

    pub fn is_ack(self) -> bool {
        self == Reply::Ack
    }
}

/// Sends a keepalive and reports whether the controller answered.
pub async fn check_liveness<L: Link>(link: &mut L) -> Reply {
    let reply = link.exchange(Frame::keepalive()).await;
    tracing::debug!(?reply, "Keepalive");
    reply
}
