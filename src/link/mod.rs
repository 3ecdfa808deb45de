//! Serial request/response link to the firing controller.
//!
//! The controller speaks a strictly half-duplex protocol: one two-byte
//! request, one single-byte reply. Every exchange goes through [`Link`],
//! which takes `&mut self` so only one request can ever be outstanding.

mod dry_run;
pub mod protocol;
mod serial;

use std::future::Future;

pub use dry_run::DryRunLink;
pub use protocol::{Frame, Opcode, Reply, SUCCESS_BYTE};
pub use serial::{open_port, LinkState, SerialLink};

/// A request/response channel to the controller.
///
/// Implementations must bound every exchange in time and never retry.
/// Timeouts and I/O failures are reported as [`Reply::Nack`].
pub trait Link {
    fn exchange(&mut self, frame: Frame) -> impl Future<Output = Reply>;
}
