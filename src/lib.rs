//! Serial-link firing sequencer for pyrotechnic shows.
//!
//! A [`show::Show`] is walked step by step by a [`runner::ShowRunner`]: each
//! step fires its pins over a [`link::Link`], then waits out its delay on a
//! [`countdown::CountdownGate`]. An unacknowledged fire command halts the
//! run and leaves a [`checkpoint::Checkpoint`] to resume from.

pub mod checkpoint;
pub mod config;
pub mod console;
pub mod countdown;
pub mod error;
pub mod link;
pub mod logging;
pub mod runner;
pub mod show;
pub mod shutdown;
