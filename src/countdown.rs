//! Interruptible inter-step delay.
//!
//! [`CountdownGate::wait`] races a ticking countdown against an operator
//! skip request and a shutdown request. Whichever resolves first wins; the
//! other branches are dropped when `select!` returns, so nothing outlives
//! the wait.

use std::io::BufRead;
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

use crate::shutdown::ShutdownHandle;

/// Countdown resolution.
pub const TICK: Duration = Duration::from_secs(1);

/// Roughly thirty years.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The full delay ran out.
    Elapsed,
    /// The operator cut the delay short.
    Skipped,
    /// Shutdown was requested during the delay.
    Interrupted,
}

/// Sending half of the skip channel.
#[derive(Debug, Clone)]
pub struct SkipTrigger {
    tx: mpsc::Sender<()>,
}

impl SkipTrigger {
    /// Requests a skip. Returns `false` if one is already pending.
    pub fn skip(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}

/// Receiving half of the skip channel, owned by the runner.
#[derive(Debug)]
pub struct SkipSignal {
    rx: mpsc::Receiver<()>,
}

impl SkipSignal {
    /// A signal that never fires, for unattended runs.
    pub fn never() -> Self {
        let (_, signal) = skip_channel();
        signal
    }

    fn discard_pending(&mut self) -> usize {
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }

    async fn recv(&mut self) {
        if self.rx.recv().await.is_none() {
            // All triggers are gone; no skip can ever arrive.
            std::future::pending::<()>().await;
        }
    }
}

/// Creates a single-slot skip channel.
pub fn skip_channel() -> (SkipTrigger, SkipSignal) {
    let (tx, rx) = mpsc::channel(1);
    (SkipTrigger { tx }, SkipSignal { rx })
}

/// Turns every line the operator enters on stdin into a skip request.
///
/// Runs on a plain thread: a blocking stdin read must not hold up runtime
/// shutdown.
pub fn spawn_stdin_listener(trigger: SkipTrigger) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            if line.is_err() {
                break;
            }
            if trigger.skip() {
                tracing::debug!("Skip requested from stdin");
            }
        }
        tracing::debug!("Stdin closed; skip requests disabled");
    })
}

pub struct CountdownGate {
    tick: Duration,
    shutdown: ShutdownHandle,
}

impl CountdownGate {
    pub fn new(shutdown: ShutdownHandle) -> Self {
        Self {
            tick: TICK,
            shutdown,
        }
    }

    /// Waits up to `duration`, reporting the remaining time once per tick.
    ///
    /// Skip requests that arrived before the wait started are ignored.
    pub async fn wait(
        &self,
        duration: Duration,
        skip: &mut SkipSignal,
        mut on_tick: impl FnMut(Duration),
    ) -> WaitOutcome {
        let stale = skip.discard_pending();
        if stale > 0 {
            tracing::debug!(stale, "Ignoring skip requests received between steps");
        }

        if duration.is_zero() {
            return WaitOutcome::Elapsed;
        }

        let now = Instant::now();
        // Past the clock's range the deadline is effectively never.
        let deadline = now.checked_add(duration).unwrap_or_else(|| now + FAR_FUTURE);
        let tick = self.tick;
        let countdown = async {
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                on_tick(remaining);
                sleep(remaining.min(tick)).await;
            }
        };

        tokio::select! {
            () = countdown => WaitOutcome::Elapsed,
            () = skip.recv() => WaitOutcome::Skipped,
            () = self.shutdown.wait() => WaitOutcome::Interrupted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whole_secs(d: Duration) -> u64 {
        d.as_secs_f64().round() as u64
    }

    #[tokio::test(start_paused = true)]
    async fn full_delay_elapses_with_one_report_per_tick() {
        let gate = CountdownGate::new(ShutdownHandle::new());
        let (_trigger, mut skip) = skip_channel();
        let mut ticks = Vec::new();

        let started = Instant::now();
        let outcome = gate
            .wait(Duration::from_secs(3), &mut skip, |r| ticks.push(whole_secs(r)))
            .await;

        assert_eq!(outcome, WaitOutcome::Elapsed);
        assert_eq!(whole_secs(started.elapsed()), 3);
        assert_eq!(ticks, vec![3, 2, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn fractional_delay_ends_with_a_short_tick() {
        let gate = CountdownGate::new(ShutdownHandle::new());
        let mut skip = SkipSignal::never();
        let mut ticks = 0;

        let started = Instant::now();
        let outcome = gate
            .wait(Duration::from_millis(1500), &mut skip, |_| ticks += 1)
            .await;

        assert_eq!(outcome, WaitOutcome::Elapsed);
        assert_eq!(ticks, 2);
        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert!(started.elapsed() < Duration::from_millis(1600));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_returns_at_once() {
        let gate = CountdownGate::new(ShutdownHandle::new());
        let mut skip = SkipSignal::never();
        let mut ticks = 0;

        let outcome = gate.wait(Duration::ZERO, &mut skip, |_| ticks += 1).await;
        assert_eq!(outcome, WaitOutcome::Elapsed);
        assert_eq!(ticks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn longest_possible_delay_is_still_interruptible() {
        let shutdown = ShutdownHandle::new();
        let gate = CountdownGate::new(shutdown.clone());
        let mut skip = SkipSignal::never();
        let mut first_tick = None;

        tokio::spawn(async move {
            sleep(Duration::from_secs(2)).await;
            shutdown.signal();
        });

        let outcome = gate
            .wait(Duration::MAX, &mut skip, |r| {
                first_tick.get_or_insert(r);
            })
            .await;

        assert_eq!(outcome, WaitOutcome::Interrupted);
        assert!(first_tick.unwrap() > Duration::from_secs(86_400 * 365));
    }

    #[tokio::test(start_paused = true)]
    async fn skip_during_wait_cuts_it_short() {
        let gate = CountdownGate::new(ShutdownHandle::new());
        let (trigger, mut skip) = skip_channel();

        tokio::spawn(async move {
            sleep(Duration::from_secs(3)).await;
            trigger.skip();
        });

        let started = Instant::now();
        let outcome = gate.wait(Duration::from_secs(60), &mut skip, |_| {}).await;

        assert_eq!(outcome, WaitOutcome::Skipped);
        assert_eq!(whole_secs(started.elapsed()), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn skip_sent_before_wait_is_ignored() {
        let gate = CountdownGate::new(ShutdownHandle::new());
        let (trigger, mut skip) = skip_channel();
        assert!(trigger.skip());
        assert!(!trigger.skip());

        let outcome = gate.wait(Duration::from_secs(2), &mut skip, |_| {}).await;
        assert_eq!(outcome, WaitOutcome::Elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_trigger_never_skips() {
        let gate = CountdownGate::new(ShutdownHandle::new());
        let (trigger, mut skip) = skip_channel();
        drop(trigger);

        let outcome = gate.wait(Duration::from_secs(2), &mut skip, |_| {}).await;
        assert_eq!(outcome, WaitOutcome::Elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_wait() {
        let shutdown = ShutdownHandle::new();
        let gate = CountdownGate::new(shutdown.clone());
        let mut skip = SkipSignal::never();

        tokio::spawn(async move {
            sleep(Duration::from_secs(1)).await;
            shutdown.signal();
        });

        let outcome = gate.wait(Duration::from_secs(30), &mut skip, |_| {}).await;
        assert_eq!(outcome, WaitOutcome::Interrupted);
    }
}
