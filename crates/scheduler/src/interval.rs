use std::{fmt, sync::Arc, time::Duration};

use tracing::debug;

use crate::source::{TickCallback, TickSource};

/// Longest accepted period (~24.8 days).
pub const MAX_INTERVAL_MS: u64 = i32::MAX as u64;

/// Identifies one activation of a scheduler, from `start` to the matching
/// `stop` or restart. Every tick carries the id of the activation that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(u64);

pub type OnTick = Arc<dyn Fn(RunId) + Send + Sync>;

pub struct IntervalScheduler<S: TickSource> {
    source: S,
    on_tick: OnTick,
    interval_ms: u64,
    active: Option<(RunId, S::Handle)>,
    runs: u64,
}

impl<S: TickSource> IntervalScheduler<S> {
    /// Creates a stopped scheduler.
    pub fn new(interval_ms: u64, source: S, on_tick: OnTick) -> Self {
        Self {
            source,
            on_tick,
            interval_ms: clamp_interval(interval_ms),
            active: None,
            runs: 0,
        }
    }

    pub fn running(&self) -> bool {
        self.active.is_some()
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// True when `run` is the live activation. Hosts that queue ticks use
    /// this to drop ticks that were in flight when the scheduler stopped or
    /// restarted.
    pub fn is_current(&self, run: RunId) -> bool {
        matches!(self.active, Some((current, _)) if current == run)
    }

    pub fn start(&mut self) {
        if self.active.is_some() {
            return;
        }

        self.runs += 1;
        let run = RunId(self.runs);
        let on_tick = Arc::clone(&self.on_tick);
        let tick: TickCallback = Arc::new(move || on_tick(run));
        let handle = self
            .source
            .schedule_repeating(Duration::from_millis(self.interval_ms), tick);
        self.active = Some((run, handle));
        debug!(run = run.0, interval_ms = self.interval_ms, "scheduler started");
    }

    pub fn stop(&mut self) {
        let Some((run, handle)) = self.active.take() else {
            return;
        };
        self.source.cancel(handle);
        debug!(run = run.0, "scheduler stopped");
    }

    /// Changes the period. Non-finite input is ignored; anything else is
    /// floored and clamped to `1..=MAX_INTERVAL_MS`. A running scheduler is
    /// restarted so the next tick lands one full new period from now.
    pub fn set_interval_ms(&mut self, ms: f64) {
        if !ms.is_finite() {
            debug!(ms, interval_ms = self.interval_ms, "ignoring non-finite interval");
            return;
        }

        // Saturating cast: negatives become 0, huge values u64::MAX.
        self.interval_ms = clamp_interval(ms.floor() as u64);
        debug!(interval_ms = self.interval_ms, "scheduler interval updated");

        if self.running() {
            self.stop();
            self.start();
        }
    }
}

impl<S: TickSource> Drop for IntervalScheduler<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<S: TickSource> fmt::Debug for IntervalScheduler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntervalScheduler")
            .field("interval_ms", &self.interval_ms)
            .field("running", &self.running())
            .finish_non_exhaustive()
    }
}

fn clamp_interval(ms: u64) -> u64 {
    ms.clamp(1, MAX_INTERVAL_MS)
}

#[cfg(test)]
#[path = "tests/interval_tests.rs"]
mod tests;
