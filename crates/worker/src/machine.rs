use chrono::Utc;
use num_bigint::BigInt;
use scheduler::{IntervalScheduler, OnTick, RunId, TickSource};
use serde_json::Value;
use shared::{
    error::WorkerError,
    protocol::{Command, InputValue, Snapshot, WorkerEvent},
};
use tally::{FibonacciSet, FrequencyCounter};
use tokio::sync::mpsc;
use tracing::{debug, debug_span, error, info, trace};

use crate::config::WorkerSettings;

pub const DEFAULT_SNAPSHOT_INTERVAL_MS: u64 = 1000;

/// Receives events in emission order. Emitting never blocks.
pub trait EventSink {
    fn emit(&mut self, event: WorkerEvent);
}

impl EventSink for Vec<WorkerEvent> {
    fn emit(&mut self, event: WorkerEvent) {
        self.push(event);
    }
}

impl EventSink for mpsc::UnboundedSender<WorkerEvent> {
    fn emit(&mut self, event: WorkerEvent) {
        if self.send(event).is_err() {
            debug!("event receiver dropped; discarding worker event");
        }
    }
}

/// Worker-side state. Every command and tick runs to completion before the
/// next one is handled.
pub struct WorkerStateMachine<S: TickSource> {
    counter: FrequencyCounter,
    fibonacci: FibonacciSet,
    scheduler: IntervalScheduler<S>,
    snapshot_limit: Option<usize>,
}

impl<S: TickSource> WorkerStateMachine<S> {
    /// `on_tick` must route each tick back into [`Self::on_tick`] on the
    /// same execution context that delivers commands.
    pub fn new(settings: &WorkerSettings, source: S, on_tick: OnTick) -> Self {
        let fibonacci = FibonacciSet::with_terms(settings.fibonacci_terms);
        info!(
            terms = settings.fibonacci_terms,
            interval_ms = settings.snapshot_interval_ms,
            "counter worker initialised"
        );

        Self {
            counter: FrequencyCounter::new(),
            fibonacci,
            scheduler: IntervalScheduler::new(settings.snapshot_interval_ms, source, on_tick),
            snapshot_limit: settings.snapshot_limit,
        }
    }

    pub fn running(&self) -> bool {
        self.scheduler.running()
    }

    pub fn interval_ms(&self) -> u64 {
        self.scheduler.interval_ms()
    }

    pub fn counter(&self) -> &FrequencyCounter {
        &self.counter
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            running: self.scheduler.running(),
            total_inputs: self.counter.total(),
            top: self
                .counter
                .snapshot(self.snapshot_limit.map(|limit| limit as f64)),
            last_updated: Utc::now(),
        }
    }

    pub fn handle(&mut self, command: Command, sink: &mut impl EventSink) {
        let _span = debug_span!("command", command = command.tag()).entered();

        match command {
            Command::Start | Command::Resume => {
                self.scheduler.start();
                self.emit_snapshot(sink);
            }
            Command::Halt => {
                self.scheduler.stop();
                self.emit_snapshot(sink);
            }
            Command::InputNumber { value } => self.record(value, sink),
            Command::RequestSnapshot => self.emit_snapshot(sink),
            Command::SetInterval { ms } => {
                self.scheduler.set_interval_ms(ms);
                self.emit_snapshot(sink);
            }
            Command::Quit => {
                self.scheduler.stop();
                // The final snapshot must carry the totals from before the clear.
                self.emit_snapshot(sink);
                self.counter.clear();
                sink.emit(WorkerEvent::QuitAck);
                info!("counter worker quit acknowledged");
            }
        }
    }

    /// Decodes and dispatches a raw wire message. An unrecognized command
    /// applies no effect and is returned as an error.
    pub fn handle_wire(
        &mut self,
        message: &Value,
        sink: &mut impl EventSink,
    ) -> Result<(), WorkerError> {
        let command = Command::from_wire(message).map_err(|error| {
            error!(%error, "rejecting worker command");
            error
        })?;
        self.handle(command, sink);
        Ok(())
    }

    /// Emits a periodic snapshot unless `run` belongs to a stopped or
    /// replaced activation.
    pub fn on_tick(&mut self, run: RunId, sink: &mut impl EventSink) {
        if !self.scheduler.is_current(run) {
            trace!(?run, "dropping stale scheduler tick");
            return;
        }
        self.emit_snapshot(sink);
    }

    fn record(&mut self, value: InputValue, sink: &mut impl EventSink) {
        let value = match value {
            InputValue::Integer(value) => value,
            InputValue::NonInteger(raw) => {
                debug!(%raw, "ignoring non-integer input");
                return;
            }
        };

        if self.fibonacci.contains(&value) {
            self.add(value.clone());
            sink.emit(WorkerEvent::FibAlert { value });
        } else {
            self.add(value);
        }
    }

    fn add(&mut self, value: BigInt) {
        let count = self.counter.add(value);
        trace!(count, total = self.counter.total(), "input recorded");
    }

    fn emit_snapshot(&self, sink: &mut impl EventSink) {
        sink.emit(WorkerEvent::Snapshot {
            payload: self.snapshot(),
        });
    }
}

#[cfg(test)]
#[path = "tests/machine_tests.rs"]
mod tests;
