//! Counter worker: command dispatch over a frequency tally, a Fibonacci
//! membership set and a periodic snapshot scheduler.

pub mod config;
mod machine;
mod runtime;

pub use machine::{EventSink, WorkerStateMachine, DEFAULT_SNAPSHOT_INTERVAL_MS};
pub use runtime::{spawn_worker, WorkerHandle, WorkerRuntime};
