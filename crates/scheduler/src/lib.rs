//! Restartable periodic ticks behind an injectable tick source.

mod interval;
mod source;

pub use interval::{IntervalScheduler, OnTick, RunId, MAX_INTERVAL_MS};
pub use source::{ManualHandle, ManualTickSource, TickCallback, TickSource, TokioTickSource};
