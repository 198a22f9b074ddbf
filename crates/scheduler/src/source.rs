use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

pub type TickCallback = Arc<dyn Fn() + Send + Sync>;

/// Capability to run a callback repeatedly. The first call happens one full
/// `period` after scheduling.
pub trait TickSource {
    type Handle;

    fn schedule_repeating(&mut self, period: Duration, tick: TickCallback) -> Self::Handle;

    /// No callback starts after this returns.
    fn cancel(&mut self, handle: Self::Handle);
}

/// Tick source backed by tokio timers. Must be used from within a runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTickSource;

impl TickSource for TokioTickSource {
    type Handle = JoinHandle<()>;

    fn schedule_repeating(&mut self, period: Duration, tick: TickCallback) -> Self::Handle {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                tick();
            }
        })
    }

    fn cancel(&mut self, handle: Self::Handle) {
        handle.abort();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualHandle(u64);

struct ManualSchedule {
    period: Duration,
    tick: TickCallback,
}

#[derive(Default)]
struct ManualSchedules {
    next_id: u64,
    active: BTreeMap<u64, ManualSchedule>,
    scheduled_total: usize,
    cancelled_total: usize,
}

/// In-memory tick source that only ticks when told to. Clones share state,
/// so a test can keep one clone while the scheduler owns another.
#[derive(Clone, Default)]
pub struct ManualTickSource {
    inner: Arc<Mutex<ManualSchedules>>,
}

impl ManualTickSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn schedules(&self) -> MutexGuard<'_, ManualSchedules> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn active_count(&self) -> usize {
        self.schedules().active.len()
    }

    pub fn active_periods(&self) -> Vec<Duration> {
        self.schedules().active.values().map(|s| s.period).collect()
    }

    pub fn scheduled_total(&self) -> usize {
        self.schedules().scheduled_total
    }

    pub fn cancelled_total(&self) -> usize {
        self.schedules().cancelled_total
    }

    /// Invokes every active callback once and returns how many ran.
    pub fn fire(&self) -> usize {
        let callbacks: Vec<TickCallback> = self
            .schedules()
            .active
            .values()
            .map(|s| Arc::clone(&s.tick))
            .collect();
        for tick in &callbacks {
            tick();
        }
        callbacks.len()
    }
}

impl TickSource for ManualTickSource {
    type Handle = ManualHandle;

    fn schedule_repeating(&mut self, period: Duration, tick: TickCallback) -> Self::Handle {
        let mut schedules = self.schedules();
        let id = schedules.next_id;
        schedules.next_id += 1;
        schedules.scheduled_total += 1;
        schedules.active.insert(id, ManualSchedule { period, tick });
        ManualHandle(id)
    }

    fn cancel(&mut self, handle: Self::Handle) {
        let mut schedules = self.schedules();
        if schedules.active.remove(&handle.0).is_some() {
            schedules.cancelled_total += 1;
        }
    }
}
