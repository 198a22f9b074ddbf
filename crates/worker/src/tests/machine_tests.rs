use super::*;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use scheduler::ManualTickSource;
use serde_json::json;
use shared::domain::CountRow;

struct Harness {
    machine: WorkerStateMachine<ManualTickSource>,
    source: ManualTickSource,
    ticks: Arc<Mutex<Vec<RunId>>>,
    events: Vec<WorkerEvent>,
}

impl Harness {
    fn new() -> Self {
        Self::with_settings(WorkerSettings::default())
    }

    fn with_settings(settings: WorkerSettings) -> Self {
        let source = ManualTickSource::new();
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let queued = Arc::clone(&ticks);
        let on_tick: OnTick = Arc::new(move |run| queued.lock().expect("ticks").push(run));
        Self {
            machine: WorkerStateMachine::new(&settings, source.clone(), on_tick),
            source,
            ticks,
            events: Vec::new(),
        }
    }

    fn send(&mut self, command: Command) -> Vec<WorkerEvent> {
        self.machine.handle(command, &mut self.events);
        std::mem::take(&mut self.events)
    }

    fn input(&mut self, value: i64) -> Vec<WorkerEvent> {
        self.send(Command::input(value))
    }

    /// Fires the tick source and delivers queued ticks to the machine.
    fn tick(&mut self) -> Vec<WorkerEvent> {
        self.source.fire();
        let queued: Vec<RunId> = std::mem::take(&mut *self.ticks.lock().expect("ticks"));
        for run in queued {
            self.machine.on_tick(run, &mut self.events);
        }
        std::mem::take(&mut self.events)
    }

    fn snapshot(&mut self) -> Snapshot {
        let mut events = self.send(Command::RequestSnapshot);
        assert_eq!(events.len(), 1);
        expect_snapshot(events.remove(0))
    }
}

fn expect_snapshot(event: WorkerEvent) -> Snapshot {
    match event {
        WorkerEvent::Snapshot { payload } => payload,
        other => panic!("expected snapshot, got {other:?}"),
    }
}

#[test]
fn start_emits_an_immediate_running_snapshot() {
    let mut harness = Harness::new();
    let mut events = harness.send(Command::Start);
    assert_eq!(events.len(), 1);
    let snapshot = expect_snapshot(events.remove(0));
    assert!(snapshot.running);
    assert_eq!(snapshot.total_inputs, 0);
    assert!(snapshot.top.is_empty());
    assert_eq!(harness.source.active_periods(), vec![Duration::from_millis(1000)]);
}

#[test]
fn fibonacci_input_raises_alert() {
    let mut harness = Harness::new();
    harness.send(Command::Start);

    let events = harness.input(8);
    assert_eq!(events, vec![WorkerEvent::FibAlert { value: 8.into() }]);
}

#[test]
fn non_fibonacci_input_counts_silently() {
    let mut harness = Harness::new();
    harness.send(Command::Start);

    assert!(harness.input(4).is_empty());
    let snapshot = harness.snapshot();
    assert_eq!(snapshot.total_inputs, 1);
    assert_eq!(snapshot.top, vec![CountRow::new(4, 1)]);
}

#[test]
fn non_integer_input_is_ignored() {
    let mut harness = Harness::new();
    harness.send(Command::Start);

    let events = harness.send(Command::InputNumber {
        value: InputValue::NonInteger("3.14".into()),
    });
    assert!(events.is_empty());
    assert_eq!(harness.snapshot().total_inputs, 0);
}

#[test]
fn large_fibonacci_terms_are_matched_exactly() {
    let mut harness = Harness::new();
    // F(100)
    let term: BigInt = "354224848179261915075".parse().expect("bigint");

    let events = harness.send(Command::input(term.clone()));
    assert_eq!(events, vec![WorkerEvent::FibAlert { value: term.clone() }]);

    let neighbour = term + BigInt::from(1);
    assert!(harness.send(Command::input(neighbour)).is_empty());
    assert_eq!(harness.snapshot().total_inputs, 2);
}

#[test]
fn halt_and_resume_toggle_running() {
    let mut harness = Harness::new();
    harness.send(Command::Start);

    let halted = expect_snapshot(harness.send(Command::Halt).remove(0));
    assert!(!halted.running);
    assert_eq!(harness.source.active_count(), 0);

    let resumed = expect_snapshot(harness.send(Command::Resume).remove(0));
    assert!(resumed.running);
    assert_eq!(harness.source.active_count(), 1);
}

#[test]
fn repeated_start_does_not_double_tick() {
    let mut harness = Harness::new();
    harness.send(Command::Start);
    harness.send(Command::Start);
    harness.send(Command::Resume);

    assert_eq!(harness.source.active_count(), 1);
    assert_eq!(harness.tick().len(), 1);
}

#[test]
fn ticks_emit_snapshots_only_while_running() {
    let mut harness = Harness::new();
    assert!(harness.tick().is_empty());

    harness.send(Command::Start);
    harness.input(5);
    let mut events = harness.tick();
    assert_eq!(events.len(), 1);
    assert_eq!(expect_snapshot(events.remove(0)).total_inputs, 1);

    harness.send(Command::Halt);
    assert!(harness.tick().is_empty());
}

#[test]
fn ticks_queued_before_a_restart_are_dropped() {
    let mut harness = Harness::new();
    harness.send(Command::Start);
    harness.source.fire();
    let stale: Vec<RunId> = std::mem::take(&mut *harness.ticks.lock().expect("ticks"));

    harness.send(Command::SetInterval { ms: 50.0 });
    for run in stale {
        harness.machine.on_tick(run, &mut harness.events);
    }
    assert!(harness.events.is_empty());
    assert_eq!(harness.tick().len(), 1);
}

#[test]
fn set_interval_reports_snapshot_and_applies_period() {
    let mut harness = Harness::new();
    harness.send(Command::Start);

    let events = harness.send(Command::SetInterval { ms: 2500.7 });
    assert_eq!(events.len(), 1);
    assert!(expect_snapshot(events.into_iter().next().expect("event")).running);
    assert_eq!(harness.machine.interval_ms(), 2500);
    assert_eq!(harness.source.active_periods(), vec![Duration::from_millis(2500)]);

    harness.send(Command::SetInterval { ms: f64::NAN });
    assert_eq!(harness.machine.interval_ms(), 2500);
}

#[test]
fn quit_reports_final_totals_before_clearing() {
    let mut harness = Harness::new();
    harness.send(Command::Start);
    for v in [4, 8, 4] {
        harness.input(v);
    }

    let events = harness.send(Command::Quit);
    assert_eq!(events.len(), 2);
    let last = expect_snapshot(events[0].clone());
    assert!(!last.running);
    assert_eq!(last.total_inputs, 3);
    assert_eq!(last.top, vec![CountRow::new(4, 2), CountRow::new(8, 1)]);
    assert_eq!(events[1], WorkerEvent::QuitAck);

    let after = harness.snapshot();
    assert_eq!(after.total_inputs, 0);
    assert!(after.top.is_empty());
    assert!(!after.running);
    assert_eq!(harness.source.active_count(), 0);
}

#[test]
fn unknown_wire_command_fails_without_effects() {
    let mut harness = Harness::new();
    harness.send(Command::Start);
    harness.input(4);

    let err = harness
        .machine
        .handle_wire(&json!({ "type": "EXPLODE" }), &mut harness.events)
        .expect_err("unhandled");
    assert_eq!(err, WorkerError::UnhandledCommand("EXPLODE".into()));

    let err = harness
        .machine
        .handle_wire(&json!({ "type": false }), &mut harness.events)
        .expect_err("unhandled");
    assert_eq!(err.to_string(), "unhandled worker command: unknown");

    assert!(harness.events.is_empty());
    assert_eq!(harness.machine.counter().total(), 1);
    assert!(harness.machine.running());
}

#[test]
fn wire_commands_dispatch_like_typed_commands() {
    let mut harness = Harness::new();
    harness
        .machine
        .handle_wire(&json!({ "type": "INPUT_NUMBER", "value": "13" }), &mut harness.events)
        .expect("dispatch");
    assert_eq!(
        std::mem::take(&mut harness.events),
        vec![WorkerEvent::FibAlert { value: 13.into() }]
    );

    harness
        .machine
        .handle_wire(&json!({ "type": "INPUT_NUMBER", "value": 2.5 }), &mut harness.events)
        .expect("dispatch");
    assert!(harness.events.is_empty());
    assert_eq!(harness.machine.counter().total(), 1);
}

#[test]
fn wire_integers_beyond_64_bits_are_counted() {
    let mut harness = Harness::new();
    // F(100) and its successor as bare JSON numbers.
    for literal in ["354224848179261915075", "354224848179261915076"] {
        let message: serde_json::Value = serde_json::from_str(&format!(
            r#"{{ "type": "INPUT_NUMBER", "value": {literal} }}"#
        ))
        .expect("json");
        harness
            .machine
            .handle_wire(&message, &mut harness.events)
            .expect("dispatch");
    }

    assert_eq!(
        std::mem::take(&mut harness.events),
        vec![WorkerEvent::FibAlert {
            value: "354224848179261915075".parse().expect("bigint")
        }]
    );
    assert_eq!(harness.machine.counter().total(), 2);
}

#[test]
fn configured_snapshot_limit_truncates_top_rows() {
    let mut harness = Harness::with_settings(WorkerSettings {
        snapshot_limit: Some(2),
        ..WorkerSettings::default()
    });
    for v in [7, 7, 7, 6, 6, 9] {
        harness.input(v);
    }

    let snapshot = harness.snapshot();
    assert_eq!(snapshot.total_inputs, 6);
    assert_eq!(snapshot.top, vec![CountRow::new(7, 3), CountRow::new(6, 2)]);
}

#[test]
fn fibonacci_depth_follows_settings() {
    let mut harness = Harness::with_settings(WorkerSettings {
        fibonacci_terms: 5,
        ..WorkerSettings::default()
    });
    assert_eq!(harness.input(3).len(), 1);
    assert!(harness.input(5).is_empty());
}
