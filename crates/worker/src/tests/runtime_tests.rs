use super::*;

use std::time::Duration;

use serde_json::json;
use shared::protocol::Snapshot;

fn settings() -> WorkerSettings {
    WorkerSettings::default()
}

async fn next_event(runtime: &mut WorkerRuntime) -> WorkerEvent {
    runtime.events.recv().await.expect("worker event")
}

async fn next_snapshot(runtime: &mut WorkerRuntime) -> Snapshot {
    match next_event(runtime).await {
        WorkerEvent::Snapshot { payload } => payload,
        other => panic!("expected snapshot, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn start_then_fibonacci_input_alerts() {
    let mut runtime = spawn_worker(&settings());
    runtime.handle.send(Command::Start).await.expect("send");
    assert!(next_snapshot(&mut runtime).await.running);

    runtime.handle.send(Command::input(8)).await.expect("send");
    assert_eq!(
        next_event(&mut runtime).await,
        WorkerEvent::FibAlert { value: 8.into() }
    );
}

#[tokio::test(start_paused = true)]
async fn running_worker_publishes_periodic_snapshots() {
    let mut runtime = spawn_worker(&settings());
    runtime.handle.send(Command::Start).await.expect("send");
    next_snapshot(&mut runtime).await;

    runtime.handle.send(Command::input(4)).await.expect("send");
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let mut periodic = Vec::new();
    while let Ok(event) = runtime.events.try_recv() {
        periodic.push(event);
    }
    assert_eq!(periodic.len(), 2);
    for event in periodic {
        match event {
            WorkerEvent::Snapshot { payload } => assert_eq!(payload.total_inputs, 1),
            other => panic!("unexpected {other:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn halted_worker_stops_publishing() {
    let mut runtime = spawn_worker(&settings());
    runtime.handle.send(Command::Start).await.expect("send");
    runtime.handle.send(Command::Halt).await.expect("send");
    assert!(next_snapshot(&mut runtime).await.running);
    assert!(!next_snapshot(&mut runtime).await.running);

    tokio::time::sleep(Duration::from_millis(5000)).await;
    assert!(runtime.events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn quit_sequence_is_ordered_and_clears_state() {
    let mut runtime = spawn_worker(&settings());
    runtime.handle.send(Command::Start).await.expect("send");
    runtime.handle.send(Command::input(4)).await.expect("send");
    runtime.handle.send(Command::input(4)).await.expect("send");
    runtime.handle.send(Command::Quit).await.expect("send");

    next_snapshot(&mut runtime).await;
    let last = next_snapshot(&mut runtime).await;
    assert!(!last.running);
    assert_eq!(last.total_inputs, 2);
    assert_eq!(next_event(&mut runtime).await, WorkerEvent::QuitAck);

    runtime
        .handle
        .send(Command::RequestSnapshot)
        .await
        .expect("send");
    let after = next_snapshot(&mut runtime).await;
    assert_eq!(after.total_inputs, 0);
    assert!(after.top.is_empty());
}

#[tokio::test(start_paused = true)]
async fn unhandled_wire_command_ends_the_session() {
    let mut runtime = spawn_worker(&settings());
    runtime
        .handle
        .send_wire(json!({ "type": "START" }))
        .await
        .expect("send");
    next_snapshot(&mut runtime).await;

    runtime
        .handle
        .send_wire(json!({ "type": "SELF_DESTRUCT" }))
        .await
        .expect("send");

    let outcome = runtime.task.await.expect("join");
    assert_eq!(
        outcome,
        Err(WorkerError::UnhandledCommand("SELF_DESTRUCT".into()))
    );
    assert_eq!(
        runtime.handle.send(Command::RequestSnapshot).await,
        Err(WorkerError::Closed)
    );
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_stops_a_running_worker() {
    let mut runtime = spawn_worker(&settings());
    runtime.handle.send(Command::Start).await.expect("send");
    next_snapshot(&mut runtime).await;

    let WorkerRuntime { handle, task, .. } = runtime;
    drop(handle);
    assert_eq!(task.await.expect("join"), Ok(()));
}
