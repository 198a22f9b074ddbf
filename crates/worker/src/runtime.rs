//! Async host for the worker: one task owns the state machine and drains a
//! single inbox shared by commands, raw wire messages and scheduler ticks.

use std::sync::Arc;

use scheduler::{OnTick, RunId, TokioTickSource};
use serde_json::Value;
use shared::{
    error::WorkerError,
    protocol::{Command, WorkerEvent},
};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::{config::WorkerSettings, machine::WorkerStateMachine};

enum Inbound {
    Command(Command),
    Wire(Value),
    Tick(RunId),
}

/// Controller-side handle. Cloning is cheap; the worker task exits once the
/// last handle is dropped.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<Inbound>,
}

impl WorkerHandle {
    pub async fn send(&self, command: Command) -> Result<(), WorkerError> {
        self.tx
            .send(Inbound::Command(command))
            .await
            .map_err(|_| WorkerError::Closed)
    }

    /// Queues an undecoded message; the worker validates its tag.
    pub async fn send_wire(&self, message: Value) -> Result<(), WorkerError> {
        self.tx
            .send(Inbound::Wire(message))
            .await
            .map_err(|_| WorkerError::Closed)
    }
}

pub struct WorkerRuntime {
    pub handle: WorkerHandle,
    pub events: mpsc::UnboundedReceiver<WorkerEvent>,
    /// Resolves with `Err(UnhandledCommand)` if the controller sent a command
    /// the worker does not understand.
    pub task: JoinHandle<Result<(), WorkerError>>,
}

/// Spawns the worker on the current tokio runtime.
pub fn spawn_worker(settings: &WorkerSettings) -> WorkerRuntime {
    let (tx, inbox) = mpsc::channel(settings.inbox_capacity.max(1));
    let (events_tx, events) = mpsc::unbounded_channel();

    let ticks = tx.downgrade();
    let on_tick: OnTick = Arc::new(move |run| {
        let Some(tx) = ticks.upgrade() else {
            return;
        };
        if let Err(TrySendError::Full(_)) = tx.try_send(Inbound::Tick(run)) {
            warn!("worker inbox full; dropping scheduler tick");
        }
    });

    let settings = settings.clone();
    let task = tokio::spawn(async move {
        let machine = WorkerStateMachine::new(&settings, TokioTickSource, on_tick);
        run(machine, inbox, events_tx).await
    });

    WorkerRuntime {
        handle: WorkerHandle { tx },
        events,
        task,
    }
}

async fn run(
    mut machine: WorkerStateMachine<TokioTickSource>,
    mut inbox: mpsc::Receiver<Inbound>,
    mut events: mpsc::UnboundedSender<WorkerEvent>,
) -> Result<(), WorkerError> {
    while let Some(message) = inbox.recv().await {
        match message {
            Inbound::Command(command) => machine.handle(command, &mut events),
            Inbound::Wire(raw) => machine.handle_wire(&raw, &mut events)?,
            Inbound::Tick(run) => machine.on_tick(run, &mut events),
        }
    }

    info!("all worker handles dropped; counter worker exiting");
    Ok(())
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
