//! Text rendering of worker events.

use chrono::Local;
use shared::{
    domain::CountRow,
    protocol::{Snapshot, WorkerEvent},
};

/// Keeps the latest snapshot so the farewell message can show the final
/// table after the worker has cleared its state.
#[derive(Debug, Default)]
pub struct ConsoleView {
    last_snapshot: Option<Snapshot>,
}

impl ConsoleView {
    pub fn apply(&mut self, event: WorkerEvent) -> String {
        match event {
            WorkerEvent::Snapshot { payload } => {
                let text = render_snapshot(&payload);
                self.last_snapshot = Some(payload);
                text
            }
            WorkerEvent::FibAlert { value } => format!("FIB: {value}"),
            WorkerEvent::QuitAck => {
                let rows = self
                    .last_snapshot
                    .as_ref()
                    .map(|s| s.top.as_slice())
                    .unwrap_or_default();
                format!(
                    "Farewell! Here are the numbers you entered and their frequencies:\n{}",
                    render_rows(rows)
                )
            }
        }
    }
}

pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let status = if snapshot.running { "Running" } else { "Halted" };
    let updated = snapshot.last_updated.with_timezone(&Local).format("%H:%M:%S");
    format!(
        "Status: {status} · Total inputs: {} · Last update: {updated}\n{}",
        snapshot.total_inputs,
        render_rows(&snapshot.top)
    )
}

pub fn render_rows(rows: &[CountRow]) -> String {
    if rows.is_empty() {
        return "  (no numbers yet)".to_string();
    }

    let width = rows
        .iter()
        .map(|row| row.value.to_string().len())
        .max()
        .unwrap_or(0)
        .max("value".len());
    let mut out = format!("  {:>width$}  count", "value");
    for row in rows {
        out.push_str(&format!("\n  {:>width$}  {}", row.value.to_string(), row.count));
    }
    out
}
