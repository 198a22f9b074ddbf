use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use shared::protocol::{Command, WorkerEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use worker::{
    config::{load_settings, load_settings_from},
    spawn_worker, WorkerRuntime,
};

mod input;
mod render;

use input::{normalize_interval_secs, parse_line, ControllerAction, HELP};
use render::ConsoleView;

#[derive(Parser, Debug)]
#[command(about = "Counts integers and flags Fibonacci numbers")]
struct Args {
    /// Settings file; defaults to ./counter.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Read JSON commands from stdin and print JSON events.
    #[arg(long)]
    json: bool,
    /// Initial snapshot period in seconds.
    #[arg(long)]
    interval_secs: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => load_settings_from(path),
        None => load_settings(),
    };

    let filter = EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    debug!(?settings, "loaded settings");

    let runtime = spawn_worker(&settings);
    if args.json {
        run_json(runtime).await
    } else {
        run_interactive(runtime, args.interval_secs).await
    }
}

async fn run_interactive(mut runtime: WorkerRuntime, interval_secs: Option<String>) -> Result<()> {
    let mut view = ConsoleView::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    runtime.handle.send(Command::Start).await?;
    if let Some(raw) = interval_secs {
        let update = normalize_interval_secs(&raw);
        if update.adjusted {
            println!("Interval adjusted to {} s", update.secs);
        }
        runtime
            .handle
            .send(Command::SetInterval {
                ms: update.ms() as f64,
            })
            .await?;
    }
    println!("{HELP}");

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line.context("failed to read stdin")? {
                    Some(line) => match parse_line(&line) {
                        ControllerAction::Send(command) => {
                            debug!(command = command.tag(), "queued console command");
                            runtime.handle.send(command).await?;
                        }
                        ControllerAction::Invalid(message) => println!("{message}"),
                        ControllerAction::Help => println!("{HELP}"),
                        ControllerAction::Nothing => {}
                    },
                    None => {
                        stdin_open = false;
                        runtime.handle.send(Command::Quit).await?;
                    }
                }
            }
            event = runtime.events.recv() => {
                let Some(event) = event else { break };
                debug!(event = event.tag(), "worker event");
                let quit = matches!(event, WorkerEvent::QuitAck);
                println!("{}", view.apply(event));
                if quit {
                    break;
                }
            }
        }
    }

    shutdown(runtime).await
}

async fn run_json(runtime: WorkerRuntime) -> Result<()> {
    let WorkerRuntime {
        handle,
        mut events,
        task,
    } = runtime;
    let mut handle = Some(handle);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line(), if handle.is_some() => {
                match line.context("failed to read stdin")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => {
                        let message: Value = serde_json::from_str(&line)
                            .with_context(|| format!("malformed command line: {line}"))?;
                        let Some(sender) = &handle else { continue };
                        if sender.send_wire(message).await.is_err() {
                            handle = None;
                        }
                    }
                    // Dropping the last handle lets the worker drain and exit.
                    None => handle = None,
                }
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                debug!(event = event.tag(), "worker event");
                println!("{}", serde_json::to_string(&event).context("failed to encode event")?);
            }
        }
    }

    drop(handle);
    task.await.context("counter worker task failed")??;
    info!("counter worker finished");
    Ok(())
}

async fn shutdown(runtime: WorkerRuntime) -> Result<()> {
    let WorkerRuntime { handle, task, .. } = runtime;
    drop(handle);
    task.await.context("counter worker task failed")??;
    info!("counter worker finished");
    Ok(())
}
