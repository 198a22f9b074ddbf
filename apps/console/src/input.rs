//! Turns typed console lines into worker commands.

use shared::{domain::parse_integer_literal, protocol::Command};

pub const INVALID_INTEGER: &str = "Please enter an integer (no decimals or letters).";

pub const HELP: &str = "\
Enter an integer to count it, or one of:
  halt              pause periodic snapshots
  resume            resume periodic snapshots
  refresh           request a snapshot now
  interval <secs>   change the snapshot period (whole seconds, minimum 1)
  quit              print the final table and exit";

#[derive(Debug, PartialEq)]
pub enum ControllerAction {
    Send(Command),
    Invalid(&'static str),
    Help,
    Nothing,
}

pub fn parse_line(line: &str) -> ControllerAction {
    let line = line.trim();
    if line.is_empty() {
        return ControllerAction::Nothing;
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "halt" => ControllerAction::Send(Command::Halt),
        "resume" => ControllerAction::Send(Command::Resume),
        "refresh" => ControllerAction::Send(Command::RequestSnapshot),
        "quit" | "exit" => ControllerAction::Send(Command::Quit),
        "help" | "?" => ControllerAction::Help,
        "interval" => {
            let update = normalize_interval_secs(rest);
            ControllerAction::Send(Command::SetInterval {
                ms: update.ms() as f64,
            })
        }
        _ => match parse_integer_literal(line) {
            Some(value) => ControllerAction::Send(Command::input(value)),
            None => ControllerAction::Invalid(INVALID_INTEGER),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalUpdate {
    pub secs: u64,
    /// The typed text was not already a clean whole number of seconds.
    pub adjusted: bool,
}

impl IntervalUpdate {
    pub fn ms(self) -> u64 {
        self.secs.saturating_mul(1000)
    }
}

/// Whitespace is stripped; anything non-finite or below one second becomes
/// one second, fractions are floored.
pub fn normalize_interval_secs(raw: &str) -> IntervalUpdate {
    let sanitized: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let parsed = sanitized.parse::<f64>().unwrap_or(f64::NAN);

    if !parsed.is_finite() || parsed < 1.0 {
        return IntervalUpdate {
            secs: 1,
            adjusted: true,
        };
    }

    let secs = parsed.floor();
    IntervalUpdate {
        secs: secs as u64,
        adjusted: secs != parsed || sanitized != raw,
    }
}
