use std::{fs, path::Path};

use tally::{DEFAULT_FIBONACCI_TERMS, MAX_FIBONACCI_TERMS};
use tracing::warn;

use crate::machine::DEFAULT_SNAPSHOT_INTERVAL_MS;

pub const DEFAULT_CONFIG_FILE: &str = "counter.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    pub snapshot_interval_ms: u64,
    /// At most [`MAX_FIBONACCI_TERMS`]; larger configured values are rejected.
    pub fibonacci_terms: usize,
    /// Maximum rows per snapshot; `None` ranks every distinct value.
    pub snapshot_limit: Option<usize>,
    pub inbox_capacity: usize,
    pub log_filter: String,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            snapshot_interval_ms: DEFAULT_SNAPSHOT_INTERVAL_MS,
            fibonacci_terms: DEFAULT_FIBONACCI_TERMS,
            snapshot_limit: None,
            inbox_capacity: 256,
            log_filter: "info".into(),
        }
    }
}

pub fn load_settings() -> WorkerSettings {
    load_settings_from(Path::new(DEFAULT_CONFIG_FILE))
}

/// Defaults, then `path` if it exists and parses, then environment overrides.
pub fn load_settings_from(path: &Path) -> WorkerSettings {
    let mut settings = WorkerSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        settings.apply_file(&raw);
    }
    settings.apply_env(|key| std::env::var(key).ok());

    settings
}

impl WorkerSettings {
    pub fn apply_file(&mut self, raw: &str) {
        let Ok(table) = toml::from_str::<toml::Table>(raw) else {
            return;
        };
        self.apply(|key| table.get(key).and_then(toml_to_string));
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("RUST_LOG") {
            self.log_filter = v;
        }
        self.apply(|key| lookup(&format!("APP__{}", key.to_ascii_uppercase())));
    }

    fn apply(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("snapshot_interval_ms").and_then(|v| v.parse().ok()) {
            self.snapshot_interval_ms = v;
        }
        if let Some(v) = lookup("fibonacci_terms").and_then(|v| v.parse::<usize>().ok()) {
            if v <= MAX_FIBONACCI_TERMS {
                self.fibonacci_terms = v;
            } else {
                warn!(
                    requested = v,
                    max = MAX_FIBONACCI_TERMS,
                    "ignoring fibonacci_terms above limit"
                );
            }
        }
        if let Some(v) = lookup("snapshot_limit").and_then(|v| v.parse().ok()) {
            self.snapshot_limit = Some(v);
        }
        if let Some(v) = lookup("inbox_capacity").and_then(|v| v.parse().ok()) {
            if v > 0 {
                self.inbox_capacity = v;
            }
        }
        if let Some(v) = lookup("log_filter") {
            self.log_filter = v;
        }
    }
}

fn toml_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}
