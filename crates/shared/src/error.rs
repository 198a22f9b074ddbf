use thiserror::Error;

/// Tag reported when a command's `type` field is missing or not a string.
pub const UNKNOWN_COMMAND_TAG: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    /// The controller sent a command the worker does not understand. This
    /// signals a protocol mismatch and ends the session.
    #[error("unhandled worker command: {0}")]
    UnhandledCommand(String),
    #[error("worker is no longer running")]
    Closed,
}

impl WorkerError {
    pub fn unknown_command() -> Self {
        Self::UnhandledCommand(UNKNOWN_COMMAND_TAG.to_string())
    }
}
