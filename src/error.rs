use std::path::PathBuf;
use thiserror::Error;

/// Construction-time validation failures for a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} path is empty")]
    EmptyPath(&'static str),
    #[error("listen port must be a non-zero TCP port")]
    InvalidPort,
}

/// A progress line that does not match the wire grammar.
///
/// Non-fatal: the offending packet is reported through the status history and
/// the stream continues, since subsequent lines are independent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed progress line: {line:?}")]
pub struct ProtocolError {
    pub line: String,
}

/// Errors reading or decoding the authoritative result file.
#[derive(Debug, Error)]
pub enum ScoreFileError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Fatal run-level failures, surfaced through both the run future and a
/// terminal `error` status record.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("run already started")]
    AlreadyStarted,
    #[error("failed to bind progress listener on port {port}")]
    Listen {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to spawn scoring process {runner:?}")]
    Spawn {
        runner: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed waiting on scoring process")]
    Wait(#[source] std::io::Error),
    #[error("scoring process exited with code {0}")]
    Exit(i32),
    #[error("scoring process terminated by signal {0}")]
    Signal(i32),
    #[error("run canceled")]
    Canceled,
    #[error("failed to read score file {path:?}")]
    ScoreFile {
        path: PathBuf,
        #[source]
        source: ScoreFileError,
    },
    #[error("run task failed: {0}")]
    Task(String),
}
