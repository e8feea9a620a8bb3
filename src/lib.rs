//! Orchestrator for external frame-scoring runs.
//!
//! Spawns a scoring tool as a child process, receives its newline-delimited
//! progress protocol over a loopback TCP connection, keeps an append-only
//! status history with derived throughput/ETA metrics, and exposes
//! pause/resume/cancel control. One [`ScoreRun`] models exactly one run;
//! instantiate several for concurrent runs.

pub mod arguments;
pub mod cli;
pub mod error;
pub mod history;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod protocol;
pub mod scores;

pub use error::{ConfigError, ProtocolError, RunError};
pub use history::{StatusHistory, SubscriberId};
pub use model::{
    FrameImporter, ParsedPacket, RunConfig, ScoreFile, ScoreMethod, Status, StatusRecord,
};
pub use orchestrator::{RunHandle, ScoreRun};
