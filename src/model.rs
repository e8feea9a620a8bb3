use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// Scoring method passed to the external tool via `--method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMethod {
    V1,
    V2,
    V2Zig,
}

impl ScoreMethod {
    /// Wire word as the tool expects it on the command line.
    pub fn as_arg_str(self) -> &'static str {
        match self {
            ScoreMethod::V1 => "v1",
            ScoreMethod::V2 => "v2",
            ScoreMethod::V2Zig => "v2_zig",
        }
    }
}

impl fmt::Display for ScoreMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg_str())
    }
}

impl FromStr for ScoreMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v1" => Ok(ScoreMethod::V1),
            "v2" => Ok(ScoreMethod::V2),
            "v2_zig" => Ok(ScoreMethod::V2Zig),
            other => Err(format!(
                "unknown method '{other}' (expected one of: v1, v2, v2_zig)"
            )),
        }
    }
}

/// Frame importer the external tool should use to decode video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameImporter {
    Dgdecnv,
    Bestsource,
    Lsmash,
    Ffms2,
}

impl FrameImporter {
    pub fn as_arg_str(self) -> &'static str {
        match self {
            FrameImporter::Dgdecnv => "dgdecnv",
            FrameImporter::Bestsource => "bestsource",
            FrameImporter::Lsmash => "lsmash",
            FrameImporter::Ffms2 => "ffms2",
        }
    }
}

impl fmt::Display for FrameImporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg_str())
    }
}

impl FromStr for FrameImporter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dgdecnv" => Ok(FrameImporter::Dgdecnv),
            "bestsource" => Ok(FrameImporter::Bestsource),
            "lsmash" => Ok(FrameImporter::Lsmash),
            "ffms2" => Ok(FrameImporter::Ffms2),
            other => Err(format!(
                "unknown importer '{other}' (expected one of: dgdecnv, bestsource, lsmash, ffms2)"
            )),
        }
    }
}

/// Immutable configuration for one scoring run, supplied at construction.
///
/// The caller is responsible for semantic correctness of the paths and for
/// resolving `runner` (the interpreter or binary that executes `tool`); the
/// orchestrator only validates presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Interpreter or binary that executes the scoring tool.
    pub runner: PathBuf,
    /// Entry point of the scoring tool itself, first element of the argv tail.
    pub tool: PathBuf,
    pub source: PathBuf,
    pub encoded: PathBuf,
    /// Where the tool writes the authoritative `{"scores": [...]}` document.
    pub scores_output: PathBuf,
    #[serde(default)]
    pub method: Option<ScoreMethod>,
    #[serde(default)]
    pub importer: Option<FrameImporter>,
    #[serde(default)]
    pub source_importer: Option<FrameImporter>,
    #[serde(default)]
    pub encoded_importer: Option<FrameImporter>,
    #[serde(default)]
    pub threads: Option<u32>,
    /// Width/height pair; emitted together or not at all.
    #[serde(default)]
    pub dimensions: Option<(u32, u32)>,
    /// Score every Nth frame only.
    #[serde(default)]
    pub every: Option<u32>,
    #[serde(default)]
    pub progress: bool,
    /// Loopback port the tool streams progress to.
    pub port: u16,
}

impl RunConfig {
    pub const DEFAULT_PORT: u16 = 3000;

    /// Presence validation only; semantic path checks are the caller's job.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, path) in [
            ("runner", &self.runner),
            ("tool", &self.tool),
            ("source", &self.source),
            ("encoded", &self.encoded),
            ("scores output", &self.scores_output),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::EmptyPath(name));
            }
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        Ok(())
    }
}

/// Lifecycle state of a run, as recorded in the status history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Idle,
    Paused,
    Running,
    Connected,
    Done,
    Disconnected,
    Canceled,
    Error,
}

impl Status {
    /// `done`, `error` and `canceled` admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Done | Status::Error | Status::Canceled)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Status::Idle => "idle",
            Status::Paused => "paused",
            Status::Running => "running",
            Status::Connected => "connected",
            Status::Done => "done",
            Status::Disconnected => "disconnected",
            Status::Canceled => "canceled",
            Status::Error => "error",
        };
        f.write_str(word)
    }
}

/// One timestamped entry in a run's status history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: time::OffsetDateTime,
    pub status: Status,
    #[serde(default)]
    pub frame: Option<u64>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One parsed line of the streaming progress protocol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedPacket {
    pub frame: u64,
    pub total_frames: u64,
    pub score: f64,
}

/// Shape of the authoritative result file the tool writes on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreFile {
    pub scores: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RunConfig {
        RunConfig {
            runner: "python3".into(),
            tool: "score.py".into(),
            source: "a.mkv".into(),
            encoded: "b.mkv".into(),
            scores_output: "s.json".into(),
            method: None,
            importer: None,
            source_importer: None,
            encoded_importer: None,
            threads: None,
            dimensions: None,
            every: None,
            progress: false,
            port: RunConfig::DEFAULT_PORT,
        }
    }

    #[test]
    fn validate_accepts_complete_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_paths_and_zero_port() {
        let mut cfg = config();
        cfg.encoded = PathBuf::new();
        assert!(matches!(cfg.validate(), Err(ConfigError::EmptyPath("encoded"))));

        let mut cfg = config();
        cfg.port = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidPort)));
    }

    #[test]
    fn enums_round_trip_their_wire_words() {
        for m in [ScoreMethod::V1, ScoreMethod::V2, ScoreMethod::V2Zig] {
            assert_eq!(m.as_arg_str().parse::<ScoreMethod>().unwrap(), m);
        }
        for i in [
            FrameImporter::Dgdecnv,
            FrameImporter::Bestsource,
            FrameImporter::Lsmash,
            FrameImporter::Ffms2,
        ] {
            assert_eq!(i.as_arg_str().parse::<FrameImporter>().unwrap(), i);
        }
        assert!("vmaf".parse::<ScoreMethod>().is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(Status::Done.is_terminal());
        assert!(Status::Error.is_terminal());
        assert!(Status::Canceled.is_terminal());
        assert!(!Status::Running.is_terminal());
        assert!(!Status::Disconnected.is_terminal());
    }
}
