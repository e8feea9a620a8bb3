//! Process supervisor: spawns the scoring tool, wires the progress listener
//! to its lifecycle, and resolves one logical run outcome.

use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{listener, process};
use crate::arguments::build_arguments;
use crate::error::{ConfigError, RunError};
use crate::history::{StatusHistory, SubscriberId};
use crate::metrics;
use crate::model::{ParsedPacket, RunConfig, ScoreFile, Status, StatusRecord};
use crate::scores::ScoreStore;

/// How long the listener gets to record the disconnect after the child dies.
const LISTENER_GRACE: std::time::Duration = std::time::Duration::from_millis(250);

struct RunState {
    history: StatusHistory,
    scores: ScoreStore,
    started: bool,
    exited: bool,
    canceled: bool,
    /// Run reached `done`, `error` or `canceled` through the supervisor.
    /// Per-packet `error` report records never set this, so a malformed
    /// progress line cannot disable the control surface of a live run.
    terminal: bool,
    paused: bool,
    child_pid: Option<u32>,
}

/// State shared between the supervisor, the listener task and control calls.
///
/// One mutex serializes every mutation of the history and the score store;
/// the packet path and the exit path can race at process end, and consumers
/// must observe appends in the exact order they happened.
pub(crate) struct RunShared {
    state: Mutex<RunState>,
}

impl RunShared {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(RunState {
                history: StatusHistory::new(),
                scores: ScoreStore::new(),
                started: false,
                exited: false,
                canceled: false,
                terminal: false,
                paused: false,
                child_pid: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().expect("run state lock poisoned")
    }

    pub(crate) fn append(
        &self,
        status: Status,
        frame: Option<u64>,
        score: Option<f64>,
        error: Option<String>,
    ) {
        self.lock().history.append(status, frame, score, error);
    }

    /// Apply one parsed packet: raise the frame total, record the streamed
    /// score, append a scored `running` status. All under one lock so the
    /// three effects are observed atomically.
    pub(crate) fn handle_packet(&self, packet: &ParsedPacket) {
        let mut st = self.lock();
        st.scores.observe_total(packet.total_frames);
        st.scores.push(packet.score);
        st.history
            .append(Status::Running, Some(packet.frame), Some(packet.score), None);
    }

    fn fail(&self, error: &RunError) {
        let mut st = self.lock();
        st.terminal = true;
        st.history
            .append(Status::Error, None, None, Some(error.to_string()));
    }

    fn finish(&self, scores: Vec<f64>) {
        let mut st = self.lock();
        st.terminal = true;
        st.scores.replace_with_final(scores);
        st.history.append(Status::Done, None, None, None);
    }

    fn set_pid(&self, pid: Option<u32>) {
        self.lock().child_pid = pid;
    }

    fn mark_exited(&self) {
        self.lock().exited = true;
    }

    fn was_canceled(&self) -> bool {
        self.lock().canceled
    }

    pub(crate) fn history_snapshot(&self) -> Vec<StatusRecord> {
        self.lock().history.all().to_vec()
    }

    pub(crate) fn scores_snapshot(&self) -> Vec<f64> {
        self.lock().scores.as_slice().to_vec()
    }

    pub(crate) fn total_frames(&self) -> u64 {
        self.lock().scores.total_frames()
    }
}

/// One orchestrated scoring run.
///
/// Models exactly one execution of the external tool; callers wanting
/// concurrent runs instantiate one `ScoreRun` per run. Control calls are
/// synchronous and fire-and-forget; the run outcome is awaited through the
/// [`RunHandle`] returned by [`ScoreRun::start`].
pub struct ScoreRun {
    cfg: RunConfig,
    shared: Arc<RunShared>,
}

impl ScoreRun {
    /// Validates presence of the configured paths and the port, and seeds the
    /// history with its initial `idle` record.
    pub fn new(cfg: RunConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            shared: Arc::new(RunShared::new()),
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.cfg
    }

    /// Launch the run: bind the progress listener, spawn the tool, supervise
    /// until exit. Returns immediately; bind and spawn failures, like every
    /// other run failure, reject through [`RunHandle::wait`].
    pub fn start(&self) -> Result<RunHandle, RunError> {
        {
            let mut st = self.shared.lock();
            if st.started {
                return Err(RunError::AlreadyStarted);
            }
            st.started = true;
        }
        let cfg = self.cfg.clone();
        let shared = self.shared.clone();
        Ok(RunHandle {
            task: tokio::spawn(drive(cfg, shared)),
        })
    }

    /// Suspend the scoring process and record `paused`. Warns and leaves the
    /// history untouched when there is nothing to pause. Preconditions read
    /// supervisor liveness, not the last history record, so per-packet
    /// `error` reports never get in the way.
    pub fn pause(&self) {
        let mut st = self.shared.lock();
        if !st.started {
            warn!("pause requested before start, ignoring");
            return;
        }
        if st.exited || st.terminal {
            warn!("pause requested after the run finished, ignoring");
            return;
        }
        if st.paused {
            warn!("pause requested while already paused, ignoring");
            return;
        }
        let Some(pid) = st.child_pid else {
            warn!("pause requested before the scoring process spawned, ignoring");
            return;
        };
        match process::suspend(pid) {
            Ok(()) => {
                st.paused = true;
                st.history.append(Status::Paused, None, None, None);
            }
            Err(e) => warn!(error = %e, "failed to suspend scoring process"),
        }
    }

    /// Continue a suspended scoring process and record `running`. When called
    /// before `start()` on an idle run, delegates to `start()` and detaches
    /// the run; its outcome stays observable through the status history.
    pub fn resume(&self) {
        let mut st = self.shared.lock();
        if !st.started {
            if st.history.current().status == Status::Idle {
                drop(st);
                debug!("resume before start, delegating to start");
                match self.start() {
                    Ok(handle) => handle.detach(),
                    Err(e) => warn!(error = %e, "deferred start from resume failed"),
                }
            } else {
                warn!("resume requested before start, ignoring");
            }
            return;
        }
        if st.exited || st.terminal {
            warn!("resume requested after the run finished, ignoring");
            return;
        }
        if !st.paused {
            warn!("resume requested while not paused, ignoring");
            return;
        }
        let Some(pid) = st.child_pid else {
            warn!("resume requested with no scoring process, ignoring");
            return;
        };
        match process::resume(pid) {
            Ok(()) => {
                st.paused = false;
                st.history.append(Status::Running, None, None, None);
            }
            Err(e) => warn!(error = %e, "failed to continue scoring process"),
        }
    }

    /// Forcibly terminate the run. The `canceled` terminal is appended
    /// immediately; OS-level process death is confirmed later by the exit
    /// handler, which appends nothing further. Applies only to a live run
    /// (spawned, not exited, not in a supervisor terminal); idempotent
    /// everywhere else, and unaffected by per-packet `error` reports.
    pub fn cancel(&self) {
        let mut st = self.shared.lock();
        if !st.started {
            warn!("cancel requested before start, ignoring");
            return;
        }
        if st.exited {
            warn!("cancel requested after the scoring process exited, ignoring");
            return;
        }
        if st.terminal {
            warn!("cancel requested in a terminal state, ignoring");
            return;
        }
        let Some(pid) = st.child_pid else {
            warn!("cancel requested before the scoring process spawned, ignoring");
            return;
        };
        st.canceled = true;
        st.terminal = true;
        st.history.append(Status::Canceled, None, None, None);
        if let Err(e) = process::terminate(pid) {
            warn!(error = %e, "failed to kill scoring process");
        }
    }

    /// Register an observer invoked synchronously on every status append, in
    /// registration order. Observers must not call back into this run.
    pub fn subscribe(&self, observer: impl Fn(&StatusRecord) + Send + 'static) -> SubscriberId {
        self.shared.lock().history.subscribe(Box::new(observer))
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.shared.lock().history.unsubscribe(id)
    }

    pub fn current(&self) -> StatusRecord {
        self.shared.lock().history.current().clone()
    }

    pub fn history(&self) -> Vec<StatusRecord> {
        self.shared.history_snapshot()
    }

    /// Streamed preview during the run; the authoritative file contents after
    /// a successful exit.
    pub fn scores(&self) -> Vec<f64> {
        self.shared.scores_snapshot()
    }

    pub fn total_frames(&self) -> u64 {
        self.shared.total_frames()
    }

    /// Frames per second; possibly non-finite, see [`metrics::throughput`].
    pub fn throughput(&self) -> f64 {
        let st = self.shared.lock();
        metrics::throughput(st.history.all(), st.scores.total_frames())
    }

    /// Seconds remaining; possibly non-finite, see [`metrics::eta_seconds`].
    pub fn eta_seconds(&self) -> f64 {
        let st = self.shared.lock();
        metrics::eta_seconds(st.history.all(), st.scores.total_frames(), st.scores.len())
    }
}

/// The single logical outcome of a run.
pub struct RunHandle {
    task: JoinHandle<Result<Vec<f64>, RunError>>,
}

impl RunHandle {
    /// Resolve with the authoritative score sequence on a zero exit, or the
    /// run error otherwise.
    pub async fn wait(self) -> Result<Vec<f64>, RunError> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(RunError::Task(e.to_string())),
        }
    }

    /// Let the run continue unobserved; its outcome stays visible through
    /// the status history.
    pub fn detach(self) {}
}

async fn drive(cfg: RunConfig, shared: Arc<RunShared>) -> Result<Vec<f64>, RunError> {
    let listener = match listener::bind(cfg.port).await {
        Ok(listener) => listener,
        Err(source) => {
            let err = RunError::Listen {
                port: cfg.port,
                source,
            };
            shared.fail(&err);
            return Err(err);
        }
    };

    let (args, _) = build_arguments(&cfg);
    let mut command = Command::new(&cfg.runner);
    command.args(&args).stdin(Stdio::null()).kill_on_drop(true);
    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(source) => {
            drop(listener);
            let err = RunError::Spawn {
                runner: cfg.runner.clone(),
                source,
            };
            shared.fail(&err);
            return Err(err);
        }
    };
    shared.set_pid(child.id());
    // Optimistic: recorded as soon as the spawn is issued, before any
    // connection is confirmed.
    shared.append(Status::Running, None, None, None);

    let mut listen_task = tokio::spawn(listener::serve(listener, shared.clone()));

    let wait_res = child.wait().await;
    shared.mark_exited();

    // The listener gets a moment to record the disconnect, then is torn down
    // unconditionally before the run resolves.
    let _ = tokio::time::timeout(LISTENER_GRACE, &mut listen_task).await;
    listen_task.abort();

    let status = match wait_res {
        Ok(status) => status,
        Err(source) => {
            if shared.was_canceled() {
                return Err(RunError::Canceled);
            }
            let err = RunError::Wait(source);
            shared.fail(&err);
            return Err(err);
        }
    };

    if shared.was_canceled() {
        // The canceled terminal is already in the history; exit handling
        // must not append a conflicting one.
        debug!("scoring process exited after cancel");
        return Err(RunError::Canceled);
    }

    if status.success() {
        match read_score_file(&cfg.scores_output).await {
            Ok(scores) => {
                shared.finish(scores.clone());
                Ok(scores)
            }
            Err(err) => {
                shared.fail(&err);
                Err(err)
            }
        }
    } else {
        let err = match (status.code(), process::exit_signal(&status)) {
            (Some(code), _) => RunError::Exit(code),
            (None, Some(signal)) => RunError::Signal(signal),
            (None, None) => RunError::Wait(std::io::Error::other("unknown exit status")),
        };
        shared.fail(&err);
        Err(err)
    }
}

async fn read_score_file(path: &Path) -> Result<Vec<f64>, RunError> {
    let wrap = |source: crate::error::ScoreFileError| RunError::ScoreFile {
        path: path.to_path_buf(),
        source,
    };
    let raw = tokio::fs::read(path).await.map_err(|e| wrap(e.into()))?;
    let parsed: ScoreFile = serde_json::from_slice(&raw).map_err(|e| wrap(e.into()))?;
    Ok(parsed.scores)
}
