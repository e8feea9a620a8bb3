//! Run orchestration: process supervision, the progress listener, and the
//! platform seam for suspend/continue/kill.

mod listener;
mod process;
mod supervisor;

pub use supervisor::{RunHandle, ScoreRun};
