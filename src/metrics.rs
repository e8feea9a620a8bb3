//! Derived run metrics: throughput, ETA, and score summary statistics.

use crate::model::{Status, StatusRecord};

fn is_scored_running(record: &StatusRecord) -> bool {
    record.status == Status::Running && record.score.is_some()
}

/// Frames per second over the window between the first and last `running`
/// record that carries a score.
///
/// Non-finite when no such window exists or the window has zero width;
/// callers guard before using the value in further math. The reverse search
/// iterates an immutable view, never mutating the history.
pub fn throughput(history: &[StatusRecord], total_frames: u64) -> f64 {
    let first = history.iter().find(|r| is_scored_running(r));
    let last = history.iter().rev().find(|r| is_scored_running(r));
    match (first, last) {
        (Some(first), Some(last)) => {
            let elapsed = (last.timestamp - first.timestamp).as_seconds_f64();
            total_frames as f64 / elapsed
        }
        _ => f64::INFINITY,
    }
}

/// Seconds remaining at the current throughput; non-finite whenever
/// [`throughput`] is.
pub fn eta_seconds(history: &[StatusRecord], total_frames: u64, scores_collected: usize) -> f64 {
    let rate = throughput(history, total_frames);
    if !rate.is_finite() {
        return rate;
    }
    (total_frames.saturating_sub(scores_collected as u64)) as f64 / rate
}

/// Compute score summary metrics (mean, median, 25th percentile, 75th percentile)
pub fn compute_metrics(scores: &[f64]) -> Option<(f64, f64, f64, f64)> {
    if scores.is_empty() {
        return None;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let median = sorted[n / 2];
    let p25 = sorted[n / 4];
    let p75 = sorted[3 * n / 4];
    Some((mean, median, p25, p75))
}
