//! Accumulator for per-frame scores.
//!
//! Streamed scores are a provisional preview in arrival order; the result
//! file read on successful exit replaces them wholesale.

/// Ordered score sequence plus the largest frame total observed so far.
#[derive(Debug, Default)]
pub struct ScoreStore {
    scores: Vec<f64>,
    total_frames: u64,
}

impl ScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one streamed score (arrival order, no reordering by frame
    /// index).
    pub fn push(&mut self, score: f64) {
        self.scores.push(score);
    }

    /// Raise the known frame total; it never decreases, whatever order packet
    /// totals arrive in.
    pub fn observe_total(&mut self, total: u64) {
        if total > self.total_frames {
            self.total_frames = total;
        }
    }

    /// Swap in the authoritative sequence from the result file.
    pub fn replace_with_final(&mut self, scores: Vec<f64>) {
        self.scores = scores;
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_keep_arrival_order() {
        let mut store = ScoreStore::new();
        store.push(3.0);
        store.push(1.0);
        store.push(2.0);
        assert_eq!(store.as_slice(), &[3.0, 1.0, 2.0]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn total_frames_is_monotonic() {
        let mut store = ScoreStore::new();
        for total in [50, 100, 80, 100, 99] {
            store.observe_total(total);
        }
        assert_eq!(store.total_frames(), 100);
    }

    #[test]
    fn replacement_is_wholesale() {
        let mut store = ScoreStore::new();
        store.push(0.1);
        store.push(0.2);
        store.replace_with_final(vec![9.0, 8.0, 7.0, 6.0]);
        assert_eq!(store.as_slice(), &[9.0, 8.0, 7.0, 6.0]);
        // The frame total is independent of the replacement.
        store.observe_total(4);
        assert_eq!(store.total_frames(), 4);
    }
}
