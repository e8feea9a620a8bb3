//! Append-only status history with synchronous observer notification.

use time::OffsetDateTime;

use crate::model::{Status, StatusRecord};

/// Handle returned by [`StatusHistory::subscribe`]; unsubscription is always
/// explicit, never dropped implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Observer = Box<dyn Fn(&StatusRecord) + Send>;

/// Ordered log of lifecycle states for one run.
///
/// Insertion order is chronological order; the log is never empty (a fresh
/// history starts with a single `idle` record) and entries are never removed
/// or reordered. Observers are invoked synchronously, in registration order,
/// on every append.
pub struct StatusHistory {
    records: Vec<StatusRecord>,
    observers: Vec<(SubscriberId, Observer)>,
    next_id: u64,
}

impl StatusHistory {
    pub fn new() -> Self {
        Self {
            records: vec![StatusRecord {
                timestamp: OffsetDateTime::now_utc(),
                status: Status::Idle,
                frame: None,
                score: None,
                error: None,
            }],
            observers: Vec::new(),
            next_id: 0,
        }
    }

    /// Stamp the current time, append, and notify every observer with the new
    /// record.
    pub fn append(
        &mut self,
        status: Status,
        frame: Option<u64>,
        score: Option<f64>,
        error: Option<String>,
    ) {
        let record = StatusRecord {
            timestamp: OffsetDateTime::now_utc(),
            status,
            frame,
            score,
            error,
        };
        self.records.push(record);
        let record = self.records.last().expect("just pushed");
        for (_, observer) in &self.observers {
            observer(record);
        }
    }

    /// The most recent record. The history is never empty.
    pub fn current(&self) -> &StatusRecord {
        self.records.last().expect("history is never empty")
    }

    /// Read-only view of the full log, oldest first.
    pub fn all(&self) -> &[StatusRecord] {
        &self.records
    }

    pub fn subscribe(&mut self, observer: Observer) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Returns false if the id was already removed or never issued.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(other, _)| *other != id);
        self.observers.len() != before
    }
}

impl Default for StatusHistory {
    fn default() -> Self {
        Self::new()
    }
}
