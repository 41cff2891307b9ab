//! Bounded, time-pruned log of notification outcomes.

use chrono::{DateTime, Utc};

use crate::types::{NotificationRecord, NotificationStatus};

/// Append-only history capped at the N most recent records; older entries
/// are dropped by a periodic sweep.
#[derive(Debug)]
pub struct HistoryRecorder {
  cap: usize,
  records: Vec<NotificationRecord>,
}

impl HistoryRecorder {
  pub fn new(cap: usize) -> Self {
    Self {
      cap,
      records: Vec::new(),
    }
  }

  /// Append a record, discarding the oldest beyond the cap.
  pub fn record(&mut self, record: NotificationRecord) {
    self.records.push(record);
    if self.records.len() > self.cap {
      let excess = self.records.len() - self.cap;
      self.records.drain(..excess);
    }
  }

  /// Drop records older than the cutoff. Returns how many were removed.
  pub fn prune_older_than(&mut self, cutoff: DateTime<Utc>) -> usize {
    let before = self.records.len();
    self.records.retain(|r| r.timestamp > cutoff);
    before - self.records.len()
  }

  pub fn snapshot(&self) -> Vec<NotificationRecord> {
    self.records.clone()
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn count_with_status(&self, status: NotificationStatus) -> usize {
    self.records.iter().filter(|r| r.status == status).count()
  }

  /// Records newer than the cutoff (used for the "recent" stat).
  pub fn count_since(&self, cutoff: DateTime<Utc>) -> usize {
    self.records.iter().filter(|r| r.timestamp > cutoff).count()
  }

  pub fn clear(&mut self) {
    self.records.clear();
  }
}
