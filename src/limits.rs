//! Gate state for the rule engine: sliding frequency counters, hourly rate
//! limits, and cooldown suppression.
//!
//! All three are plain maps with lazily-reset entries. Callers pass `now`
//! explicitly (`tokio::time::Instant`), which keeps the gates deterministic
//! under paused test time.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use crate::types::ActionKind;

// ---------------------------------------------------------------------------
// Frequency tracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct FrequencyEntry {
  count: u32,
  first_occurrence: Instant,
  window: Duration,
}

/// Per-error-id sliding occurrence counter, used for frequency-based
/// suppression. Counts only occurrences seen by this process.
#[derive(Debug, Default)]
pub struct FrequencyTracker {
  entries: HashMap<String, FrequencyEntry>,
}

impl FrequencyTracker {
  /// Count this occurrence and report whether it should be suppressed
  /// (count now exceeds `threshold` within the window). The first
  /// occurrence, or the first after the window lapses, resets the counter
  /// to 1 and is never suppressed.
  pub fn check_suppressed(
    &mut self,
    error_id: &str,
    threshold: u32,
    window: Duration,
    now: Instant,
  ) -> bool {
    match self.entries.get_mut(error_id) {
      Some(entry) if now.duration_since(entry.first_occurrence) <= entry.window => {
        entry.count += 1;
        entry.count > threshold
      }
      _ => {
        self.entries.insert(
          error_id.to_string(),
          FrequencyEntry {
            count: 1,
            first_occurrence: now,
            window,
          },
        );
        false
      }
    }
  }

  /// Count a successful dispatch for this error id.
  pub fn track(&mut self, error_id: &str, window: Duration, now: Instant) {
    match self.entries.get_mut(error_id) {
      Some(entry) if now.duration_since(entry.first_occurrence) <= entry.window => {
        entry.count += 1;
      }
      _ => {
        self.entries.insert(
          error_id.to_string(),
          FrequencyEntry {
            count: 1,
            first_occurrence: now,
            window,
          },
        );
      }
    }
  }

  /// Current in-window count for an error id (0 if absent or lapsed).
  pub fn count(&self, error_id: &str, now: Instant) -> u32 {
    match self.entries.get(error_id) {
      Some(entry) if now.duration_since(entry.first_occurrence) <= entry.window => entry.count,
      _ => 0,
    }
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }
}

// ---------------------------------------------------------------------------
// Rate limiter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct RateLimitCounter {
  count: u32,
  reset_at: Instant,
}

/// Per (rule, action kind, target) rolling send counter. Entries whose
/// window has passed are reset lazily on read.
#[derive(Debug)]
pub struct RateLimiter {
  window: Duration,
  counters: HashMap<(String, ActionKind, String), RateLimitCounter>,
}

impl RateLimiter {
  pub fn new(window: Duration) -> Self {
    Self {
      window,
      counters: HashMap::new(),
    }
  }

  /// Whether the counter for this key has reached `max`. Does not count the
  /// attempt; only successful sends increment.
  pub fn is_limited(&mut self, rule_id: &str, kind: ActionKind, target: &str, max: u32, now: Instant) -> bool {
    let counter = self.entry(rule_id, kind, target, now);
    counter.count >= max
  }

  /// Count one successful send for this key.
  pub fn increment(&mut self, rule_id: &str, kind: ActionKind, target: &str, now: Instant) {
    let counter = self.entry(rule_id, kind, target, now);
    counter.count += 1;
  }

  fn entry(&mut self, rule_id: &str, kind: ActionKind, target: &str, now: Instant) -> &mut RateLimitCounter {
    let key = (rule_id.to_string(), kind, target.to_string());
    let window = self.window;
    let counter = self.counters.entry(key).or_insert_with(|| RateLimitCounter {
      count: 0,
      reset_at: now + window,
    });
    if now >= counter.reset_at {
      counter.count = 0;
      counter.reset_at = now + window;
    }
    counter
  }

  pub fn clear(&mut self) {
    self.counters.clear();
  }
}

// ---------------------------------------------------------------------------
// Suppression cache
// ---------------------------------------------------------------------------

/// Per (error type, component, action kind, target) cooldown expiry.
/// Expired entries are evicted on read.
#[derive(Debug, Default)]
pub struct SuppressionCache {
  entries: HashMap<String, Instant>,
}

/// Key format shared by the gate check and the post-send cache update.
pub fn suppression_key(error_type: &str, component: Option<&str>, kind: ActionKind, target: &str) -> String {
  format!(
    "{}:{}:{}:{}",
    error_type,
    component.unwrap_or("unknown"),
    kind.as_str(),
    target
  )
}

impl SuppressionCache {
  pub fn is_suppressed(&mut self, key: &str, now: Instant) -> bool {
    match self.entries.get(key) {
      Some(&expires_at) if now < expires_at => true,
      Some(_) => {
        self.entries.remove(key);
        false
      }
      None => false,
    }
  }

  pub fn set(&mut self, key: String, cooldown: Duration, now: Instant) {
    self.entries.insert(key, now + cooldown);
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }
}
