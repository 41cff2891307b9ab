//! Engine configuration with sane defaults.

use std::time::Duration;

/// Tunable caps and windows for the alert engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Most-recent records kept in the notification history.
  pub history_cap: usize,
  /// Records older than this are dropped by the periodic sweep.
  pub history_retention: Duration,
  /// How often the history sweep runs.
  pub history_sweep_interval: Duration,
  /// Rolling window for per-(rule, action, target) send counters.
  pub rate_limit_window: Duration,
  /// Stack-trace lines considered when computing a signature.
  pub signature_max_stack_lines: usize,
  /// Pattern titles longer than this are truncated with an ellipsis.
  pub title_max_len: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      history_cap: 100,
      history_retention: Duration::from_secs(7 * 24 * 60 * 60),
      history_sweep_interval: Duration::from_secs(60 * 60),
      rate_limit_window: Duration::from_secs(60 * 60),
      signature_max_stack_lines: 5,
      title_max_len: 60,
    }
  }
}
