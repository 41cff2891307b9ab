//! Capabilities the engine consumes: channel delivery and external metrics.
//!
//! Real channel adapters (Slack webhooks, SMTP, ...) live outside this
//! crate; the engine only needs `send -> bool`. A tracing-backed notifier is
//! provided so the binary runs end-to-end without any channel configured.

use std::time::Duration;

use crate::template::RenderedMessage;
use crate::types::Severity;

/// Delivery capability for one channel kind. Implementations must not
/// panic; a failed delivery is `false`.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
  async fn send(&self, target: &str, message: &RenderedMessage, priority: Severity) -> bool;
}

/// External aggregation source (e.g. a log store) backing the
/// `frequency`/`userImpact` rule conditions. Distinct from the engine's
/// internal frequency tracker, which counts only events this process saw.
pub trait MetricsSource: Send + Sync {
  fn recent_error_count(&self, error_type: &str, window: Duration) -> u64;
  fn affected_user_count(&self, error_type: &str, window: Duration) -> u64;
}

/// Notifier that logs deliveries instead of sending them. Always succeeds.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
  async fn send(&self, target: &str, message: &RenderedMessage, priority: Severity) -> bool {
    tracing::info!(
      target_channel = %target,
      priority = %priority.as_str(),
      subject = %message.subject,
      "notification dispatched"
    );
    true
  }
}

/// Metrics source for deployments without an external log store. Reports
/// zero, so frequency/user-impact conditions never match.
#[derive(Debug, Default)]
pub struct NullMetrics;

impl MetricsSource for NullMetrics {
  fn recent_error_count(&self, _error_type: &str, _window: Duration) -> u64 {
    0
  }

  fn affected_user_count(&self, _error_type: &str, _window: Duration) -> u64 {
    0
  }
}
