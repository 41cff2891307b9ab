//! Integration tests for the alert engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alert_engine::notify::{MetricsSource, Notifier};
use alert_engine::template::RenderedMessage;
use alert_engine::types::{
  ActionKind, FrequencyCondition, NotificationAction, NotificationRule, NotificationStatus,
  RateLimitPolicy, RuleConditions, Severity,
};
use alert_engine::{Engine, ErrorEvent, MessageTemplate};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn fixture_event(id: &str) -> ErrorEvent {
  let json = format!(
    r#"{{
      "id": "{}",
      "error_type": "api",
      "severity": "high",
      "message": "Failed to fetch https://api.example.com/orders/12345: timeout",
      "stack_trace": "Error: timeout\n    at fetchOrders (src/api/orders.ts:42:13)\n    at processQueue (src/queue.ts:18:5)",
      "component_name": "OrderList",
      "url": "/orders",
      "session_id": "sess-1",
      "user_id": "user-1",
      "timestamp": "2025-01-15T10:30:00Z"
    }}"#,
    id
  );
  serde_json::from_str(&json).unwrap()
}

/// Records (target, subject) per delivery; succeeds unless told to fail.
#[derive(Default)]
struct RecordingNotifier {
  sent: Mutex<Vec<(String, String)>>,
  fail: AtomicBool,
}

impl RecordingNotifier {
  fn sent(&self) -> Vec<(String, String)> {
    self.sent.lock().unwrap().clone()
  }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
  async fn send(&self, target: &str, message: &RenderedMessage, _priority: Severity) -> bool {
    if self.fail.load(Ordering::SeqCst) {
      return false;
    }
    self
      .sent
      .lock()
      .unwrap()
      .push((target.to_string(), message.subject.clone()));
    true
  }
}

struct StaticMetrics {
  errors: u64,
  users: u64,
}

impl MetricsSource for StaticMetrics {
  fn recent_error_count(&self, _error_type: &str, _window: Duration) -> u64 {
    self.errors
  }

  fn affected_user_count(&self, _error_type: &str, _window: Duration) -> u64 {
    self.users
  }
}

fn slack_action(target: &str, rate_limit: Option<RateLimitPolicy>) -> NotificationAction {
  NotificationAction {
    kind: ActionKind::Slack,
    target: target.into(),
    template: MessageTemplate::Generic,
    priority: Severity::Medium,
    rate_limit,
  }
}

// ---------------------------------------------------------------------------
// Event processing end to end
// ---------------------------------------------------------------------------

#[tokio::test]
async fn matching_event_is_dispatched_and_recorded() {
  let notifier = Arc::new(RecordingNotifier::default());
  let engine = Engine::builder()
    .without_default_rules()
    .rule(NotificationRule {
      id: "api-watch".into(),
      name: "API watch".into(),
      enabled: true,
      conditions: RuleConditions {
        error_types: Some(vec!["api".into()]),
        severity_levels: Some(vec![Severity::High, Severity::Critical]),
        ..Default::default()
      },
      actions: vec![slack_action("api-alerts", None)],
      escalation: None,
    })
    .notifier(ActionKind::Slack, notifier.clone())
    .build();

  engine.process_event(&fixture_event("e1")).await;

  let sent = notifier.sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].0, "api-alerts");

  let history = engine.get_history();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].status, NotificationStatus::Sent);
  assert_eq!(history[0].rule_id, "api-watch");
  assert_eq!(history[0].error_id, "e1");
}

#[tokio::test(start_paused = true)]
async fn rate_limit_caps_sends_within_the_hour() {
  let notifier = Arc::new(RecordingNotifier::default());
  let engine = Engine::builder()
    .without_default_rules()
    .rule(NotificationRule {
      id: "noisy".into(),
      name: "Noisy rule".into(),
      enabled: true,
      conditions: RuleConditions::default(),
      actions: vec![slack_action(
        "chan",
        Some(RateLimitPolicy {
          max_per_hour: 2,
          cooldown_minutes: 0,
        }),
      )],
      escalation: None,
    })
    .notifier(ActionKind::Slack, notifier.clone())
    .build();

  for n in 0..4 {
    engine.process_event(&fixture_event(&format!("e{}", n))).await;
  }

  assert_eq!(notifier.sent().len(), 2);
  let history = engine.get_history();
  let limited: Vec<_> = history
    .iter()
    .filter(|r| r.status == NotificationStatus::RateLimited)
    .collect();
  assert_eq!(limited.len(), 2);

  // The hourly window lapses and sends resume.
  tokio::time::advance(Duration::from_secs(3601)).await;
  engine.process_event(&fixture_event("e5")).await;
  assert_eq!(notifier.sent().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn cooldown_suppresses_repeat_sends_until_expiry() {
  let notifier = Arc::new(RecordingNotifier::default());
  let engine = Engine::builder()
    .without_default_rules()
    .rule(NotificationRule {
      id: "cool".into(),
      name: "Cooldown rule".into(),
      enabled: true,
      conditions: RuleConditions::default(),
      actions: vec![slack_action(
        "chan",
        Some(RateLimitPolicy {
          max_per_hour: 100,
          cooldown_minutes: 5,
        }),
      )],
      escalation: None,
    })
    .notifier(ActionKind::Slack, notifier.clone())
    .build();

  // Same error type + component, so both events map to one cooldown key.
  engine.process_event(&fixture_event("e1")).await;
  engine.process_event(&fixture_event("e2")).await;

  assert_eq!(notifier.sent().len(), 1);
  let history = engine.get_history();
  assert_eq!(history[1].status, NotificationStatus::Suppressed);
  assert_eq!(engine.get_stats().suppression_entries, 1);

  tokio::time::advance(Duration::from_secs(5 * 60 + 1)).await;
  engine.process_event(&fixture_event("e3")).await;
  assert_eq!(notifier.sent().len(), 2);
}

#[tokio::test]
async fn frequency_gate_silences_a_burst_of_the_same_error() {
  let notifier = Arc::new(RecordingNotifier::default());
  let engine = Engine::builder()
    .without_default_rules()
    .rule(NotificationRule {
      id: "burst".into(),
      name: "Burst rule".into(),
      enabled: true,
      conditions: RuleConditions {
        frequency: Some(FrequencyCondition {
          threshold: 3,
          time_window_ms: 300_000,
        }),
        ..Default::default()
      },
      actions: vec![slack_action("chan", None)],
      escalation: None,
    })
    .notifier(ActionKind::Slack, notifier.clone())
    .metrics(Arc::new(StaticMetrics { errors: 3, users: 0 }))
    .build();

  // The same error id keeps firing; the gate counts both the checks and
  // the successful sends, so the burst goes quiet before long.
  for _ in 0..6 {
    engine.process_event(&fixture_event("e1")).await;
  }

  let history = engine.get_history();
  let sent = history
    .iter()
    .filter(|r| r.status == NotificationStatus::Sent)
    .count();
  let suppressed = history
    .iter()
    .filter(|r| r.status == NotificationStatus::Suppressed)
    .count();
  assert!(sent >= 1);
  assert!(suppressed >= 1);
  assert_eq!(sent + suppressed, 6);
  // Once over the threshold, nothing more goes out.
  assert!(history
    .iter()
    .skip_while(|r| r.status == NotificationStatus::Sent)
    .all(|r| r.status == NotificationStatus::Suppressed));
}

#[tokio::test(start_paused = true)]
async fn default_high_frequency_rule_escalates_to_critical_alerting() {
  let notifier = Arc::new(RecordingNotifier::default());
  let mut event = fixture_event("e1");
  event.error_type = "runtime".into();

  // Metrics report a sustained error rate, so only the high-frequency rule
  // (which has no error-type filter) matches.
  let engine = Engine::builder()
    .notifier(ActionKind::Slack, notifier.clone())
    .notifier(ActionKind::Email, notifier.clone())
    .metrics(Arc::new(StaticMetrics { errors: 10, users: 0 }))
    .build();

  engine.process_event(&event).await;
  assert_eq!(notifier.sent().len(), 1);
  assert_eq!(notifier.sent()[0].0, "error-monitoring");

  // Ten minutes later the escalation re-sends through the critical rule.
  tokio::task::yield_now().await;
  tokio::time::advance(Duration::from_secs(10 * 60 + 1)).await;
  tokio::task::yield_now().await;

  let sent = notifier.sent();
  assert_eq!(sent.len(), 3);
  let targets: Vec<&str> = sent[1..].iter().map(|s| s.0.as_str()).collect();
  assert!(targets.contains(&"critical-alerts"));
  assert!(targets.contains(&"oncall@example.com"));
  assert!(sent[1].1.contains("escalation level 1"));

  let history = engine.get_history();
  assert_eq!(history.len(), 3);
  assert!(history[1..].iter().all(|r| r.escalation_level == 1));
  assert!(history[1..].iter().all(|r| r.rule_id == "critical-immediate"));

  engine.shutdown();
}

#[tokio::test]
async fn dispatch_failure_is_recorded_not_raised() {
  let notifier = Arc::new(RecordingNotifier::default());
  notifier.fail.store(true, Ordering::SeqCst);
  let engine = Engine::builder()
    .without_default_rules()
    .rule(NotificationRule {
      id: "r1".into(),
      name: "r1".into(),
      enabled: true,
      conditions: RuleConditions::default(),
      actions: vec![slack_action("chan", None)],
      escalation: None,
    })
    .notifier(ActionKind::Slack, notifier.clone())
    .build();

  engine.process_event(&fixture_event("e1")).await;
  let stats = engine.get_stats();
  assert_eq!(stats.failed_notifications, 1);
  assert_eq!(stats.sent_notifications, 0);
}

// ---------------------------------------------------------------------------
// Analysis surface
// ---------------------------------------------------------------------------

#[tokio::test]
async fn analyze_event_is_stable_across_volatile_details() {
  let engine = Engine::builder().without_default_rules().build();

  let first = fixture_event("e1");
  let mut second = fixture_event("e2");
  second.message = "Failed to fetch https://api.example.com/orders/99999: timeout".into();

  let a1 = engine.analyze_event(&first);
  let a2 = engine.analyze_event(&second);

  // URLs and numeric ids are normalized away.
  assert_eq!(a1.signature, a2.signature);
  assert_eq!(a1.signature.0.len(), 16);
  assert_eq!(a1.severity, Severity::High);
  assert!(!a1.suggestions.is_empty());
}

#[tokio::test]
async fn batch_analysis_produces_patterns_and_insights() {
  let engine = Engine::builder().without_default_rules().build();

  // 12 occurrences of one error, 2 of another.
  let mut events: Vec<ErrorEvent> = (0..12).map(|n| fixture_event(&format!("a{}", n))).collect();
  for n in 0..2 {
    let mut other = fixture_event(&format!("b{}", n));
    other.error_type = "javascript".into();
    other.message = "undefined is not a function".into();
    other.component_name = Some("Sidebar".into());
    events.push(other);
  }

  let patterns = engine.analyze_patterns(&events);
  assert_eq!(patterns.len(), 2);
  // Sorted by occurrences, descending.
  assert_eq!(patterns[0].occurrences, 12);
  assert_eq!(patterns[1].occurrences, 2);
  assert_eq!(patterns[0].error_type, "api");
  assert!(patterns[0].tags.contains(&"api".to_string()));
  // The "Failed to fetch ..." message tags the pattern as network-related.
  assert!(patterns[0].tags.contains(&"network".to_string()));

  // Versus an empty previous period: total change of +14, reported as 100%.
  let trend = engine.analyze_trends(&events, &[]);
  assert_eq!(trend.total_errors, 14);
  assert_eq!(trend.change_from_previous.total, 14);
  assert_eq!(trend.change_from_previous.percentage, 100);

  let insights = engine.generate_insights(&patterns, &trend);
  assert!(insights
    .iter()
    .any(|i| i.title.contains("spike") || i.title.contains("Spike")));
}
