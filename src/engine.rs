//! Rule engine orchestrator: evaluates rules against incoming events,
//! applies the suppression/rate-limit/cooldown gates, dispatches through the
//! registered notifier capabilities, and records history.
//!
//! One engine instance per deployment unit, explicitly constructed and
//! shared as `Arc<Engine>`. Shared state sits behind per-cache mutexes that
//! are never held across an await.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::classify;
use crate::config::EngineConfig;
use crate::history::HistoryRecorder;
use crate::insights;
use crate::limits::{suppression_key, FrequencyTracker, RateLimiter, SuppressionCache};
use crate::notify::{MetricsSource, Notifier, NullMetrics};
use crate::patterns;
use crate::registry::RuleRegistry;
use crate::signature::{self, SignatureInput};
use crate::template;
use crate::trends;
use crate::types::*;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles an [`Engine`]: notifier capabilities per action kind, a metrics
/// source, config, and the initial rule set (defaults unless opted out).
pub struct EngineBuilder {
  config: EngineConfig,
  registry: RuleRegistry,
  notifiers: HashMap<ActionKind, Arc<dyn Notifier>>,
  metrics: Arc<dyn MetricsSource>,
}

impl EngineBuilder {
  fn new() -> Self {
    Self {
      config: EngineConfig::default(),
      registry: RuleRegistry::with_defaults(),
      notifiers: HashMap::new(),
      metrics: Arc::new(NullMetrics),
    }
  }

  pub fn config(mut self, config: EngineConfig) -> Self {
    self.config = config;
    self
  }

  /// Start from an empty registry instead of the seeded default rules.
  pub fn without_default_rules(mut self) -> Self {
    self.registry = RuleRegistry::new();
    self
  }

  pub fn rule(mut self, rule: NotificationRule) -> Self {
    self.registry.add(rule);
    self
  }

  /// Register the delivery capability for one action kind. Actions of a
  /// kind without a notifier fail dispatch (recorded as `failed`).
  pub fn notifier(mut self, kind: ActionKind, notifier: Arc<dyn Notifier>) -> Self {
    self.notifiers.insert(kind, notifier);
    self
  }

  pub fn metrics(mut self, metrics: Arc<dyn MetricsSource>) -> Self {
    self.metrics = metrics;
    self
  }

  pub fn build(self) -> Arc<Engine> {
    Arc::new(Engine {
      rate_limits: Mutex::new(RateLimiter::new(self.config.rate_limit_window)),
      history: Mutex::new(HistoryRecorder::new(self.config.history_cap)),
      config: self.config,
      registry: Mutex::new(self.registry),
      notifiers: self.notifiers,
      metrics: self.metrics,
      frequency: Mutex::new(FrequencyTracker::default()),
      suppression: Mutex::new(SuppressionCache::default()),
      tasks: Mutex::new(Vec::new()),
      started: AtomicBool::new(false),
    })
  }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
  config: EngineConfig,
  registry: Mutex<RuleRegistry>,
  notifiers: HashMap<ActionKind, Arc<dyn Notifier>>,
  metrics: Arc<dyn MetricsSource>,
  frequency: Mutex<FrequencyTracker>,
  rate_limits: Mutex<RateLimiter>,
  suppression: Mutex<SuppressionCache>,
  history: Mutex<HistoryRecorder>,
  /// Outstanding escalation timers + the history sweep, aborted on shutdown.
  tasks: Mutex<Vec<JoinHandle<()>>>,
  started: AtomicBool,
}

impl Engine {
  pub fn builder() -> EngineBuilder {
    EngineBuilder::new()
  }

  /// Start background maintenance (the periodic history sweep). Idempotent.
  pub fn start(self: &Arc<Self>) {
    if self.started.swap(true, Ordering::SeqCst) {
      tracing::warn!("alert engine already started");
      return;
    }
    tracing::info!(rules = self.registry.lock().unwrap().len(), "alert engine started");

    let engine = Arc::clone(self);
    let sweep_interval = self.config.history_sweep_interval;
    let retention = chrono::Duration::from_std(self.config.history_retention)
      .unwrap_or_else(|_| chrono::Duration::days(7));
    let handle = tokio::spawn(async move {
      let mut ticker = tokio::time::interval(sweep_interval);
      ticker.tick().await;
      loop {
        ticker.tick().await;
        let removed = engine.history.lock().unwrap().prune_older_than(Utc::now() - retention);
        if removed > 0 {
          tracing::debug!(removed, "pruned old notification records");
        }
      }
    });
    self.track_task(handle);
  }

  /// Track a background task, reaping handles of tasks that have already
  /// finished so the ledger stays bounded over the engine's lifetime.
  fn track_task(&self, handle: JoinHandle<()>) {
    let mut tasks = self.tasks.lock().unwrap();
    tasks.retain(|t| !t.is_finished());
    tasks.push(handle);
  }

  /// Abort the sweep and any outstanding escalation timers.
  pub fn shutdown(&self) {
    let mut tasks = self.tasks.lock().unwrap();
    for task in tasks.drain(..) {
      task.abort();
    }
    self.started.store(false, Ordering::SeqCst);
    tracing::info!("alert engine shut down");
  }

  // -------------------------------------------------------------------------
  // Event processing
  // -------------------------------------------------------------------------

  /// Evaluate every enabled rule against the event, in registry order.
  /// Fire-and-forget: dispatch failures are recorded, never propagated.
  pub async fn process_event(self: &Arc<Self>, event: &ErrorEvent) {
    tracing::debug!(error = %event.id, error_type = %event.error_type, "processing error event");

    let rules: Vec<NotificationRule> = self.registry.lock().unwrap().all().to_vec();
    for rule in rules {
      if !rule.enabled {
        continue;
      }
      if self.evaluate_rule(&rule, event) {
        self.run_actions(&rule, event, 0).await;
        if let Some(escalation) = &rule.escalation {
          self.schedule_escalation(escalation, event);
        }
      }
    }
  }

  /// Condition checks in declared order, short-circuiting on first failure.
  /// A rule with no conditions matches every event.
  fn evaluate_rule(&self, rule: &NotificationRule, event: &ErrorEvent) -> bool {
    let conditions = &rule.conditions;

    if let Some(types) = &conditions.error_types {
      if !types.iter().any(|t| *t == event.error_type) {
        return false;
      }
    }

    if let Some(levels) = &conditions.severity_levels {
      if !levels.contains(&event.severity) {
        return false;
      }
    }

    if let Some(components) = &conditions.components {
      if let Some(component) = &event.component_name {
        if !components.contains(component) {
          return false;
        }
      }
    }

    if let Some(frequency) = &conditions.frequency {
      let window = Duration::from_millis(frequency.time_window_ms);
      let count = self.metrics.recent_error_count(&event.error_type, window);
      if count < u64::from(frequency.threshold) {
        return false;
      }
    }

    if let Some(user_impact) = &conditions.user_impact {
      let window = Duration::from_millis(user_impact.time_window_ms);
      let affected = self.metrics.affected_user_count(&event.error_type, window);
      if affected < u64::from(user_impact.affected_users) {
        return false;
      }
    }

    true
  }

  /// Run a rule's actions through the three gates, dispatch survivors, and
  /// record each outcome. Does not schedule escalation; the caller does
  /// (and only for level 0, so escalation never chains).
  async fn run_actions(&self, rule: &NotificationRule, event: &ErrorEvent, level: u32) {
    for action in &rule.actions {
      // Gate 1: frequency suppression. The check itself counts the
      // occurrence, so a burst past the threshold goes quiet.
      if let Some(frequency) = &rule.conditions.frequency {
        let window = Duration::from_millis(frequency.time_window_ms);
        let suppressed = self.frequency.lock().unwrap().check_suppressed(
          &event.id,
          frequency.threshold,
          window,
          Instant::now(),
        );
        if suppressed {
          tracing::debug!(rule = %rule.id, error = %event.id, "frequency suppressed");
          self.record(rule, event, action, NotificationStatus::Suppressed, level);
          continue;
        }
      }

      // Gate 2: hourly rate limit. Attempts do not count; only sends do.
      if let Some(limit) = &action.rate_limit {
        let limited = self.rate_limits.lock().unwrap().is_limited(
          &rule.id,
          action.kind,
          &action.target,
          limit.max_per_hour,
          Instant::now(),
        );
        if limited {
          tracing::debug!(rule = %rule.id, kind = %action.kind.as_str(), target = %action.target, "rate limited");
          self.record(rule, event, action, NotificationStatus::RateLimited, level);
          continue;
        }
      }

      // Gate 3: cooldown suppression from an earlier successful send.
      let key = suppression_key(
        &event.error_type,
        event.component_name.as_deref(),
        action.kind,
        &action.target,
      );
      if self.suppression.lock().unwrap().is_suppressed(&key, Instant::now()) {
        tracing::debug!(key = %key, "cooldown suppressed");
        self.record(rule, event, action, NotificationStatus::Suppressed, level);
        continue;
      }

      // Dispatch.
      let message = template::render(action.template, event, level);
      let success = match self.notifiers.get(&action.kind) {
        Some(notifier) => notifier.send(&action.target, &message, action.priority).await,
        None => {
          tracing::warn!(kind = %action.kind.as_str(), "no notifier registered for action kind");
          false
        }
      };

      if success {
        let now = Instant::now();
        if action.rate_limit.is_some() {
          self.rate_limits.lock().unwrap().increment(&rule.id, action.kind, &action.target, now);
        }
        if let Some(frequency) = &rule.conditions.frequency {
          let window = Duration::from_millis(frequency.time_window_ms);
          self.frequency.lock().unwrap().track(&event.id, window, now);
        }
      } else {
        tracing::warn!(rule = %rule.id, kind = %action.kind.as_str(), target = %action.target, "notification dispatch failed");
      }

      self.record(
        rule,
        event,
        action,
        if success { NotificationStatus::Sent } else { NotificationStatus::Failed },
        level,
      );

      if success {
        if let Some(limit) = &action.rate_limit {
          if limit.cooldown_minutes > 0 {
            let cooldown = Duration::from_secs(limit.cooldown_minutes * 60);
            self.suppression.lock().unwrap().set(key, cooldown, Instant::now());
          }
        }
      }
    }
  }

  /// Arm a one-shot timer that re-runs the referenced rule's actions at
  /// escalation level 1. The target is resolved at fire time; a missing
  /// rule drops the escalation with a warning. Timers are not cancelled
  /// when the originating condition clears.
  fn schedule_escalation(self: &Arc<Self>, escalation: &EscalationPolicy, event: &ErrorEvent) {
    let engine = Arc::clone(self);
    let next_rule_id = escalation.next_rule.clone();
    let delay = Duration::from_millis(escalation.delay_ms);
    let event = event.clone();

    let handle = tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      let next_rule = engine.registry.lock().unwrap().get(&next_rule_id).cloned();
      match next_rule {
        Some(rule) => {
          tracing::info!(rule = %rule.id, error = %event.id, "escalation fired");
          engine.run_actions(&rule, &event, 1).await;
        }
        None => {
          tracing::warn!(rule = %next_rule_id, "escalation target not found; dropping");
        }
      }
    });
    self.track_task(handle);
  }

  fn record(
    &self,
    rule: &NotificationRule,
    event: &ErrorEvent,
    action: &NotificationAction,
    status: NotificationStatus,
    level: u32,
  ) {
    let record = NotificationRecord {
      id: format!("notif-{}", Uuid::new_v4().simple()),
      rule_id: rule.id.clone(),
      error_id: event.id.clone(),
      action_kind: action.kind,
      target: action.target.clone(),
      status,
      timestamp: Utc::now(),
      retry_count: 0,
      escalation_level: level,
    };
    self.history.lock().unwrap().record(record);
  }

  // -------------------------------------------------------------------------
  // Analysis (pull-based, off the hot path)
  // -------------------------------------------------------------------------

  /// Signature, severity, classification, and suggestions for one event.
  pub fn analyze_event(&self, event: &ErrorEvent) -> EventAnalysis {
    let signature = signature::compute(
      SignatureInput {
        error_type: &event.error_type,
        message: &event.message,
        stack_trace: event.stack_trace.as_deref(),
        component_name: event.component_name.as_deref(),
      },
      self.config.signature_max_stack_lines,
    );
    let severity = classify::classify_severity(&event.error_type, &event.message, Some(&event.url));
    let classification =
      classify::classify_error(&event.error_type, &event.message, event.component_name.as_deref());
    let suggestions = classify::suggestions_for(&event.error_type, &event.message, severity);

    EventAnalysis {
      signature,
      severity,
      classification,
      suggestions,
    }
  }

  pub fn analyze_patterns(&self, events: &[ErrorEvent]) -> Vec<ErrorPattern> {
    patterns::analyze_patterns(events, &self.config)
  }

  pub fn analyze_trends(&self, current: &[ErrorEvent], previous: &[ErrorEvent]) -> ErrorTrend {
    trends::analyze_trends(current, previous)
  }

  pub fn generate_insights(&self, patterns: &[ErrorPattern], trend: &ErrorTrend) -> Vec<ErrorInsight> {
    insights::generate_insights(patterns, trend)
  }

  // -------------------------------------------------------------------------
  // Rule + history surface (consumed by the dashboard/API layer)
  // -------------------------------------------------------------------------

  pub fn add_rule(&self, rule: NotificationRule) {
    self.registry.lock().unwrap().add(rule);
  }

  pub fn update_rule(&self, rule_id: &str, patch: RulePatch) -> bool {
    self.registry.lock().unwrap().update(rule_id, patch)
  }

  pub fn remove_rule(&self, rule_id: &str) -> bool {
    self.registry.lock().unwrap().remove(rule_id)
  }

  pub fn get_rules(&self) -> Vec<NotificationRule> {
    self.registry.lock().unwrap().all().to_vec()
  }

  pub fn get_history(&self) -> Vec<NotificationRecord> {
    self.history.lock().unwrap().snapshot()
  }

  /// Pure aggregation over the in-memory history and caches.
  pub fn get_stats(&self) -> EngineStats {
    let registry = self.registry.lock().unwrap();
    let history = self.history.lock().unwrap();
    let day_ago = Utc::now() - chrono::Duration::hours(24);

    EngineStats {
      total_rules: registry.len(),
      active_rules: registry.enabled_count(),
      total_notifications: history.len(),
      sent_notifications: history.count_with_status(NotificationStatus::Sent),
      failed_notifications: history.count_with_status(NotificationStatus::Failed),
      suppressed_notifications: history.count_with_status(NotificationStatus::Suppressed),
      rate_limited_notifications: history.count_with_status(NotificationStatus::RateLimited),
      recent_notifications: history.count_since(day_ago),
      suppression_entries: self.suppression.lock().unwrap().len(),
    }
  }

  // -------------------------------------------------------------------------
  // Test teardown helpers
  // -------------------------------------------------------------------------

  /// Drop all history, gate state, and counters.
  pub fn clear_history(&self) {
    self.history.lock().unwrap().clear();
    self.suppression.lock().unwrap().clear();
    self.rate_limits.lock().unwrap().clear();
    self.frequency.lock().unwrap().clear();
  }

  pub fn clear_rules(&self) {
    self.registry.lock().unwrap().clear();
  }
}
