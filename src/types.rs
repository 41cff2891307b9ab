//! Core types for the alert engine (JSON contracts + internal models).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::template::MessageTemplate;

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Low,
  Medium,
  High,
  Critical,
}

impl Severity {
  pub fn from_str_loose(s: &str) -> Option<Self> {
    match s.to_ascii_lowercase().as_str() {
      "low" => Some(Self::Low),
      "medium" | "med" => Some(Self::Medium),
      "high" => Some(Self::High),
      "critical" | "crit" | "fatal" => Some(Self::Critical),
      _ => None,
    }
  }

  /// Base score used when recomputing pattern severity.
  pub fn score(self) -> f64 {
    match self {
      Self::Low => 1.0,
      Self::Medium => 2.0,
      Self::High => 3.0,
      Self::Critical => 4.0,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Low => "low",
      Self::Medium => "medium",
      Self::High => "high",
      Self::Critical => "critical",
    }
  }
}

// ---------------------------------------------------------------------------
// Inbound event (JSON contract, what the caller sends)
// ---------------------------------------------------------------------------

/// One application error event. Immutable input; the engine never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
  pub id: String,
  pub error_type: String,
  pub severity: Severity,
  pub message: String,
  #[serde(default)]
  pub stack_trace: Option<String>,
  #[serde(default)]
  pub component_name: Option<String>,
  #[serde(default)]
  pub action_type: Option<String>,
  pub url: String,
  pub session_id: String,
  #[serde(default)]
  pub user_id: Option<String>,
  pub timestamp: DateTime<Utc>,
}

impl ErrorEvent {
  /// Parse an event from a JSON document and validate its required fields.
  pub fn from_json(json: &str) -> Result<Self, crate::error::EngineError> {
    let event: Self = serde_json::from_str(json)?;
    event.validate()?;
    Ok(event)
  }

  /// Reject events that parsed but cannot be evaluated against rules.
  pub fn validate(&self) -> Result<(), crate::error::EngineError> {
    if self.id.trim().is_empty() {
      return Err(crate::error::EngineError::validation("id", "must not be empty"));
    }
    if self.error_type.trim().is_empty() {
      return Err(crate::error::EngineError::validation("error_type", "must not be empty"));
    }
    if self.message.trim().is_empty() {
      return Err(crate::error::EngineError::validation("message", "must not be empty"));
    }
    Ok(())
  }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// A stable hex string identifying a dedup group of similar errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(pub String);

// ---------------------------------------------------------------------------
// Notification rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRule {
  pub id: String,
  pub name: String,
  pub enabled: bool,
  #[serde(default)]
  pub conditions: RuleConditions,
  pub actions: Vec<NotificationAction>,
  #[serde(default)]
  pub escalation: Option<EscalationPolicy>,
}

/// Rule matching conditions. All are optional; a rule with none matches
/// every event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConditions {
  #[serde(default)]
  pub error_types: Option<Vec<String>>,
  #[serde(default)]
  pub severity_levels: Option<Vec<Severity>>,
  #[serde(default)]
  pub components: Option<Vec<String>>,
  #[serde(default)]
  pub frequency: Option<FrequencyCondition>,
  #[serde(default)]
  pub user_impact: Option<UserImpactCondition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencyCondition {
  /// Occurrences required within the window for the rule to match; also the
  /// suppression cap once matched.
  pub threshold: u32,
  pub time_window_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserImpactCondition {
  pub affected_users: u32,
  pub time_window_ms: u64,
}

/// Delivery channel kind. Dispatch goes through the capability table
/// registered at engine construction, never a string switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
  Slack,
  Email,
  Discord,
  Webhook,
  Sms,
}

impl ActionKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Slack => "slack",
      Self::Email => "email",
      Self::Discord => "discord",
      Self::Webhook => "webhook",
      Self::Sms => "sms",
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationAction {
  #[serde(rename = "type")]
  pub kind: ActionKind,
  pub target: String,
  pub template: MessageTemplate,
  pub priority: Severity,
  #[serde(default)]
  pub rate_limit: Option<RateLimitPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitPolicy {
  pub max_per_hour: u32,
  pub cooldown_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationPolicy {
  pub delay_ms: u64,
  /// Id of the follow-up rule. Resolved at fire time, not validated on add.
  pub next_rule: String,
}

/// Partial rule update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulePatch {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub enabled: Option<bool>,
  #[serde(default)]
  pub conditions: Option<RuleConditions>,
  #[serde(default)]
  pub actions: Option<Vec<NotificationAction>>,
  #[serde(default)]
  pub escalation: Option<Option<EscalationPolicy>>,
}

// ---------------------------------------------------------------------------
// Notification history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
  Sent,
  Failed,
  Suppressed,
  RateLimited,
}

/// One notification outcome, append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
  pub id: String,
  pub rule_id: String,
  pub error_id: String,
  pub action_kind: ActionKind,
  pub target: String,
  pub status: NotificationStatus,
  pub timestamp: DateTime<Utc>,
  pub retry_count: u32,
  pub escalation_level: u32,
}

/// Aggregated counters over the in-memory history and caches.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
  pub total_rules: usize,
  pub active_rules: usize,
  pub total_notifications: usize,
  pub sent_notifications: usize,
  pub failed_notifications: usize,
  pub suppressed_notifications: usize,
  pub rate_limited_notifications: usize,
  /// Records from the last 24 hours.
  pub recent_notifications: usize,
  /// Live (unexpired at last read) cooldown entries.
  pub suppression_entries: usize,
}

// ---------------------------------------------------------------------------
// Pattern analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternStatus {
  New,
  Investigating,
  Resolved,
  Ignored,
}

/// Aggregated view of all events sharing a signature over an analysis batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPattern {
  pub id: String,
  pub signature: Signature,
  pub title: String,
  pub description: String,
  pub occurrences: usize,
  pub first_seen: DateTime<Utc>,
  pub last_seen: DateTime<Utc>,
  pub error_type: String,
  pub severity: Severity,
  pub affected_users: Vec<String>,
  pub affected_components: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub common_stack_trace: Option<String>,
  pub suggested_actions: Vec<String>,
  pub tags: Vec<String>,
  pub status: PatternStatus,
}

/// Per-period aggregate counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorAggregate {
  pub total: usize,
  pub by_type: HashMap<String, usize>,
  pub by_component: HashMap<String, usize>,
  pub by_severity: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendDelta {
  pub total: i64,
  pub percentage: i64,
}

/// Current-period aggregate plus change versus the previous period.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorTrend {
  pub total_errors: usize,
  pub by_type: HashMap<String, usize>,
  pub by_component: HashMap<String, usize>,
  pub by_severity: HashMap<String, usize>,
  pub change_from_previous: TrendDelta,
}

// ---------------------------------------------------------------------------
// Insights
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
  Spike,
  NewError,
  Regression,
  Improvement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightSeverity {
  Info,
  Warning,
  Error,
}

/// The data that triggered an insight.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightData {
  TrendDelta(TrendDelta),
  Patterns(Vec<ErrorPattern>),
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorInsight {
  pub kind: InsightKind,
  pub title: String,
  pub description: String,
  pub severity: InsightSeverity,
  pub data: InsightData,
  pub actionable: bool,
  pub suggested_actions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Single-event analysis
// ---------------------------------------------------------------------------

/// Result of analyzing one event in isolation.
#[derive(Debug, Clone, Serialize)]
pub struct EventAnalysis {
  pub signature: Signature,
  pub severity: Severity,
  pub classification: Classification,
  pub suggestions: Vec<String>,
}

/// Coarse error category derived from type/message/component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
  ApiCommunication,
  Authentication,
  Performance,
  UiRendering,
  Network,
  Runtime,
  General,
}
