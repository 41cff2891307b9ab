//! Rule registry: insertion-ordered CRUD store of notification rules.

use crate::template::MessageTemplate;
use crate::types::{
  ActionKind, EscalationPolicy, FrequencyCondition, NotificationAction, NotificationRule,
  RateLimitPolicy, RuleConditions, RulePatch, Severity, UserImpactCondition,
};

/// Holds rules in insertion order, which is also the engine's evaluation
/// order. Lookups are linear; rule sets are small.
#[derive(Debug, Default)]
pub struct RuleRegistry {
  rules: Vec<NotificationRule>,
}

impl RuleRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registry seeded with the default operator rule set.
  pub fn with_defaults() -> Self {
    let mut registry = Self::new();
    for rule in default_rules() {
      registry.add(rule);
    }
    registry
  }

  /// Add a rule, replacing any existing rule with the same id in place.
  /// A rule without an id is rejected with a warning.
  pub fn add(&mut self, rule: NotificationRule) {
    if rule.id.is_empty() {
      tracing::warn!("ignoring notification rule without an id");
      return;
    }
    match self.rules.iter_mut().find(|r| r.id == rule.id) {
      Some(existing) => {
        tracing::info!(rule = %rule.id, "notification rule replaced");
        *existing = rule;
      }
      None => {
        tracing::info!(rule = %rule.id, name = %rule.name, "notification rule added");
        self.rules.push(rule);
      }
    }
  }

  /// Apply a partial update. Returns false if the id is unknown.
  pub fn update(&mut self, rule_id: &str, patch: RulePatch) -> bool {
    let Some(rule) = self.rules.iter_mut().find(|r| r.id == rule_id) else {
      tracing::warn!(rule = %rule_id, "update for unknown rule");
      return false;
    };

    if let Some(name) = patch.name {
      rule.name = name;
    }
    if let Some(enabled) = patch.enabled {
      rule.enabled = enabled;
    }
    if let Some(conditions) = patch.conditions {
      rule.conditions = conditions;
    }
    if let Some(actions) = patch.actions {
      rule.actions = actions;
    }
    if let Some(escalation) = patch.escalation {
      rule.escalation = escalation;
    }
    tracing::info!(rule = %rule_id, "notification rule updated");
    true
  }

  /// Remove a rule. Returns false if the id is unknown.
  pub fn remove(&mut self, rule_id: &str) -> bool {
    let before = self.rules.len();
    self.rules.retain(|r| r.id != rule_id);
    let removed = self.rules.len() < before;
    if removed {
      tracing::info!(rule = %rule_id, "notification rule removed");
    }
    removed
  }

  pub fn get(&self, rule_id: &str) -> Option<&NotificationRule> {
    self.rules.iter().find(|r| r.id == rule_id)
  }

  pub fn all(&self) -> &[NotificationRule] {
    &self.rules
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  pub fn enabled_count(&self) -> usize {
    self.rules.iter().filter(|r| r.enabled).count()
  }

  pub fn clear(&mut self) {
    self.rules.clear();
  }
}

/// The seeded operator rule set: immediate critical alerts, high-frequency
/// detection with escalation, API monitoring, user-impact monitoring, and
/// JavaScript error monitoring.
pub fn default_rules() -> Vec<NotificationRule> {
  vec![
    NotificationRule {
      id: "critical-immediate".into(),
      name: "Immediate critical error alert".into(),
      enabled: true,
      conditions: RuleConditions {
        error_types: Some(vec!["critical".into(), "auth".into()]),
        severity_levels: Some(vec![Severity::Critical]),
        ..Default::default()
      },
      actions: vec![
        NotificationAction {
          kind: ActionKind::Slack,
          target: "critical-alerts".into(),
          template: MessageTemplate::CriticalError,
          priority: Severity::Critical,
          rate_limit: None,
        },
        NotificationAction {
          kind: ActionKind::Email,
          target: "oncall@example.com".into(),
          template: MessageTemplate::CriticalError,
          priority: Severity::Critical,
          rate_limit: None,
        },
      ],
      escalation: None,
    },
    NotificationRule {
      id: "high-frequency-errors".into(),
      name: "High-frequency error detection".into(),
      enabled: true,
      conditions: RuleConditions {
        frequency: Some(FrequencyCondition {
          threshold: 10,
          time_window_ms: 5 * 60 * 1000,
        }),
        ..Default::default()
      },
      actions: vec![NotificationAction {
        kind: ActionKind::Slack,
        target: "error-monitoring".into(),
        template: MessageTemplate::HighFrequencyAlert,
        priority: Severity::High,
        rate_limit: Some(RateLimitPolicy {
          max_per_hour: 3,
          cooldown_minutes: 15,
        }),
      }],
      escalation: Some(EscalationPolicy {
        delay_ms: 10 * 60 * 1000,
        next_rule: "critical-immediate".into(),
      }),
    },
    NotificationRule {
      id: "api-error-monitoring".into(),
      name: "API error monitoring".into(),
      enabled: true,
      conditions: RuleConditions {
        error_types: Some(vec!["api".into()]),
        frequency: Some(FrequencyCondition {
          threshold: 5,
          time_window_ms: 3 * 60 * 1000,
        }),
        ..Default::default()
      },
      actions: vec![NotificationAction {
        kind: ActionKind::Slack,
        target: "api-alerts".into(),
        template: MessageTemplate::ApiErrorAlert,
        priority: Severity::Medium,
        rate_limit: None,
      }],
      escalation: None,
    },
    NotificationRule {
      id: "user-impact-monitoring".into(),
      name: "User impact monitoring".into(),
      enabled: true,
      conditions: RuleConditions {
        user_impact: Some(UserImpactCondition {
          affected_users: 5,
          time_window_ms: 10 * 60 * 1000,
        }),
        ..Default::default()
      },
      actions: vec![
        NotificationAction {
          kind: ActionKind::Slack,
          target: "user-impact-alerts".into(),
          template: MessageTemplate::UserImpactAlert,
          priority: Severity::High,
          rate_limit: None,
        },
        NotificationAction {
          kind: ActionKind::Email,
          target: "support@example.com".into(),
          template: MessageTemplate::UserImpactAlert,
          priority: Severity::High,
          rate_limit: None,
        },
      ],
      escalation: None,
    },
    NotificationRule {
      id: "javascript-error-monitoring".into(),
      name: "JavaScript error monitoring".into(),
      enabled: true,
      conditions: RuleConditions {
        error_types: Some(vec!["javascript".into(), "promise".into()]),
        frequency: Some(FrequencyCondition {
          threshold: 15,
          time_window_ms: 15 * 60 * 1000,
        }),
        ..Default::default()
      },
      actions: vec![NotificationAction {
        kind: ActionKind::Slack,
        target: "dev-alerts".into(),
        template: MessageTemplate::JavascriptErrorAlert,
        priority: Severity::Medium,
        rate_limit: Some(RateLimitPolicy {
          max_per_hour: 6,
          cooldown_minutes: 10,
        }),
      }],
      escalation: None,
    },
  ]
}
