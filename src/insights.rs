//! Derive human-readable insights from patterns and trend deltas.

use crate::types::{
  ErrorInsight, ErrorPattern, ErrorTrend, InsightData, InsightKind, InsightSeverity,
  PatternStatus, Severity, TrendDelta,
};

/// Emit zero or more insights (spike, new patterns, critical patterns,
/// improvement) from an analysis run.
pub fn generate_insights(patterns: &[ErrorPattern], trend: &ErrorTrend) -> Vec<ErrorInsight> {
  let mut insights: Vec<ErrorInsight> = Vec::new();
  let delta = &trend.change_from_previous;

  if delta.percentage > 50 && delta.total > 10 {
    insights.push(ErrorInsight {
      kind: InsightKind::Spike,
      title: "Error spike detected".into(),
      description: format!(
        "Errors are up {}% versus the previous period (+{} events)",
        delta.percentage, delta.total
      ),
      severity: InsightSeverity::Error,
      data: InsightData::TrendDelta(TrendDelta {
        total: delta.total,
        percentage: delta.percentage,
      }),
      actionable: true,
      suggested_actions: vec![
        "Review recent deployments".into(),
        "Prioritize the highest-frequency error patterns".into(),
        "Consider tightening monitoring alerts".into(),
      ],
    });
  }

  let new_patterns: Vec<ErrorPattern> = patterns
    .iter()
    .filter(|p| p.status == PatternStatus::New && p.occurrences > 3)
    .cloned()
    .collect();
  if !new_patterns.is_empty() {
    insights.push(ErrorInsight {
      kind: InsightKind::NewError,
      title: format!("{} new error pattern(s) detected", new_patterns.len()),
      description: "New error patterns were found and need investigation.".into(),
      severity: InsightSeverity::Warning,
      data: InsightData::Patterns(new_patterns),
      actionable: true,
      suggested_actions: vec![
        "Investigate the new error patterns".into(),
        "Check related code changes".into(),
        "Triage and prioritize the patterns".into(),
      ],
    });
  }

  let critical_patterns: Vec<ErrorPattern> = patterns
    .iter()
    .filter(|p| p.severity == Severity::Critical)
    .cloned()
    .collect();
  if !critical_patterns.is_empty() {
    insights.push(ErrorInsight {
      kind: InsightKind::Regression,
      title: format!("{} critical error pattern(s)", critical_patterns.len()),
      description: "Critical errors requiring immediate response are occurring.".into(),
      severity: InsightSeverity::Error,
      data: InsightData::Patterns(critical_patterns),
      actionable: true,
      suggested_actions: vec![
        "Fix critical errors first".into(),
        "Assess impact on affected users".into(),
        "Consider shipping a hotfix".into(),
      ],
    });
  }

  if delta.percentage < -20 && delta.total < -5 {
    insights.push(ErrorInsight {
      kind: InsightKind::Improvement,
      title: "Error volume improving".into(),
      description: format!("Errors are down {}% versus the previous period", delta.percentage.abs()),
      severity: InsightSeverity::Info,
      data: InsightData::TrendDelta(TrendDelta {
        total: delta.total,
        percentage: delta.percentage,
      }),
      actionable: false,
      suggested_actions: vec![
        "Analyze and document what improved".into(),
        "Apply the same practices elsewhere".into(),
      ],
    });
  }

  insights
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use std::collections::HashMap;

  fn trend_with_delta(total: i64, percentage: i64) -> ErrorTrend {
    ErrorTrend {
      total_errors: 0,
      by_type: HashMap::new(),
      by_component: HashMap::new(),
      by_severity: HashMap::new(),
      change_from_previous: TrendDelta { total, percentage },
    }
  }

  fn make_pattern(severity: Severity, occurrences: usize, status: PatternStatus) -> ErrorPattern {
    let now = Utc::now();
    ErrorPattern {
      id: "pattern_abc".into(),
      signature: crate::types::Signature("abc".into()),
      title: "t".into(),
      description: "d".into(),
      occurrences,
      first_seen: now,
      last_seen: now,
      error_type: "api".into(),
      severity,
      affected_users: vec![],
      affected_components: vec![],
      common_stack_trace: None,
      suggested_actions: vec![],
      tags: vec![],
      status,
    }
  }

  #[test]
  fn spike_fires_above_both_thresholds() {
    // previous=20 current=35 -> +15 / +75%.
    let insights = generate_insights(&[], &trend_with_delta(15, 75));
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].kind, InsightKind::Spike);
    assert!(insights[0].actionable);
  }

  #[test]
  fn small_increase_is_not_a_spike() {
    // previous=20 current=22 -> +2 / +10%.
    let insights = generate_insights(&[], &trend_with_delta(2, 10));
    assert!(insights.is_empty());
  }

  #[test]
  fn spike_needs_absolute_delta_too() {
    // Huge percentage on a tiny base must not fire.
    let insights = generate_insights(&[], &trend_with_delta(4, 400));
    assert!(insights.is_empty());
  }

  #[test]
  fn new_patterns_need_more_than_three_occurrences() {
    let quiet = make_pattern(Severity::Low, 2, PatternStatus::New);
    let noisy = make_pattern(Severity::Low, 4, PatternStatus::New);
    let resolved = make_pattern(Severity::Low, 9, PatternStatus::Resolved);

    let insights =
      generate_insights(&[quiet, noisy, resolved], &trend_with_delta(0, 0));
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].kind, InsightKind::NewError);
    match &insights[0].data {
      InsightData::Patterns(p) => assert_eq!(p.len(), 1),
      _ => panic!("expected pattern data"),
    }
  }

  #[test]
  fn critical_patterns_always_surface() {
    let critical = make_pattern(Severity::Critical, 1, PatternStatus::Investigating);
    let insights = generate_insights(&[critical], &trend_with_delta(0, 0));
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].kind, InsightKind::Regression);
    assert_eq!(insights[0].severity, InsightSeverity::Error);
  }

  #[test]
  fn improvement_is_informational() {
    let insights = generate_insights(&[], &trend_with_delta(-8, -40));
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].kind, InsightKind::Improvement);
    assert!(!insights[0].actionable);
    assert_eq!(insights[0].severity, InsightSeverity::Info);
  }
}
