//! Pattern aggregation: group a batch of errors by signature and derive
//! per-group metadata (counts, affected users/components, tags, actions).
//!
//! Pure function of its input batch; runs off the per-event hot path.

use std::collections::{HashMap, HashSet};

use crate::config::EngineConfig;
use crate::signature::{self, SignatureInput};
use crate::types::{ErrorEvent, ErrorPattern, PatternStatus, Severity, Signature};

/// Group a batch of events into patterns, sorted by occurrence count
/// (descending). Deterministic for a given input batch: groups keep
/// first-occurrence order and the sort is stable.
pub fn analyze_patterns(events: &[ErrorEvent], config: &EngineConfig) -> Vec<ErrorPattern> {
  let mut order: Vec<Signature> = Vec::new();
  let mut groups: HashMap<Signature, Vec<&ErrorEvent>> = HashMap::new();

  for event in events {
    let sig = signature::compute(
      SignatureInput {
        error_type: &event.error_type,
        message: &event.message,
        stack_trace: event.stack_trace.as_deref(),
        component_name: event.component_name.as_deref(),
      },
      config.signature_max_stack_lines,
    );
    let members = groups.entry(sig.clone()).or_insert_with(|| {
      order.push(sig.clone());
      Vec::new()
    });
    members.push(event);
  }

  let mut patterns: Vec<ErrorPattern> = order
    .into_iter()
    .map(|sig| {
      let members = &groups[&sig];
      build_pattern(sig, members, config)
    })
    .collect();

  patterns.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
  patterns
}

fn build_pattern(sig: Signature, members: &[&ErrorEvent], config: &EngineConfig) -> ErrorPattern {
  let representative = members[0];
  let occurrences = members.len();

  let first_seen = members.iter().map(|e| e.timestamp).min().unwrap_or(representative.timestamp);
  let last_seen = members.iter().map(|e| e.timestamp).max().unwrap_or(representative.timestamp);

  let affected_users = dedup_preserving_order(members.iter().filter_map(|e| e.user_id.clone()));
  let affected_components =
    dedup_preserving_order(members.iter().filter_map(|e| e.component_name.clone()));

  let traces: Vec<&str> = members.iter().filter_map(|e| e.stack_trace.as_deref()).collect();
  let common_stack_trace = find_common_stack_trace(&traces, config.signature_max_stack_lines);

  let severity = pattern_severity(representative.severity, occurrences, affected_users.len());

  ErrorPattern {
    id: format!("pattern_{}", sig.0),
    signature: sig,
    title: pattern_title(representative, config.title_max_len),
    description: pattern_description(representative, occurrences),
    occurrences,
    first_seen,
    last_seen,
    error_type: representative.error_type.clone(),
    severity,
    suggested_actions: suggested_actions(representative, occurrences, &affected_components),
    tags: pattern_tags(representative, occurrences, &affected_components),
    affected_users,
    affected_components,
    common_stack_trace,
    status: PatternStatus::New,
  }
}

fn dedup_preserving_order(items: impl Iterator<Item = String>) -> Vec<String> {
  let mut seen = HashSet::new();
  let mut out = Vec::new();
  for item in items {
    if seen.insert(item.clone()) {
      out.push(item);
    }
  }
  out
}

/// The longest prefix of the first trace's lines that appears, normalized,
/// in every member's normalized trace. Falls back to the first trace when no
/// common prefix exists; `None` when no member carries a trace.
fn find_common_stack_trace(traces: &[&str], max_lines: usize) -> Option<String> {
  match traces {
    [] => return None,
    [only] => return Some((*only).to_string()),
    _ => {}
  }

  let normalized: Vec<String> = traces
    .iter()
    .map(|t| signature::normalize_stack_trace(t, max_lines))
    .collect();

  let mut common: Vec<&str> = Vec::new();
  for line in traces[0].lines() {
    let needle = signature::normalize_stack_trace(line, max_lines);
    if needle.is_empty() || !normalized.iter().all(|stack| stack.contains(&needle)) {
      break;
    }
    common.push(line);
  }

  if common.is_empty() {
    Some(traces[0].to_string())
  } else {
    Some(common.join("\n"))
  }
}

fn pattern_title(event: &ErrorEvent, max_len: usize) -> String {
  let component = event
    .component_name
    .as_deref()
    .map(|c| format!("[{}] ", c))
    .unwrap_or_default();

  let mut chars = event.error_type.chars();
  let type_label = match chars.next() {
    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    None => String::new(),
  };

  let mut message = event.message.clone();
  if message.chars().count() > max_len {
    message = message.chars().take(max_len.saturating_sub(3)).collect::<String>() + "...";
  }

  format!("{}{}: {}", component, type_label, message)
}

fn frequency_qualifier(occurrences: usize) -> &'static str {
  if occurrences > 10 {
    "frequently"
  } else if occurrences > 5 {
    "occasionally"
  } else {
    "rarely"
  }
}

fn pattern_description(event: &ErrorEvent, occurrences: usize) -> String {
  let location = event
    .component_name
    .as_deref()
    .map(|c| format!(" in the {} component", c))
    .unwrap_or_default();

  format!(
    "This error occurs {}{} ({} occurrences). A {} error that needs follow-up.",
    frequency_qualifier(occurrences),
    location,
    occurrences,
    event.error_type
  )
}

fn suggested_actions(
  event: &ErrorEvent,
  occurrences: usize,
  affected_components: &[String],
) -> Vec<String> {
  let mut actions: Vec<String> = Vec::new();

  match event.error_type.as_str() {
    "javascript" => {
      actions.push("Inspect the stack trace to locate the bug".into());
      actions.push("Add a unit test for the failing code".into());
    }
    "api" => {
      actions.push("Check the API endpoint's health".into());
      actions.push("Consider adding a retry mechanism".into());
      actions.push("Improve error handling around the call".into());
    }
    "auth" => {
      actions.push("Review the authentication flow".into());
      actions.push("Improve session management".into());
    }
    "resource" => {
      actions.push("Review how the resource is loaded".into());
      actions.push("Implement a fallback".into());
    }
    "performance" => {
      actions.push("Run a performance optimization pass".into());
      actions.push("Tighten memory usage monitoring".into());
    }
    _ => {}
  }

  if occurrences > 20 {
    actions.push("High-priority fix required".into());
    actions.push("Consider shipping a hotfix".into());
  } else if occurrences > 5 {
    actions.push("Plan a fix for the next release".into());
  }

  if affected_components.len() > 3 {
    actions.push("Consider fixing a shared library or utility".into());
  }

  actions
}

fn pattern_tags(event: &ErrorEvent, occurrences: usize, affected_components: &[String]) -> Vec<String> {
  let mut tags: Vec<String> = vec![event.error_type.clone()];

  if occurrences > 20 {
    tags.push("high-frequency".into());
  } else if occurrences > 5 {
    tags.push("medium-frequency".into());
  } else {
    tags.push("low-frequency".into());
  }

  if affected_components.len() > 1 {
    tags.push("multi-component".into());
  }
  if affected_components.iter().any(|c| c.to_lowercase().contains("auth")) {
    tags.push("auth-related".into());
  }
  if affected_components.iter().any(|c| c.to_lowercase().contains("api")) {
    tags.push("api-related".into());
  }

  let message = event.message.to_lowercase();
  if message.contains("network") || message.contains("fetch") {
    tags.push("network".into());
  }
  if message.contains("permission") || message.contains("unauthorized") {
    tags.push("security".into());
  }
  if message.contains("memory") || message.contains("quota") {
    tags.push("resource".into());
  }

  tags
}

/// Blend the representative severity with occurrence and user-impact weights.
fn pattern_severity(base: Severity, occurrences: usize, affected_users: usize) -> Severity {
  let mut score = base.score();

  if occurrences > 50 {
    score += 2.0;
  } else if occurrences > 20 {
    score += 1.0;
  } else if occurrences > 10 {
    score += 0.5;
  }

  if affected_users > 20 {
    score += 2.0;
  } else if affected_users > 10 {
    score += 1.0;
  } else if affected_users > 5 {
    score += 0.5;
  }

  if score >= 6.0 {
    Severity::Critical
  } else if score >= 4.0 {
    Severity::High
  } else if score >= 2.5 {
    Severity::Medium
  } else {
    Severity::Low
  }
}
