//! Severity classification and actionable suggestions for single errors.
//!
//! Deterministic decision tables, evaluated top-down, first match wins.

use crate::types::{Classification, Severity};

fn message_contains_any(message: &str, tokens: &[&str]) -> bool {
  tokens.iter().any(|t| message.contains(t))
}

/// Classify an error's severity from its type, message, and URL context.
pub fn classify_severity(error_type: &str, message: &str, _url: Option<&str>) -> Severity {
  let message = message.to_lowercase();

  if matches!(error_type, "critical" | "auth" | "security")
    || message_contains_any(
      &message,
      &["payment", "billing", "security", "unauthorized"],
    )
  {
    return Severity::Critical;
  }

  if matches!(error_type, "api")
    || message_contains_any(&message, &["auth", "login", "signup", "database"])
  {
    return Severity::High;
  }

  if matches!(error_type, "javascript" | "performance")
    || message_contains_any(&message, &["network", "fetch", "timeout"])
  {
    return Severity::Medium;
  }

  Severity::Low
}

/// Coarse category label for an error.
pub fn classify_error(error_type: &str, message: &str, component_name: Option<&str>) -> Classification {
  let message = message.to_lowercase();

  if error_type == "api" || message.contains("fetch") || message.contains("api") {
    return Classification::ApiCommunication;
  }
  if error_type == "auth" || message.contains("auth") || message.contains("login") {
    return Classification::Authentication;
  }
  if error_type == "performance" || message.contains("memory") || message.contains("timeout") {
    return Classification::Performance;
  }
  if message.contains("render") || message.contains("component") || component_name.is_some() {
    return Classification::UiRendering;
  }
  if message.contains("network") || message.contains("connection") {
    return Classification::Network;
  }
  if error_type == "javascript" {
    return Classification::Runtime;
  }

  Classification::General
}

/// Actionable suggestions keyed off severity and type/message keywords.
pub fn suggestions_for(error_type: &str, message: &str, severity: Severity) -> Vec<String> {
  let message = message.to_lowercase();
  let mut suggestions: Vec<String> = Vec::new();

  match severity {
    Severity::Critical => {
      suggestions.push("Immediate response required".into());
      suggestions.push("Escalate to the owning team".into());
    }
    Severity::High => {
      suggestions.push("Prioritize a fix".into());
      suggestions.push("Schedule for the next release".into());
    }
    _ => {}
  }

  match error_type {
    "api" => {
      suggestions.push("Check the API endpoint's health".into());
      suggestions.push("Consider adding a retry mechanism".into());
    }
    "auth" => {
      suggestions.push("Review the authentication flow".into());
      suggestions.push("Improve session management".into());
    }
    "javascript" => {
      suggestions.push("Inspect the stack trace to locate the bug".into());
      suggestions.push("Add a unit test for the failing code".into());
    }
    "performance" => {
      suggestions.push("Run a performance optimization pass".into());
      suggestions.push("Tighten memory usage monitoring".into());
    }
    _ => {}
  }

  if message.contains("network") || message.contains("fetch") {
    suggestions.push("Check network connectivity stability".into());
    suggestions.push("Consider an offline fallback".into());
  }
  if message.contains("timeout") {
    suggestions.push("Adjust the timeout budget".into());
    suggestions.push("Consider moving the work to async processing".into());
  }
  if message.contains("memory") {
    suggestions.push("Investigate for memory leaks".into());
    suggestions.push("Release unused resources".into());
  }

  if suggestions.is_empty() {
    suggestions.push("Review the error log details".into());
    suggestions.push("Identify reproduction steps".into());
  }

  suggestions
}
