//! Message templates for outbound notifications.
//!
//! A closed enum instead of free-form template ids: a typo in a rule
//! definition fails at deserialization instead of silently rendering the
//! generic template.

use serde::{Deserialize, Serialize};

use crate::types::ErrorEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageTemplate {
  CriticalError,
  HighFrequencyAlert,
  ApiErrorAlert,
  UserImpactAlert,
  JavascriptErrorAlert,
  Generic,
}

/// Channel-agnostic rendered notification. Channel adapters own any further
/// formatting (Slack blocks, HTML mail, ...).
#[derive(Debug, Clone, Serialize)]
pub struct RenderedMessage {
  pub subject: String,
  pub body: String,
}

/// Render a template against an event. Escalated re-sends carry the level in
/// the subject so operators can tell a follow-up from the original alert.
pub fn render(template: MessageTemplate, event: &ErrorEvent, escalation_level: u32) -> RenderedMessage {
  let suffix = if escalation_level > 0 {
    format!(" (escalation level {})", escalation_level)
  } else {
    String::new()
  };
  let component = event.component_name.as_deref().unwrap_or("unknown");

  match template {
    MessageTemplate::CriticalError => RenderedMessage {
      subject: format!("Critical error{}", suffix),
      body: format!(
        "error type: {}\nseverity: {}\ncomponent: {}\nurl: {}\n\nmessage:\n{}\n\nsession: {} | time: {}",
        event.error_type,
        event.severity.as_str(),
        component,
        event.url,
        event.message,
        event.session_id,
        event.timestamp.to_rfc3339(),
      ),
    },
    MessageTemplate::HighFrequencyAlert => RenderedMessage {
      subject: format!("High-frequency error detected{}", suffix),
      body: format!(
        "{} errors are recurring over a short window.\n\nlatest message: {}\nurl: {}",
        event.error_type, event.message, event.url,
      ),
    },
    MessageTemplate::ApiErrorAlert => RenderedMessage {
      subject: format!("API error detected{}", suffix),
      body: format!(
        "An API error is occurring.\n\nendpoint: {}\nerror: {}",
        event.url, event.message,
      ),
    },
    MessageTemplate::UserImpactAlert => RenderedMessage {
      subject: format!("User impact alert{}", suffix),
      body: format!(
        "An error is affecting multiple users.\n\nerror type: {}\nmessage: {}\nurgent response required",
        event.error_type, event.message,
      ),
    },
    MessageTemplate::JavascriptErrorAlert => RenderedMessage {
      subject: format!("JavaScript error{}", suffix),
      body: format!(
        "component: {}\nmessage: {}\nurl: {}",
        component, event.message, event.url,
      ),
    },
    MessageTemplate::Generic => RenderedMessage {
      subject: format!("Error notification{}: {}", suffix, event.message),
      body: format!(
        "error: {}\ntype: {}\nurl: {}",
        event.message, event.error_type, event.url,
      ),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::Severity;
  use chrono::Utc;

  fn make_event() -> ErrorEvent {
    ErrorEvent {
      id: "e1".into(),
      error_type: "api".into(),
      severity: Severity::High,
      message: "upstream 502".into(),
      stack_trace: None,
      component_name: None,
      action_type: None,
      url: "/api/items".into(),
      session_id: "s1".into(),
      user_id: None,
      timestamp: Utc::now(),
    }
  }

  #[test]
  fn escalation_level_appears_in_subject() {
    let event = make_event();
    let original = render(MessageTemplate::CriticalError, &event, 0);
    let escalated = render(MessageTemplate::CriticalError, &event, 1);
    assert!(!original.subject.contains("escalation"));
    assert!(escalated.subject.contains("escalation level 1"));
  }

  #[test]
  fn unknown_template_id_fails_deserialization() {
    let err = serde_json::from_str::<MessageTemplate>("\"critical-eror\"");
    assert!(err.is_err());
    let ok = serde_json::from_str::<MessageTemplate>("\"critical-error\"").unwrap();
    assert_eq!(ok, MessageTemplate::CriticalError);
  }

  #[test]
  fn missing_component_renders_as_unknown() {
    let event = make_event();
    let message = render(MessageTemplate::JavascriptErrorAlert, &event, 0);
    assert!(message.body.contains("component: unknown"));
  }
}
