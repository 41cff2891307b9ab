//! Stable signature computation for grouping similar errors.
//!
//! Messages and stack traces are stripped of volatile substrings (URLs,
//! paths, UUIDs, timestamps, large numbers) before hashing so that two
//! occurrences of the same underlying error hash identically. Collisions
//! merge groups and are acceptable; false splits are the failure mode to
//! avoid.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::Signature;

static URL_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());
static PATH_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?:[A-Za-z]:)?[\\/](?:[\w.-]+[\\/])+[\w.-]+").unwrap());
static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}").unwrap()
});
static TIMESTAMP_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").unwrap());
static NUMBER_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\b\d{3,}\b").unwrap());
static FRAME_PAREN_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\(\S+:\d+:\d+\)").unwrap());
static FRAME_LOCATION_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\s+at\s+\S+:\d+:\d+").unwrap());

/// Input to signature computation, borrowed from whatever event shape the
/// caller has.
#[derive(Debug, Clone, Copy)]
pub struct SignatureInput<'a> {
  pub error_type: &'a str,
  pub message: &'a str,
  pub stack_trace: Option<&'a str>,
  pub component_name: Option<&'a str>,
}

/// Compute a stable signature for an error.
///
/// Total function: normalization cannot fail, and equal inputs always yield
/// equal signatures. Uses blake3 truncated to 16 hex chars (64 bits).
pub fn compute(input: SignatureInput<'_>, max_stack_lines: usize) -> Signature {
  let normalized_message = normalize_message(input.message);
  let normalized_stack = input
    .stack_trace
    .map(|s| normalize_stack_trace(s, max_stack_lines))
    .unwrap_or_default();

  let mut hasher = blake3::Hasher::new();
  hasher.update(input.error_type.as_bytes());
  hasher.update(b"|");
  hasher.update(input.component_name.unwrap_or("unknown").as_bytes());
  hasher.update(b"|");
  hasher.update(normalized_message.as_bytes());
  hasher.update(b"|");
  hasher.update(normalized_stack.as_bytes());

  let hex = hasher.finalize().to_hex();
  Signature(hex[..16].to_string())
}

/// Strip volatile substrings from a message and lowercase it.
pub fn normalize_message(message: &str) -> String {
  let s = URL_RE.replace_all(message, "<url>");
  let s = UUID_RE.replace_all(&s, "<uuid>");
  let s = TIMESTAMP_RE.replace_all(&s, "<timestamp>");
  let s = PATH_RE.replace_all(&s, "<path>");
  let s = NUMBER_RE.replace_all(&s, "<id>");
  s.to_lowercase().trim().to_string()
}

/// Normalize the first `max_lines` lines of a stack trace, replacing
/// file:line:col fragments with placeholders.
pub fn normalize_stack_trace(stack_trace: &str, max_lines: usize) -> String {
  stack_trace
    .lines()
    .take(max_lines)
    .map(normalize_stack_line)
    .filter(|line| !line.is_empty())
    .collect::<Vec<_>>()
    .join("\n")
}

fn normalize_stack_line(line: &str) -> String {
  let s = FRAME_PAREN_RE.replace_all(line, "(<location>)");
  let s = FRAME_LOCATION_RE.replace_all(&s, " at <location>");
  let s = PATH_RE.replace_all(&s, "<path>");
  s.trim().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sig(error_type: &str, message: &str, stack: Option<&str>, component: Option<&str>) -> Signature {
    compute(
      SignatureInput {
        error_type,
        message,
        stack_trace: stack,
        component_name: component,
      },
      5,
    )
  }

  #[test]
  fn same_input_same_signature() {
    let a = sig("javascript", "cannot read property x", None, Some("Header"));
    let b = sig("javascript", "cannot read property x", None, Some("Header"));
    assert_eq!(a, b);
  }

  #[test]
  fn volatile_substrings_do_not_split_groups() {
    let a = sig(
      "api",
      "fetch failed for https://api.example.com/v1/items/12345 at 2025-01-15T10:30:00",
      None,
      None,
    );
    let b = sig(
      "api",
      "fetch failed for https://api.example.com/v1/items/99999 at 2025-02-20T08:00:00",
      None,
      None,
    );
    assert_eq!(a, b);
  }

  #[test]
  fn uuids_are_normalized() {
    let a = sig("api", "session deadbeef-dead-beef-dead-beefdeadbeef expired", None, None);
    let b = sig("api", "session 01234567-89ab-cdef-0123-456789abcdef expired", None, None);
    assert_eq!(a, b);
  }

  #[test]
  fn different_error_type_different_signature() {
    let a = sig("javascript", "boom", None, None);
    let b = sig("api", "boom", None, None);
    assert_ne!(a, b);
  }

  #[test]
  fn different_component_different_signature() {
    let a = sig("javascript", "boom", None, Some("Header"));
    let b = sig("javascript", "boom", None, Some("Footer"));
    assert_ne!(a, b);
  }

  #[test]
  fn stack_lines_beyond_limit_ignored() {
    let short = "Error: boom\n at handle (src/a.ts:1:1)";
    let long = format!("{}\n at deep (src/z.ts:9:9)", short);
    // With max 2 lines, the extra frame must not change the signature.
    let a = compute(
      SignatureInput {
        error_type: "javascript",
        message: "boom",
        stack_trace: Some(short),
        component_name: None,
      },
      2,
    );
    let b = compute(
      SignatureInput {
        error_type: "javascript",
        message: "boom",
        stack_trace: Some(&long),
        component_name: None,
      },
      2,
    );
    assert_eq!(a, b);
  }

  #[test]
  fn frame_locations_are_normalized() {
    let a = sig(
      "javascript",
      "boom",
      Some("Error: boom\n at handle (src/a.ts:42:10)"),
      None,
    );
    let b = sig(
      "javascript",
      "boom",
      Some("Error: boom\n at handle (src/a.ts:57:3)"),
      None,
    );
    assert_eq!(a, b);
  }

  #[test]
  fn signature_is_16_hex_chars() {
    let s = sig("javascript", "boom", None, None);
    assert_eq!(s.0.len(), 16);
    assert!(s.0.chars().all(|c| c.is_ascii_hexdigit()));
  }
}
