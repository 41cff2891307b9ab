//! Trend analysis: aggregate counts per period and compare two periods.

use crate::types::{ErrorAggregate, ErrorEvent, ErrorTrend, TrendDelta};

/// Count a batch of events by type, component, and severity.
pub fn aggregate(events: &[ErrorEvent]) -> ErrorAggregate {
  let mut stats = ErrorAggregate {
    total: events.len(),
    ..Default::default()
  };

  for event in events {
    *stats.by_type.entry(event.error_type.clone()).or_insert(0) += 1;

    let component = event.component_name.as_deref().unwrap_or("unknown");
    *stats.by_component.entry(component.to_string()).or_insert(0) += 1;

    *stats.by_severity.entry(event.severity.as_str().to_string()).or_insert(0) += 1;
  }

  stats
}

/// Compare the current period against the previous one.
///
/// `percentage` is `round(delta / previous_total * 100)` with halves rounded
/// toward positive infinity (-12.5 becomes -12); when the previous period is
/// empty it is 100 for a positive delta and 0 otherwise.
pub fn analyze_trends(current_period: &[ErrorEvent], previous_period: &[ErrorEvent]) -> ErrorTrend {
  let current = aggregate(current_period);
  let previous = aggregate(previous_period);

  let total_delta = current.total as i64 - previous.total as i64;
  let percentage = if previous.total > 0 {
    (total_delta as f64 / previous.total as f64 * 100.0 + 0.5).floor() as i64
  } else if total_delta > 0 {
    100
  } else {
    0
  };

  ErrorTrend {
    total_errors: current.total,
    by_type: current.by_type,
    by_component: current.by_component,
    by_severity: current.by_severity,
    change_from_previous: TrendDelta {
      total: total_delta,
      percentage,
    },
  }
}
