//! Binary entrypoint: read error events as JSON lines from stdin, run them
//! through the default rule set with a logging notifier, and write analysis
//! output as JSON lines to stdout.
//!
//! Per input line: the event's analysis (signature, severity,
//! classification, suggestions). After EOF: a batch report with the
//! detected patterns, trend, insights, and engine stats.
//!
//! Logs go to stderr via tracing; filter with RUST_LOG.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use serde::Serialize;
use tracing_subscriber::EnvFilter;

use alert_engine::types::{
  ActionKind, EngineStats, ErrorInsight, ErrorPattern, ErrorTrend, NotificationRecord,
};
use alert_engine::{Engine, ErrorEvent, LogNotifier};

#[derive(Serialize)]
struct BatchReport {
  patterns: Vec<ErrorPattern>,
  trend: ErrorTrend,
  insights: Vec<ErrorInsight>,
  history: Vec<NotificationRecord>,
  stats: EngineStats,
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let notifier = Arc::new(LogNotifier);
  let engine = Engine::builder()
    .notifier(ActionKind::Slack, notifier.clone())
    .notifier(ActionKind::Email, notifier.clone())
    .notifier(ActionKind::Discord, notifier.clone())
    .notifier(ActionKind::Webhook, notifier.clone())
    .notifier(ActionKind::Sms, notifier)
    .build();
  engine.start();

  let stdin = io::stdin();
  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());
  let mut events: Vec<ErrorEvent> = Vec::new();

  for line in stdin.lock().lines() {
    let line = match line {
      Ok(l) => l,
      Err(e) => {
        tracing::error!(error = %e, "stdin read error");
        std::process::exit(1);
      }
    };

    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    let event = match ErrorEvent::from_json(trimmed) {
      Ok(v) => v,
      Err(e) => {
        tracing::warn!(error = %e, "skipping invalid event");
        continue;
      }
    };

    let analysis = engine.analyze_event(&event);
    let _ = serde_json::to_writer(&mut out, &analysis);
    let _ = writeln!(out);

    engine.process_event(&event).await;
    events.push(event);
  }

  let patterns = engine.analyze_patterns(&events);
  let trend = engine.analyze_trends(&events, &[]);
  let insights = engine.generate_insights(&patterns, &trend);
  let report = BatchReport {
    patterns,
    trend,
    insights,
    history: engine.get_history(),
    stats: engine.get_stats(),
  };
  let _ = serde_json::to_writer(&mut out, &report);
  let _ = writeln!(out);
  let _ = out.flush();

  engine.shutdown();
}
