//! Alert engine: rule-based error notification and analysis.
//!
//! Ingests structured error events, evaluates notification rules
//! (type/severity/component filters, frequency and user-impact thresholds),
//! gates matching actions through frequency suppression, per-channel rate
//! limits and cooldowns, dispatches through registered notifier
//! capabilities, and schedules one-shot escalations. A separate pull-based
//! analysis surface dedups events into signature patterns, computes
//! period-over-period trends, and derives insights.
//!
//! No DB; pure computation + in-memory state. Delivery and metrics backends
//! plug in behind the [`notify::Notifier`] and [`notify::MetricsSource`]
//! traits.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod insights;
pub mod limits;
pub mod notify;
pub mod patterns;
pub mod registry;
pub mod signature;
pub mod template;
pub mod trends;
pub mod types;

pub use config::EngineConfig;
pub use engine::{Engine, EngineBuilder};
pub use error::EngineError;
pub use notify::{LogNotifier, MetricsSource, Notifier, NullMetrics};
pub use template::{MessageTemplate, RenderedMessage};
pub use types::{ErrorEvent, ErrorInsight, ErrorPattern, ErrorTrend, NotificationRule};
