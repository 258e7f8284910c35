//! Logging
//!
//! Process-wide `tracing` setup and the player activity log.

pub mod activity;

pub use activity::{ActivityEvent, ActivityKind, ActivityLogger};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogFormat;

/// Install the global subscriber. `RUST_LOG` overrides `log_level`.
pub fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("quizhero={},info", log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}
