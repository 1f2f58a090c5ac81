//! Structured logging.
//!
//! # Design Decisions
//! - `tracing` with an `EnvFilter`: `RUST_LOG` wins when set
//! - Development mode defaults to verbose diagnostics, production to `info`
//! - Initialization is idempotent; the boundary may be re-entered in tests

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::schema::ListenerMode;

/// Initialize the tracing subscriber. Safe to call more than once; later
/// calls are no-ops.
pub fn init(mode: ListenerMode) {
    let default_filter = match mode {
        ListenerMode::Development => "tiergate=debug,tower_http=debug",
        ListenerMode::Production => "tiergate=info",
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
