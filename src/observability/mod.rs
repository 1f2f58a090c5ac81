//! Observability subsystem: structured logging and performance counters.

pub mod logging;
pub mod metrics;
