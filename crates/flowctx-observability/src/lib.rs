//! Observability helpers: tracing setup, span constructors and metrics.

pub mod metrics;
pub mod spans;
pub mod tracing_setup;
