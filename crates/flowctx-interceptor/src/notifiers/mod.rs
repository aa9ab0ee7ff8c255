//! Built-in notifier implementations.

pub mod tracing;

pub use tracing::TracingRequestNotifier;
