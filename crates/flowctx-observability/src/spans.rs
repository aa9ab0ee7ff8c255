//! Span helpers for correlation instrumentation.
//!
//! All span names use the `flowctx.` namespace prefix for low cardinality.

use flowctx_core::correlation::current_correlation_id;
use std::fmt;
use tracing::Span;

fn correlation_field() -> String {
    current_correlation_id()
        .map(|id| id.into_string())
        .unwrap_or_else(|| "none".to_string())
}

/// Create span for handling one inbound request.
///
/// Children: outbound_request
#[inline]
pub fn inbound_request(context: &dyn fmt::Display) -> Span {
    tracing::info_span!("flowctx.inbound_request", context = %context)
}

/// Create span for an outbound call made while handling a request.
///
/// Parent: inbound_request
#[inline]
pub fn outbound_request(uri: &str) -> Span {
    tracing::debug_span!(
        "flowctx.outbound_request",
        uri = uri,
        correlation_id = correlation_field(),
    )
}

/// Create span for an outgoing-request notifier callback.
///
/// Parent: outbound_request
#[inline]
pub fn notify(phase: &'static str, child_request_id: Option<&str>) -> Span {
    tracing::trace_span!(
        "flowctx.notify",
        phase = phase,
        child_request_id = child_request_id.unwrap_or("none"),
    )
}
