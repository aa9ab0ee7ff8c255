//! OpenTelemetry metrics helpers.
//!
//! Metrics are defined here to keep instrumentation orthogonal to business logic.
//! Without an installed meter provider every call is a no-op.

use opentelemetry::metrics::Counter;
use opentelemetry::{KeyValue, global};
use std::sync::OnceLock;

const METER_NAME: &str = "flowctx";

static INBOUND_CONTEXT_COUNTER: OnceLock<Counter<u64>> = OnceLock::new();
static OUTBOUND_REQUEST_COUNTER: OnceLock<Counter<u64>> = OnceLock::new();
static NOTIFIER_ERROR_COUNTER: OnceLock<Counter<u64>> = OnceLock::new();

fn inbound_context_counter() -> &'static Counter<u64> {
    INBOUND_CONTEXT_COUNTER.get_or_init(|| {
        global::meter(METER_NAME)
            .u64_counter("flowctx.inbound.context_total")
            .init()
    })
}

fn outbound_request_counter() -> &'static Counter<u64> {
    OUTBOUND_REQUEST_COUNTER.get_or_init(|| {
        global::meter(METER_NAME)
            .u64_counter("flowctx.outbound.request_total")
            .init()
    })
}

fn notifier_error_counter() -> &'static Counter<u64> {
    NOTIFIER_ERROR_COUNTER.get_or_init(|| {
        global::meter(METER_NAME)
            .u64_counter("flowctx.notifier.error_total")
            .init()
    })
}

/// Record a context established for an inbound request.
///
/// `generated` is true when the correlation id was not supplied upstream.
pub fn record_inbound_context(generated: bool) {
    let attributes = &[KeyValue::new("generated", generated.to_string())];
    inbound_context_counter().add(1, attributes);
}

/// Record an outbound call and how instrumentation treated it.
pub fn record_outbound_request(result: &str) {
    let attributes = &[KeyValue::new("result", result.to_string())];
    outbound_request_counter().add(1, attributes);
}

/// Record a swallowed notifier failure.
pub fn record_notifier_error(phase: &str) {
    let attributes = &[KeyValue::new("phase", phase.to_string())];
    notifier_error_counter().add(1, attributes);
}
