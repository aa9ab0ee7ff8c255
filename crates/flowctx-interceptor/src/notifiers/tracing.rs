//! Tracing notifier for outbound calls
//!
//! Emits structured tracing events for every instrumented outbound call,
//! before it is sent and after its response arrives.

use crate::notifier::OutgoingRequestNotifier;
use crate::request::{OutboundRequest, OutboundResponse};
use flowctx_core::{CorrelationContext, Result};
use tracing::{Level, info, span, warn};

/// Logs outbound calls with their child context.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRequestNotifier;

impl TracingRequestNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl<Req, Resp> OutgoingRequestNotifier<CorrelationContext, Req, Resp> for TracingRequestNotifier
where
    Req: OutboundRequest + ?Sized,
    Resp: OutboundResponse + ?Sized,
{
    fn on_before_request(&self, context: &CorrelationContext, request: &Req) -> Result<()> {
        let span = span!(
            Level::DEBUG,
            "outbound_call",
            correlation_id = %context.correlation_id(),
            child_request_id = ?context.child_request_id().map(|id| id.as_str()),
        );
        let _guard = span.enter();

        info!(
            uri = %request.uri(),
            context = %context,
            "outbound call starting"
        );
        Ok(())
    }

    fn on_after_response(&self, context: &CorrelationContext, response: &Resp) -> Result<()> {
        let span = span!(
            Level::DEBUG,
            "outbound_call_complete",
            correlation_id = %context.correlation_id(),
            child_request_id = ?context.child_request_id().map(|id| id.as_str()),
        );
        let _guard = span.enter();

        let status = response.status_code();
        if status >= 400 {
            warn!(status, success = false, "outbound call completed");
        } else {
            info!(status, success = true, "outbound call completed");
        }
        Ok(())
    }
}
