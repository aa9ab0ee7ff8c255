//! Observers of outbound calls.

use flowctx_core::Result;
use flowctx_observability::{metrics, spans};
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Receives the child context of each instrumented outbound call.
///
/// Failures never affect the call: errors and panics are logged and
/// dropped by the caller.
pub trait OutgoingRequestNotifier<C, Req: ?Sized, Resp: ?Sized>: Send + Sync {
    fn on_before_request(&self, context: &C, request: &Req) -> Result<()>;

    fn on_after_response(&self, context: &C, response: &Resp) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Before,
    After,
}

impl Phase {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Phase::Before => "before",
            Phase::After => "after",
        }
    }
}

/// Run one notifier callback, discarding its error or panic.
pub(crate) fn notify_safely<F>(phase: Phase, child_request_id: Option<&str>, callback: F)
where
    F: FnOnce() -> Result<()>,
{
    let span = spans::notify(phase.as_str(), child_request_id);
    let _guard = span.enter();

    match catch_unwind(AssertUnwindSafe(callback)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(error = %e, phase = phase.as_str(), "outgoing request notifier failed");
            metrics::record_notifier_error(phase.as_str());
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::warn!(panic = %message, phase = phase.as_str(), "outgoing request notifier panicked");
            metrics::record_notifier_error(phase.as_str());
        }
    }
}
