//! Building the context for an inbound request.

use crate::headers::HeaderNames;
use crate::request::InboundRequest;
use flowctx_core::{CorrelationContext, CorrelationId, FlowCtxError, RequestId, Result};
use flowctx_observability::metrics;

/// Creates a context from an inbound request.
pub trait ContextFactory<C, R: ?Sized>: Send + Sync {
    fn create_context(&self, request: &R) -> Result<C>;

    /// Same as [`create_context`](Self::create_context) for callers holding
    /// an optional request.
    fn create_context_opt(&self, request: Option<&R>) -> Result<C> {
        match request {
            Some(request) => self.create_context(request),
            None => Err(FlowCtxError::invalid_argument("request is required")),
        }
    }
}

/// Reads the correlation and request id headers, generating whatever is
/// missing.
///
/// The request id falls back to the host's [`TraceIdentifier`] before a
/// fresh id is generated.
///
/// [`TraceIdentifier`]: crate::request::TraceIdentifier
#[derive(Debug, Clone, Default)]
pub struct CorrelationContextFactory {
    headers: HeaderNames,
}

impl CorrelationContextFactory {
    pub fn new(headers: HeaderNames) -> Self {
        Self { headers }
    }

    pub fn headers(&self) -> &HeaderNames {
        &self.headers
    }
}

impl<R: InboundRequest + ?Sized> ContextFactory<CorrelationContext, R> for CorrelationContextFactory {
    fn create_context(&self, request: &R) -> Result<CorrelationContext> {
        let supplied = non_blank(request.header(self.headers.correlation_id()));
        let generated = supplied.is_none();
        let correlation_id = supplied
            .map(str::to_string)
            .unwrap_or_else(|| CorrelationId::generate().into_string());

        let request_id = non_blank(request.header(self.headers.request_id()))
            .or_else(|| non_blank(request.trace_identifier()))
            .map(str::to_string)
            .unwrap_or_else(|| RequestId::generate().into_string());

        tracing::debug!(
            correlation_id = %correlation_id,
            request_id = %request_id,
            generated,
            "created correlation context"
        );
        metrics::record_inbound_context(generated);

        CorrelationContext::with_request_id(correlation_id, request_id)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
