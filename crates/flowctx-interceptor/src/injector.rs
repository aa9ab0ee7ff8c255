//! Writing the context onto an outbound request.

use crate::headers::HeaderNames;
use crate::request::{OutboundRequest, header_value};
use flowctx_core::{CorrelationContext, FlowCtxError, RequestId, Result};

/// Writes a context onto an outbound request.
pub trait ContextInjector<C, R: ?Sized>: Send + Sync {
    fn update_request(&self, context: &C, request: &mut R) -> Result<()>;
}

/// Sets the correlation id header and a freshly generated request id header.
#[derive(Debug, Clone, Default)]
pub struct CorrelationContextInjector {
    headers: HeaderNames,
}

impl CorrelationContextInjector {
    pub fn new(headers: HeaderNames) -> Self {
        Self { headers }
    }

    pub fn headers(&self) -> &HeaderNames {
        &self.headers
    }
}

impl<R: OutboundRequest + ?Sized> ContextInjector<CorrelationContext, R> for CorrelationContextInjector {
    fn update_request(&self, context: &CorrelationContext, request: &mut R) -> Result<()> {
        let correlation_header = self.headers.correlation_id();
        if request.contains_header(correlation_header) {
            return Err(FlowCtxError::HeaderConflict {
                header: correlation_header.to_string(),
            });
        }

        let correlation_id = context.correlation_id().as_str();
        // Validated up front so a failure leaves the request untouched.
        header_value(correlation_header, correlation_id)?;

        let request_id = RequestId::generate();
        request.insert_header(correlation_header, correlation_id)?;
        request.insert_header(self.headers.request_id(), request_id.as_str())?;

        tracing::trace!(
            correlation_id,
            request_id = %request_id,
            "injected correlation headers"
        );
        Ok(())
    }
}

/// The request id written onto `request` by an injector, if any.
pub fn child_request_id<R: OutboundRequest + ?Sized>(
    request: &R,
    headers: &HeaderNames,
) -> Option<String> {
    request
        .header(headers.request_id())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
