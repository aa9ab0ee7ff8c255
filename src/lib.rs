//! Correlation propagation for distributed requests.
//!
//! Establishes a correlation context when a request arrives, keeps it
//! reachable from everything running underneath that request, and writes
//! derived identifiers onto the outbound calls it makes.

pub use flowctx_core::{ambient, context, correlation, error, ids};
pub use flowctx_interceptor as interceptor;
pub use flowctx_observability as observability;

pub use flowctx_core::{
    ContextGuard, ContextSlot, CorrelationContext, CorrelationId, DeriveChild, FlowCtxError,
    FlowSnapshot, RequestId, Result,
};
pub use flowctx_interceptor::{
    ClientBuilder, ContextFactory, ContextInjector, CorrelationConfig, CorrelationContextFactory,
    CorrelationContextInjector, CorrelationSettings, EndpointFilter, EndpointValidator,
    HeaderNames, InboundRequest, Instrumentation, InstrumentationConfig, InstrumentedClient,
    OutboundRequest, OutgoingRequestNotifier, RequestSender, TraceIdentifier,
    TracingRequestNotifier,
};
