//! Common test utilities: request builders and preset instrumentation.

pub use crate::support::notifiers::*;
pub use crate::support::senders::*;

use flowctx_interceptor::{CorrelationConfig, Instrumentation, TraceIdentifier};
use flowctx_core::CorrelationContext;

pub type HttpRequest = http::Request<()>;
pub type HttpResponse = http::Response<()>;
pub type HttpInstrumentation =
    Instrumentation<CorrelationContext, HttpRequest, HttpRequest, HttpResponse>;
pub type HttpConfig = CorrelationConfig<HttpRequest, HttpRequest, HttpResponse>;

/// Inbound request carrying `headers` and, optionally, a host trace id.
pub fn inbound_request(headers: &[(&str, &str)], trace_id: Option<&str>) -> HttpRequest {
    let mut builder = http::Request::builder().uri("http://service.local/api");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let mut request = builder.body(()).expect("valid inbound request");
    if let Some(trace_id) = trace_id {
        request
            .extensions_mut()
            .insert(TraceIdentifier(trace_id.to_string()));
    }
    request
}

pub fn outbound_request(uri: &str) -> HttpRequest {
    http::Request::builder()
        .uri(uri)
        .body(())
        .expect("valid outbound request")
}

/// Default correlation instrumentation with `notifier` attached.
pub fn instrumentation_with<N>(notifier: N) -> HttpInstrumentation
where
    N: flowctx_interceptor::OutgoingRequestNotifier<CorrelationContext, HttpRequest, HttpResponse>
        + 'static,
{
    HttpConfig::correlation()
        .with_notifier(notifier)
        .enable()
        .expect("default correlation config enables")
}
