//! Tests for the tracing notifier

use flowctx::{CorrelationContext, DeriveChild, OutgoingRequestNotifier, TracingRequestNotifier};
use test_support::common::*;
use tracing_test::traced_test;

type HttpNotifier = dyn OutgoingRequestNotifier<CorrelationContext, HttpRequest, HttpResponse>;

fn child_context() -> CorrelationContext {
    CorrelationContext::with_request_id("corr-trace", "req-trace")
        .unwrap()
        .derive_child(Some("child-trace"))
        .into_owned()
}

#[test]
#[traced_test]
fn test_before_request_is_logged() {
    let notifier: &HttpNotifier = &TracingRequestNotifier::new();
    let request = outbound_request("http://downstream.local/items");

    notifier
        .on_before_request(&child_context(), &request)
        .unwrap();

    assert!(logs_contain("outbound call starting"));
    assert!(logs_contain("http://downstream.local/items"));
    assert!(logs_contain("corr-trace/req-trace/child-trace"));
}

#[test]
#[traced_test]
fn test_error_status_is_logged_as_warning() {
    let notifier: &HttpNotifier = &TracingRequestNotifier::new();
    let response = http::Response::builder().status(503).body(()).unwrap();

    notifier
        .on_after_response(&child_context(), &response)
        .unwrap();

    assert!(logs_contain("WARN"));
    assert!(logs_contain("status=503"));
}

#[tokio::test]
#[traced_test]
async fn test_notifier_runs_inside_instrumented_calls() {
    let instrumentation = instrumentation_with(TracingRequestNotifier::new());
    let client = flowctx::ClientBuilder::new(&instrumentation).build(LoopbackSender::new());

    let inbound = inbound_request(&[("x-ms-request-root-id", "corr-live")], None);
    instrumentation
        .handle_inbound(&inbound, async {
            use flowctx::RequestSender;
            client
                .send(outbound_request("http://downstream.local/live"))
                .await
                .unwrap();
        })
        .await
        .unwrap();

    assert!(logs_contain("outbound call starting"));
    assert!(logs_contain("outbound call completed"));
    assert!(logs_contain("corr-live"));
}
