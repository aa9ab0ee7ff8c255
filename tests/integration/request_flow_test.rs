//! Multi-hop propagation: service A calls B, B calls C.
//!
//! Each service runs its own instrumentation. The sender between two
//! services turns the outbound request into the next service's inbound
//! request, so the chain can be checked the way logs would reconstruct it.

use async_trait::async_trait;
use flowctx::ambient;
use flowctx::{ClientBuilder, CorrelationContext, InstrumentedClient, RequestSender, Result};
use std::sync::Arc;
use test_support::common::*;
use tokio::sync::Mutex;

type Seen = Arc<Mutex<Vec<(&'static str, CorrelationContext)>>>;

/// Delivers requests to a downstream service's instrumentation.
struct ServiceHop<S> {
    name: &'static str,
    instrumentation: HttpInstrumentation,
    downstream: Option<(InstrumentedClient<S, CorrelationContext, HttpRequest, HttpResponse>, String)>,
    seen: Seen,
}

#[async_trait]
impl<S> RequestSender<HttpRequest, HttpResponse> for ServiceHop<S>
where
    S: RequestSender<HttpRequest, HttpResponse>,
{
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.instrumentation
            .handle_inbound(&request, async {
                let ctx = ambient::get_request_context::<CorrelationContext>().unwrap();
                self.seen.lock().await.push((self.name, ctx));
                if let Some((client, uri)) = &self.downstream {
                    client.send(outbound_request(uri)).await?;
                }
                Ok::<_, flowctx::FlowCtxError>(http::Response::new(()))
            })
            .await?
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_chain_shares_correlation_id_and_links_request_ids() {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let a_notifier = RecordingNotifier::new();
    let b_notifier = RecordingNotifier::new();

    let service_c = ServiceHop::<LoopbackSender> {
        name: "c",
        instrumentation: instrumentation_with(RecordingNotifier::new()),
        downstream: None,
        seen: seen.clone(),
    };

    let b_instrumentation = instrumentation_with(b_notifier.clone());
    let b_client = ClientBuilder::new(&b_instrumentation).build(service_c);
    let service_b = ServiceHop {
        name: "b",
        instrumentation: instrumentation_with(RecordingNotifier::new()),
        downstream: Some((b_client, "http://c.local/work".to_string())),
        seen: seen.clone(),
    };

    let a_instrumentation = instrumentation_with(a_notifier.clone());
    let a_client = ClientBuilder::new(&a_instrumentation).build(service_b);

    // Service A receives a request without any correlation headers.
    let inbound = inbound_request(&[], Some("a-trace"));
    let root = a_instrumentation
        .handle_inbound(&inbound, async {
            a_client.send(outbound_request("http://b.local/work")).await?;
            Ok::<_, flowctx::FlowCtxError>(ambient::get_context::<CorrelationContext>().unwrap())
        })
        .await
        .unwrap()
        .unwrap();

    let seen = seen.lock().await.clone();
    let names: Vec<_> = seen.iter().map(|(name, _)| *name).collect();
    assert_eq!(names, vec!["b", "c"]);

    let b_ctx = &seen[0].1;
    let c_ctx = &seen[1].1;
    assert_eq!(root.request_id().unwrap().as_str(), "a-trace");
    assert_eq!(b_ctx.correlation_id(), root.correlation_id());
    assert_eq!(c_ctx.correlation_id(), root.correlation_id());

    // The id A generated for its outbound call is B's inbound request id.
    let a_child = a_notifier.events()[0].context().clone();
    assert_eq!(a_child.child_request_id(), b_ctx.request_id());
    let b_child = b_notifier.events()[0].context().clone();
    assert_eq!(b_child.request_id(), b_ctx.request_id());
    assert_eq!(b_child.child_request_id(), c_ctx.request_id());
}
