//! Tests for the ambient context store

use flowctx::ambient::{self, ContextSlot, FlowSnapshot};
use flowctx::correlation::{current_correlation_id, with_correlation_context};
use flowctx::{CorrelationContext, FlowCtxError};

fn context(id: &str) -> CorrelationContext {
    CorrelationContext::with_request_id(id, "req").unwrap()
}

#[test]
fn test_get_without_binding_is_none() {
    ambient::flow_sync(|| {
        assert!(ambient::has_flow());
        assert!(ambient::get_context::<CorrelationContext>().is_none());
        assert!(ambient::get_request_context::<CorrelationContext>().is_none());
    });
}

#[test]
fn test_set_returns_value_and_overwrites() {
    ambient::flow_sync(|| {
        let first = ambient::set_context(context("first"));
        assert_eq!(first.correlation_id().as_str(), "first");
        ambient::set_context(context("second"));
        let seen = ambient::get_context::<CorrelationContext>().unwrap();
        assert_eq!(seen.correlation_id().as_str(), "second");
    });
}

#[test]
fn test_update_reports_missing_binding() {
    ambient::flow_sync(|| {
        let updated = ambient::update_context::<CorrelationContext, _>(|ctx| {
            ctx.set("never", 1).unwrap();
        })
        .unwrap();
        assert!(!updated);
    });
}

#[test]
fn test_update_with_wrong_type_fails() {
    ambient::flow_sync(|| {
        ambient::set_context(context("typed"));
        let result = ambient::update_context::<String, _>(|s| s.push('x'));
        assert!(matches!(result, Err(FlowCtxError::ContextTypeMismatch { .. })));
    });
}

#[test]
fn test_snapshot_moves_bindings_to_os_thread() {
    ambient::flow_sync(|| {
        ambient::set_request_context(context("threaded"));
        let snapshot = FlowSnapshot::capture();
        assert!(snapshot.is_bound(ContextSlot::Request));
        assert!(!snapshot.is_bound(ContextSlot::Active));

        let seen = std::thread::spawn(move || {
            snapshot.run(|| {
                let ctx = ambient::get_request_context::<CorrelationContext>().unwrap();
                ambient::clear_request_context();
                ctx
            })
        })
        .join()
        .unwrap();

        assert_eq!(seen.correlation_id().as_str(), "threaded");
        assert!(ambient::get_request_context::<CorrelationContext>().is_some());
    });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_child_task_leaves_parent_binding() {
    let ctx = context("resilient");
    let seen = with_correlation_context(ctx, async {
        let handle = ambient::spawn(async {
            ambient::clear_context();
            panic!("child failed");
        });
        assert!(handle.await.is_err());
        current_correlation_id()
    })
    .await;

    assert_eq!(seen.unwrap().as_str(), "resilient");
}

#[tokio::test]
async fn test_guard_inside_forked_flow() {
    ambient::flow(async {
        ambient::set_context(context("outer"));
        ambient::fork(async {
            let _guard = ambient::bind(ContextSlot::Active, context("inner"));
            tokio::task::yield_now().await;
            let seen = ambient::get_context::<CorrelationContext>().unwrap();
            assert_eq!(seen.correlation_id().as_str(), "inner");
        })
        .await;
        let seen = ambient::get_context::<CorrelationContext>().unwrap();
        assert_eq!(seen.correlation_id().as_str(), "outer");
    })
    .await;
}
