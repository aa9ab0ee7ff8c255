//! Tests for the correlation context data type

use flowctx::context::{CHILD_REQUEST_ID_KEY, CORRELATION_ID_KEY, REQUEST_ID_KEY, RESERVED_KEYS};
use flowctx::{CorrelationContext, DeriveChild, FlowCtxError};
use serde_json::{Value, json};
use std::borrow::Cow;

#[test]
fn test_missing_correlation_id_is_rejected() {
    assert!(matches!(
        CorrelationContext::try_from_parts(None, Some("req".to_string())),
        Err(FlowCtxError::InvalidArgument(_))
    ));
}

#[test]
fn test_any_supplied_correlation_id_is_kept() {
    for id in ["", " ", "corr-1", "ünïcode"] {
        let ctx = CorrelationContext::new(id).unwrap();
        assert_eq!(ctx.correlation_id().as_str(), id);
        assert!(ctx.is_root());
        assert!(ctx.fields().is_empty());
    }
}

#[test]
fn test_reserved_keys_cannot_be_mutated() {
    let mut ctx = CorrelationContext::with_request_id("corr", "req")
        .unwrap()
        .derive_child(Some("child"))
        .into_owned();

    for key in RESERVED_KEYS {
        assert!(matches!(ctx.add(key, "x"), Err(FlowCtxError::InvalidArgument(_))), "add {}", key);
        assert!(matches!(ctx.set(key, "x"), Err(FlowCtxError::InvalidArgument(_))), "set {}", key);
        assert!(matches!(ctx.remove(key), Err(FlowCtxError::InvalidArgument(_))), "remove {}", key);
    }

    assert_eq!(ctx.get(CORRELATION_ID_KEY), Some(json!("corr")));
    assert_eq!(ctx.get(REQUEST_ID_KEY), Some(json!("req")));
    assert_eq!(ctx.get(CHILD_REQUEST_ID_KEY), Some(json!("child")));
}

#[test]
fn test_add_set_remove_custom_fields() {
    let mut ctx = CorrelationContext::new("corr").unwrap();

    ctx.add("tenant", "contoso").unwrap();
    assert!(matches!(ctx.add("tenant", "other"), Err(FlowCtxError::InvalidArgument(_))));

    assert_eq!(ctx.set("tenant", "fabrikam").unwrap(), Some(json!("contoso")));
    assert_eq!(ctx.set("attempt", 2).unwrap(), None);
    assert_eq!(ctx.len(), 4);
    assert!(ctx.contains_key("attempt"));

    assert_eq!(ctx.remove("attempt").unwrap(), Some(json!(2)));
    assert_eq!(ctx.remove("attempt").unwrap(), None);
    assert_eq!(ctx.get("tenant"), Some(json!("fabrikam")));
}

#[test]
fn test_clear_keeps_identity() {
    let mut ctx = CorrelationContext::with_request_id("corr", "req").unwrap();
    ctx.add("a", 1).unwrap();
    ctx.add("b", 2).unwrap();
    ctx.clear();

    assert_eq!(ctx.len(), 2);
    assert!(!ctx.is_empty());
    assert_eq!(ctx.correlation_id().as_str(), "corr");
    assert_eq!(ctx.request_id().unwrap().as_str(), "req");
}

#[test]
fn test_entries_list_identity_then_fields_in_insertion_order() {
    let mut ctx = CorrelationContext::new("corr").unwrap();
    ctx.add("zeta", true).unwrap();
    ctx.add("alpha", 1).unwrap();

    let keys: Vec<&str> = ctx.entries().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![CORRELATION_ID_KEY, REQUEST_ID_KEY, "zeta", "alpha"]);

    let (_, request_id) = ctx.entries().nth(1).unwrap();
    assert_eq!(request_id, Value::Null);
}

#[test]
fn test_derive_without_child_id_is_the_same_instance() {
    let ctx = CorrelationContext::with_request_id("corr", "req").unwrap();
    let derived = ctx.derive_child(None);
    assert!(matches!(derived, Cow::Borrowed(_)));
    assert!(std::ptr::eq(derived.as_ref(), &ctx));
}

#[test]
fn test_derived_child_copies_fields_at_derivation_time() {
    let mut parent = CorrelationContext::with_request_id("corr", "req").unwrap();
    parent.add("user", "alice").unwrap();

    let mut child = parent.derive_child(Some("child-1")).into_owned();
    parent.set("user", "bob").unwrap();
    parent.add("late", 1).unwrap();
    child.set("child-only", true).unwrap();

    assert_eq!(child.correlation_id(), parent.correlation_id());
    assert_eq!(child.request_id(), parent.request_id());
    assert_eq!(child.child_request_id().unwrap().as_str(), "child-1");
    assert!(!child.is_root());
    assert_eq!(child.get("user"), Some(json!("alice")));
    assert_eq!(child.get("late"), None);
    assert_eq!(parent.get("child-only"), None);
}

#[test]
fn test_serialized_form_is_a_flat_object() {
    let mut ctx = CorrelationContext::new("corr").unwrap();
    ctx.add("n", 3).unwrap();
    assert_eq!(
        serde_json::to_value(&ctx).unwrap(),
        json!({ "correlationId": "corr", "requestId": null, "n": 3 })
    );
}
