//! Correlation helpers on top of the ambient store.
//!
//! Inbound adapters bind a [`CorrelationContext`] to both ambient slots;
//! these functions read it back for logging and for outbound calls.

use crate::ambient::{self, ContextSlot};
use crate::context::CorrelationContext;
use crate::ids::CorrelationId;
use std::future::Future;

pub fn generate_correlation_id() -> CorrelationId {
    CorrelationId::generate()
}

/// The active correlation context of the current flow.
pub fn current_context() -> Option<CorrelationContext> {
    ambient::get_context()
}

pub fn current_correlation_id() -> Option<CorrelationId> {
    ambient::inspect_in(ContextSlot::Active, |ctx: &CorrelationContext| {
        ctx.correlation_id().clone()
    })
}

pub fn current_or_new() -> CorrelationId {
    current_correlation_id().unwrap_or_else(generate_correlation_id)
}

/// Run `fut` in a fresh flow with `ctx` bound as both the request and the
/// active context.
pub fn with_correlation_context<F>(ctx: CorrelationContext, fut: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    ambient::flow(async move {
        ambient::set_request_context(ctx.clone());
        ambient::set_context(ctx);
        fut.await
    })
}
