//! Ambient context store bound to the current logical flow.
//!
//! A flow is a `tokio::task_local!` scope attached to a future (or to a
//! synchronous closure) when it is created. Anything running inside that
//! future sees the flow's bindings across `.await` points, no matter which
//! worker thread resumes it. Work handed to another task or thread only
//! sees the bindings when it is started through [`fork`], [`spawn`],
//! [`spawn_blocking`] or a [`FlowSnapshot`]; those copy the bindings at
//! hand-off time, so later writes on either side stay private.
//!
//! Each flow holds two independent slots (see [`ContextSlot`]). Values are
//! stored type-erased and read back typed at the call site.
//!
//! ```rust,ignore
//! ambient::flow(async {
//!     ambient::set_context(ctx.clone());
//!     call_downstream().await;           // still sees ctx
//!     ambient::spawn(async {
//!         assert!(ambient::get_context::<CorrelationContext>().is_some());
//!     });
//! })
//! .await;
//! ```

use crate::error::{FlowCtxError, Result};
use std::any::{Any, type_name};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

type Binding = Arc<dyn Any + Send + Sync>;

/// Independently keyed ambient bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextSlot {
    /// The currently active context, read by outbound instrumentation.
    Active,
    /// The context established for the inbound request being handled.
    Request,
}

#[derive(Clone, Default)]
struct Bindings {
    slots: HashMap<ContextSlot, Binding>,
}

tokio::task_local! {
    static FLOW: RefCell<Bindings>;
}

/// Copy of a flow's bindings, used to re-establish them elsewhere.
#[derive(Clone, Default)]
pub struct FlowSnapshot {
    bindings: Bindings,
}

impl FlowSnapshot {
    /// Copy the bindings of the current flow. Outside a flow this is empty.
    pub fn capture() -> Self {
        let bindings = FLOW
            .try_with(|cell| cell.borrow().clone())
            .unwrap_or_default();
        Self { bindings }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_bound(&self, slot: ContextSlot) -> bool {
        self.bindings.slots.contains_key(&slot)
    }

    /// Run `fut` as a new flow starting from this snapshot.
    pub fn scope<F: Future>(self, fut: F) -> impl Future<Output = F::Output> {
        FLOW.scope(RefCell::new(self.bindings), fut)
    }

    /// Run `f` synchronously as a new flow starting from this snapshot.
    pub fn run<R>(self, f: impl FnOnce() -> R) -> R {
        FLOW.sync_scope(RefCell::new(self.bindings), f)
    }
}

impl fmt::Debug for FlowSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowSnapshot")
            .field("slots", &self.bindings.slots.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Run `fut` as a fresh flow with nothing bound.
///
/// Inbound request handling starts here so no state leaks in from whatever
/// the worker ran before.
pub fn flow<F: Future>(fut: F) -> impl Future<Output = F::Output> {
    FlowSnapshot::empty().scope(fut)
}

/// Synchronous counterpart of [`flow`].
pub fn flow_sync<R>(f: impl FnOnce() -> R) -> R {
    FlowSnapshot::empty().run(f)
}

/// Run `fut` as a child flow inheriting a copy of the current bindings.
///
/// The copy is taken when `fork` is called, not when `fut` is first polled.
pub fn fork<F: Future>(fut: F) -> impl Future<Output = F::Output> {
    FlowSnapshot::capture().scope(fut)
}

/// `tokio::spawn` for a forked flow.
pub fn spawn<F>(fut: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(fork(fut))
}

/// `tokio::task::spawn_blocking` for a forked flow.
pub fn spawn_blocking<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let snapshot = FlowSnapshot::capture();
    tokio::task::spawn_blocking(move || snapshot.run(f))
}

/// Whether the caller runs inside a flow.
pub fn has_flow() -> bool {
    FLOW.try_with(|_| ()).is_ok()
}

/// Bind `value` to `slot` on the current flow, replacing any prior value.
///
/// Outside a flow nothing is stored.
pub fn set_in<T>(slot: ContextSlot, value: T) -> T
where
    T: Clone + Send + Sync + 'static,
{
    let binding: Binding = Arc::new(value.clone());
    let stored = FLOW.try_with(|cell| {
        cell.borrow_mut().slots.insert(slot, binding);
    });
    if stored.is_err() {
        tracing::warn!(?slot, "ambient context set outside a flow; value not bound");
    }
    value
}

/// Read the value bound to `slot`, failing if it is not a `T`.
pub fn try_get_in<T>(slot: ContextSlot) -> Result<Option<T>>
where
    T: Clone + 'static,
{
    let binding = FLOW
        .try_with(|cell| cell.borrow().slots.get(&slot).cloned())
        .ok()
        .flatten();

    match binding {
        None => Ok(None),
        Some(binding) => binding
            .downcast_ref::<T>()
            .cloned()
            .map(Some)
            .ok_or(FlowCtxError::ContextTypeMismatch {
                expected: type_name::<T>(),
            }),
    }
}

/// Read the value bound to `slot`. A value of another type reads as absent.
pub fn get_in<T>(slot: ContextSlot) -> Option<T>
where
    T: Clone + 'static,
{
    try_get_in(slot).unwrap_or_else(|e| {
        tracing::warn!(error = %e, ?slot, "ambient context type mismatch");
        None
    })
}

/// Borrow the value bound to `slot` without cloning it.
pub fn inspect_in<T, R>(slot: ContextSlot, f: impl FnOnce(&T) -> R) -> Option<R>
where
    T: 'static,
{
    let binding = FLOW
        .try_with(|cell| cell.borrow().slots.get(&slot).cloned())
        .ok()
        .flatten()?;
    binding.downcast_ref::<T>().map(f)
}

/// Mutate the value bound to `slot` on the current flow.
///
/// The stored value is replaced by an updated copy, so forks and earlier
/// readers keep what they saw. Returns whether a value was bound.
pub fn update_in<T, F>(slot: ContextSlot, f: F) -> Result<bool>
where
    T: Clone + Send + Sync + 'static,
    F: FnOnce(&mut T),
{
    let Some(mut value) = try_get_in::<T>(slot)? else {
        return Ok(false);
    };
    f(&mut value);
    set_in(slot, value);
    Ok(true)
}

/// Remove the binding for `slot`. Idempotent.
pub fn clear_in(slot: ContextSlot) {
    let _ = FLOW.try_with(|cell| {
        cell.borrow_mut().slots.remove(&slot);
    });
}

/// Bind `value` until the returned guard is dropped.
///
/// Whatever `slot` held before is restored when the guard goes, so nested
/// binds unwind in order.
pub fn bind<T>(slot: ContextSlot, value: T) -> ContextGuard
where
    T: Send + Sync + 'static,
{
    let binding: Binding = Arc::new(value);
    let previous = match FLOW.try_with(|cell| cell.borrow_mut().slots.insert(slot, binding)) {
        Ok(previous) => previous,
        Err(_) => {
            tracing::warn!(?slot, "ambient context set outside a flow; value not bound");
            None
        }
    };
    ContextGuard { slot, previous }
}

/// Restores the slot's previous binding when dropped, including while
/// unwinding. A slot that was empty is cleared.
#[must_use = "the binding is undone as soon as the guard is dropped"]
pub struct ContextGuard {
    slot: ContextSlot,
    previous: Option<Binding>,
}

impl fmt::Debug for ContextGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextGuard")
            .field("slot", &self.slot)
            .field("restores_previous", &self.previous.is_some())
            .finish()
    }
}

impl ContextGuard {
    pub fn slot(&self) -> ContextSlot {
        self.slot
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let slot = self.slot;
        let previous = self.previous.take();
        let _ = FLOW.try_with(|cell| {
            let mut bindings = cell.borrow_mut();
            match previous {
                Some(binding) => {
                    bindings.slots.insert(slot, binding);
                }
                None => {
                    bindings.slots.remove(&slot);
                }
            }
        });
    }
}

pub fn set_context<T>(value: T) -> T
where
    T: Clone + Send + Sync + 'static,
{
    set_in(ContextSlot::Active, value)
}

pub fn get_context<T>() -> Option<T>
where
    T: Clone + 'static,
{
    get_in(ContextSlot::Active)
}

pub fn try_get_context<T>() -> Result<Option<T>>
where
    T: Clone + 'static,
{
    try_get_in(ContextSlot::Active)
}

pub fn update_context<T, F>(f: F) -> Result<bool>
where
    T: Clone + Send + Sync + 'static,
    F: FnOnce(&mut T),
{
    update_in(ContextSlot::Active, f)
}

pub fn clear_context() {
    clear_in(ContextSlot::Active)
}

pub fn set_request_context<T>(value: T) -> T
where
    T: Clone + Send + Sync + 'static,
{
    set_in(ContextSlot::Request, value)
}

pub fn get_request_context<T>() -> Option<T>
where
    T: Clone + 'static,
{
    get_in(ContextSlot::Request)
}

pub fn clear_request_context() {
    clear_in(ContextSlot::Request)
}
