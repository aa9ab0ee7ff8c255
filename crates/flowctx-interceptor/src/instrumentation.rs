//! Correlation instrumentation orchestrator.
//!
//! [`InstrumentationConfig`] collects the components while instrumentation
//! is disabled. [`InstrumentationConfig::enable`] validates and consumes it,
//! returning the [`Instrumentation`] handle adapters call into. A consumed
//! config cannot be enabled twice.

use crate::endpoint::{EndpointFilter, EndpointValidator};
use crate::factory::{ContextFactory, CorrelationContextFactory};
use crate::headers::HeaderNames;
use crate::injector::{ContextInjector, CorrelationContextInjector, child_request_id};
use crate::notifier::{OutgoingRequestNotifier, Phase, notify_safely};
use crate::request::{InboundRequest, OutboundRequest};
use crate::settings::CorrelationSettings;
use flowctx_core::ambient::{self, ContextGuard, ContextSlot};
use flowctx_core::{CorrelationContext, DeriveChild, FlowCtxError, Result};
use flowctx_observability::{metrics, spans};
use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use tracing::Instrument;

type SharedFactory<C, In> = Arc<dyn ContextFactory<C, In>>;
type SharedInjector<C, Out> = Arc<dyn ContextInjector<C, Out>>;
type SharedNotifier<C, Out, Resp> = Arc<dyn OutgoingRequestNotifier<C, Out, Resp>>;

/// Disabled instrumentation: components are being configured.
pub struct InstrumentationConfig<C, In: ?Sized, Out: ?Sized, Resp: ?Sized> {
    context_factory: Option<SharedFactory<C, In>>,
    context_injectors: Option<Vec<SharedInjector<C, Out>>>,
    endpoint_filter: Arc<dyn EndpointValidator>,
    notifier: Option<SharedNotifier<C, Out, Resp>>,
    headers: HeaderNames,
    instrument_incoming: bool,
    instrument_outgoing: bool,
}

/// Configuration pre-wired for [`CorrelationContext`].
pub type CorrelationConfig<In, Out, Resp> = InstrumentationConfig<CorrelationContext, In, Out, Resp>;

impl<C, In: ?Sized, Out: ?Sized, Resp: ?Sized> InstrumentationConfig<C, In, Out, Resp> {
    /// Nothing configured; incoming and outgoing instrumentation on.
    pub fn new() -> Self {
        Self {
            context_factory: None,
            context_injectors: None,
            endpoint_filter: Arc::new(EndpointFilter::default()),
            notifier: None,
            headers: HeaderNames::default(),
            instrument_incoming: true,
            instrument_outgoing: true,
        }
    }

    pub fn with_context_factory(mut self, factory: impl ContextFactory<C, In> + 'static) -> Self {
        self.context_factory = Some(Arc::new(factory));
        self
    }

    /// Replace the injector list. An empty list counts as configured.
    pub fn with_context_injectors(mut self, injectors: Vec<SharedInjector<C, Out>>) -> Self {
        self.context_injectors = Some(injectors);
        self
    }

    /// Append one injector.
    pub fn with_injector(mut self, injector: impl ContextInjector<C, Out> + 'static) -> Self {
        self.context_injectors
            .get_or_insert_with(Vec::new)
            .push(Arc::new(injector));
        self
    }

    pub fn with_endpoint_filter(mut self, filter: impl EndpointValidator + 'static) -> Self {
        self.endpoint_filter = Arc::new(filter);
        self
    }

    pub fn with_notifier(mut self, notifier: impl OutgoingRequestNotifier<C, Out, Resp> + 'static) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    /// Header names used to read back the request id an injector wrote.
    pub fn with_headers(mut self, headers: HeaderNames) -> Self {
        self.headers = headers;
        self
    }

    pub fn disable_incoming_requests(mut self) -> Self {
        self.instrument_incoming = false;
        self
    }

    pub fn disable_outgoing_requests(mut self) -> Self {
        self.instrument_outgoing = false;
        self
    }

    /// Apply flags, header names and the endpoint filter from settings.
    pub fn with_settings(mut self, settings: &CorrelationSettings) -> Self {
        self.instrument_incoming = settings.instrument_incoming_requests;
        self.instrument_outgoing = settings.instrument_outgoing_requests;
        self.headers = settings.headers.clone();
        self.endpoint_filter = Arc::new(settings.endpoint_filter.clone());
        self
    }

    /// Validate the configuration and switch instrumentation on.
    pub fn enable(self) -> Result<Instrumentation<C, In, Out, Resp>> {
        let Some(injectors) = self.context_injectors else {
            return Err(FlowCtxError::invalid_argument("context injectors are not configured"));
        };
        let factory = if self.instrument_incoming {
            let factory = self.context_factory.ok_or_else(|| {
                FlowCtxError::invalid_argument(
                    "a context factory is required when incoming requests are instrumented",
                )
            })?;
            Some(factory)
        } else {
            None
        };

        tracing::info!(
            incoming = self.instrument_incoming,
            outgoing = self.instrument_outgoing,
            injectors = injectors.len(),
            notifier = self.notifier.is_some(),
            "correlation instrumentation enabled"
        );

        Ok(Instrumentation {
            inbound: InboundInstrumentation { factory },
            outbound: OutboundInstrumentation {
                injectors: injectors.into(),
                endpoint_filter: self.endpoint_filter,
                notifier: self.notifier,
                headers: self.headers,
                enabled: self.instrument_outgoing,
            },
        })
    }
}

impl<C, In: ?Sized, Out: ?Sized, Resp: ?Sized> Default for InstrumentationConfig<C, In, Out, Resp> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In, Out, Resp> InstrumentationConfig<CorrelationContext, In, Out, Resp>
where
    In: InboundRequest + ?Sized,
    Out: OutboundRequest + ?Sized,
    Resp: ?Sized,
{
    /// Correlation factory and injector built from `settings`.
    pub fn from_settings(settings: &CorrelationSettings) -> Self {
        Self::new()
            .with_settings(settings)
            .with_context_factory(CorrelationContextFactory::new(settings.headers.clone()))
            .with_injector(CorrelationContextInjector::new(settings.headers.clone()))
    }

    /// Correlation factory and injector with default settings.
    pub fn correlation() -> Self {
        Self::from_settings(&CorrelationSettings::default())
    }
}

/// Enabled instrumentation.
pub struct Instrumentation<C, In: ?Sized, Out: ?Sized, Resp: ?Sized> {
    inbound: InboundInstrumentation<C, In>,
    outbound: OutboundInstrumentation<C, Out, Resp>,
}

impl<C, In: ?Sized, Out: ?Sized, Resp: ?Sized> Clone for Instrumentation<C, In, Out, Resp> {
    fn clone(&self) -> Self {
        Self {
            inbound: self.inbound.clone(),
            outbound: self.outbound.clone(),
        }
    }
}

impl<C, In: ?Sized, Out: ?Sized, Resp: ?Sized> Instrumentation<C, In, Out, Resp> {
    pub fn inbound(&self) -> &InboundInstrumentation<C, In> {
        &self.inbound
    }

    pub fn outbound(&self) -> &OutboundInstrumentation<C, Out, Resp> {
        &self.outbound
    }
}

impl<C, In, Out, Resp> Instrumentation<C, In, Out, Resp>
where
    C: DeriveChild + fmt::Display + Send + Sync + 'static,
    In: ?Sized,
    Out: OutboundRequest + ?Sized,
    Resp: ?Sized,
{
    pub fn on_inbound(&self, request: &In) -> Result<Option<InboundScope<C>>> {
        self.inbound.on_inbound(request)
    }

    pub async fn handle_inbound<F>(&self, request: &In, handler: F) -> Result<F::Output>
    where
        F: Future,
    {
        self.inbound.handle_inbound(request, handler).await
    }

    pub fn before_send(&self, request: &mut Out) -> Result<OutboundCall<C>> {
        self.outbound.before_send(request)
    }

    pub fn after_receive(&self, call: &OutboundCall<C>, response: &Resp) {
        self.outbound.after_receive(call, response)
    }
}

/// Inbound half: builds and binds the request context.
pub struct InboundInstrumentation<C, In: ?Sized> {
    factory: Option<SharedFactory<C, In>>,
}

impl<C, In: ?Sized> Clone for InboundInstrumentation<C, In> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
        }
    }
}

impl<C, In> InboundInstrumentation<C, In>
where
    C: Clone + fmt::Display + Send + Sync + 'static,
    In: ?Sized,
{
    pub fn is_enabled(&self) -> bool {
        self.factory.is_some()
    }

    /// Create the context for `request` and bind it to the request and the
    /// active slot of the current flow until the returned scope is dropped.
    ///
    /// `Ok(None)` when incoming instrumentation is off. Must be called inside
    /// an ambient flow; outside one there is nothing to bind to and the call
    /// fails with `InvalidArgument`.
    pub fn on_inbound(&self, request: &In) -> Result<Option<InboundScope<C>>> {
        let Some(factory) = &self.factory else {
            return Ok(None);
        };
        if !ambient::has_flow() {
            return Err(FlowCtxError::invalid_argument(
                "on_inbound requires an ambient flow",
            ));
        }
        let context = factory.create_context(request)?;
        let request_guard = ambient::bind(ContextSlot::Request, context.clone());
        let active_guard = ambient::bind(ContextSlot::Active, context.clone());
        Ok(Some(InboundScope {
            context,
            _active: active_guard,
            _request: request_guard,
        }))
    }

    /// Run `handler` in a fresh flow with the context for `request` bound.
    pub async fn handle_inbound<F>(&self, request: &In, handler: F) -> Result<F::Output>
    where
        F: Future,
    {
        ambient::flow(async move {
            let Some(scope) = self.on_inbound(request)? else {
                return Ok::<_, FlowCtxError>(handler.await);
            };
            let span = spans::inbound_request(&scope.context);
            let output = handler.instrument(span).await;
            drop(scope);
            Ok(output)
        })
        .await
    }
}

/// Context bound for one inbound request. Dropping it restores both slots.
#[must_use = "the context is unbound as soon as the scope is dropped"]
pub struct InboundScope<C> {
    context: C,
    _active: ContextGuard,
    _request: ContextGuard,
}

impl<C> InboundScope<C> {
    pub fn context(&self) -> &C {
        &self.context
    }
}

impl<C> Deref for InboundScope<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.context
    }
}

impl<C: fmt::Debug> fmt::Debug for InboundScope<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundScope")
            .field("context", &self.context)
            .finish()
    }
}

/// Outbound half: injects the active context into outbound calls.
pub struct OutboundInstrumentation<C, Out: ?Sized, Resp: ?Sized> {
    injectors: Arc<[SharedInjector<C, Out>]>,
    endpoint_filter: Arc<dyn EndpointValidator>,
    notifier: Option<SharedNotifier<C, Out, Resp>>,
    headers: HeaderNames,
    enabled: bool,
}

impl<C, Out: ?Sized, Resp: ?Sized> Clone for OutboundInstrumentation<C, Out, Resp> {
    fn clone(&self) -> Self {
        Self {
            injectors: self.injectors.clone(),
            endpoint_filter: self.endpoint_filter.clone(),
            notifier: self.notifier.clone(),
            headers: self.headers.clone(),
            enabled: self.enabled,
        }
    }
}

impl<C, Out, Resp> OutboundInstrumentation<C, Out, Resp>
where
    C: DeriveChild + Send + Sync + 'static,
    Out: OutboundRequest + ?Sized,
    Resp: ?Sized,
{
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Prepare `request` for sending under the active context.
    ///
    /// Injector failures are returned; notifier failures are not.
    pub fn before_send(&self, request: &mut Out) -> Result<OutboundCall<C>> {
        if !self.enabled {
            metrics::record_outbound_request("disabled");
            return Ok(OutboundCall::passthrough());
        }
        let Some(context) = ambient::get_context::<C>() else {
            tracing::debug!("no active context; outbound request not instrumented");
            metrics::record_outbound_request("no_context");
            return Ok(OutboundCall::passthrough());
        };

        let uri = request.uri();
        let instrumented = self.endpoint_filter.validate(&uri);
        if instrumented {
            for injector in self.injectors.iter() {
                injector.update_request(&context, request)?;
            }
        } else {
            tracing::debug!(uri = %uri, "endpoint excluded from instrumentation");
        }

        let child_id = if instrumented {
            child_request_id(&*request, &self.headers)
        } else {
            None
        };
        let child = context.derive_child(child_id.as_deref()).into_owned();

        if let Some(notifier) = &self.notifier {
            notify_safely(Phase::Before, child_id.as_deref(), || {
                notifier.on_before_request(&child, &*request)
            });
        }

        metrics::record_outbound_request(if instrumented { "instrumented" } else { "filtered" });
        Ok(OutboundCall {
            context: Some(child),
            child_request_id: child_id,
            instrumented,
        })
    }

    /// Report the response of a call prepared by [`before_send`](Self::before_send).
    pub fn after_receive(&self, call: &OutboundCall<C>, response: &Resp) {
        if !call.instrumented {
            return;
        }
        let (Some(notifier), Some(context)) = (&self.notifier, &call.context) else {
            return;
        };
        notify_safely(Phase::After, call.child_request_id.as_deref(), || {
            notifier.on_after_response(context, response)
        });
    }
}

/// State carried from `before_send` to `after_receive` for one call.
#[derive(Debug, Clone)]
pub struct OutboundCall<C> {
    context: Option<C>,
    child_request_id: Option<String>,
    instrumented: bool,
}

impl<C> OutboundCall<C> {
    fn passthrough() -> Self {
        Self {
            context: None,
            child_request_id: None,
            instrumented: false,
        }
    }

    /// Child context for this call; `None` when no context was active.
    pub fn context(&self) -> Option<&C> {
        self.context.as_ref()
    }

    pub fn child_request_id(&self) -> Option<&str> {
        self.child_request_id.as_deref()
    }

    /// Whether the endpoint passed the filter and injectors ran.
    pub fn is_instrumented(&self) -> bool {
        self.instrumented
    }
}
