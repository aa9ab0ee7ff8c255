//! Correlation instrumentation for inbound and outbound requests.
//!
//! Inbound adapters build a context with a [`ContextFactory`] and bind it
//! to the current flow; outbound calls get it written onto their headers by
//! [`ContextInjector`]s. [`Instrumentation`] wires both together.

pub mod client;
pub mod endpoint;
pub mod factory;
pub mod headers;
pub mod injector;
pub mod instrumentation;
pub mod notifier;
pub mod notifiers;
pub mod request;
pub mod settings;

pub use client::{ClientBuilder, InstrumentedClient, LayerPipeline, RequestLayer, RequestSender};
pub use endpoint::{AllowAll, EndpointFilter, EndpointValidator};
pub use factory::{ContextFactory, CorrelationContextFactory};
pub use headers::HeaderNames;
pub use injector::{ContextInjector, CorrelationContextInjector, child_request_id};
pub use instrumentation::{
    CorrelationConfig, InboundInstrumentation, InboundScope, Instrumentation,
    InstrumentationConfig, OutboundCall, OutboundInstrumentation,
};
pub use notifier::OutgoingRequestNotifier;
pub use notifiers::TracingRequestNotifier;
pub use request::{InboundRequest, OutboundRequest, OutboundResponse, TraceIdentifier};
pub use settings::CorrelationSettings;
