//! Instrumented outbound client pipeline.
//!
//! An [`InstrumentedClient`] wraps any [`RequestSender`]. For each call it
//! runs the correlation step first, then every [`RequestLayer`] in the
//! order they were added, then the inner sender.

use crate::instrumentation::{Instrumentation, OutboundInstrumentation};
use crate::request::OutboundRequest;
use async_trait::async_trait;
use flowctx_core::{DeriveChild, Result};
use flowctx_observability::spans;
use std::sync::Arc;
use tracing::Instrument;

/// Sends an outbound request and returns its response.
#[async_trait]
pub trait RequestSender<Req, Resp>: Send + Sync {
    async fn send(&self, request: Req) -> Result<Resp>;
}

/// Extra per-request step run after the correlation headers are written.
pub trait RequestLayer<Req: ?Sized>: Send + Sync {
    fn on_request(&self, request: &mut Req) -> Result<()>;
}

/// Ordered list of layers.
pub struct LayerPipeline<L: ?Sized> {
    layers: Vec<Arc<L>>,
}

impl<L: ?Sized> LayerPipeline<L> {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Layers run in the order they are added.
    pub fn with_layer(mut self, layer: Arc<L>) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn add_all(mut self, layers: Vec<Arc<L>>) -> Self {
        self.layers.extend(layers);
        self
    }

    pub fn layers(&self) -> &[Arc<L>] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl<L: ?Sized> Default for LayerPipeline<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> Clone for LayerPipeline<L> {
    fn clone(&self) -> Self {
        Self {
            layers: self.layers.clone(),
        }
    }
}

/// Builds an [`InstrumentedClient`].
pub struct ClientBuilder<C, Req, Resp> {
    outbound: OutboundInstrumentation<C, Req, Resp>,
    pipeline: LayerPipeline<dyn RequestLayer<Req>>,
}

impl<C, Req, Resp> ClientBuilder<C, Req, Resp> {
    pub fn new<In: ?Sized>(instrumentation: &Instrumentation<C, In, Req, Resp>) -> Self {
        Self {
            outbound: instrumentation.outbound().clone(),
            pipeline: LayerPipeline::new(),
        }
    }

    pub fn layer(mut self, layer: impl RequestLayer<Req> + 'static) -> Self {
        self.pipeline = self.pipeline.with_layer(Arc::new(layer));
        self
    }

    pub fn pipeline(mut self, pipeline: LayerPipeline<dyn RequestLayer<Req>>) -> Self {
        self.pipeline = self.pipeline.add_all(pipeline.layers);
        self
    }

    pub fn build<S>(self, sender: S) -> InstrumentedClient<S, C, Req, Resp> {
        InstrumentedClient {
            inner: sender,
            outbound: self.outbound,
            pipeline: self.pipeline,
        }
    }
}

/// A [`RequestSender`] that propagates the active context.
pub struct InstrumentedClient<S, C, Req, Resp> {
    inner: S,
    outbound: OutboundInstrumentation<C, Req, Resp>,
    pipeline: LayerPipeline<dyn RequestLayer<Req>>,
}

impl<S, C, Req, Resp> InstrumentedClient<S, C, Req, Resp> {
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn layers(&self) -> &[Arc<dyn RequestLayer<Req>>] {
        self.pipeline.layers()
    }
}

#[async_trait]
impl<S, C, Req, Resp> RequestSender<Req, Resp> for InstrumentedClient<S, C, Req, Resp>
where
    S: RequestSender<Req, Resp>,
    C: DeriveChild + Send + Sync + 'static,
    Req: OutboundRequest + Send + 'static,
    Resp: Send + 'static,
{
    async fn send(&self, mut request: Req) -> Result<Resp> {
        let span = spans::outbound_request(&request.uri());
        async move {
            let call = self.outbound.before_send(&mut request)?;
            for layer in self.pipeline.layers() {
                layer.on_request(&mut request)?;
            }
            let response = self.inner.send(request).await.inspect_err(|e| {
                tracing::debug!(error = %e, "outbound request failed");
            })?;
            self.outbound.after_receive(&call, &response);
            Ok(response)
        }
        .instrument(span)
        .await
    }
}
