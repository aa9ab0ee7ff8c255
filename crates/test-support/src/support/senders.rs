//! Outbound sender doubles.

use async_trait::async_trait;
use flowctx_core::{FlowCtxError, Result};
use flowctx_interceptor::RequestSender;
use std::sync::Arc;
use tokio::sync::Mutex;

/// What a [`LoopbackSender`] saw of one request.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub uri: String,
    pub headers: http::HeaderMap,
}

impl SentRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Answers every request with `200 OK` and keeps the requests it saw.
#[derive(Debug, Clone, Default)]
pub struct LoopbackSender {
    sent: Arc<Mutex<Vec<SentRequest>>>,
}

impl LoopbackSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl RequestSender<http::Request<()>, http::Response<()>> for LoopbackSender {
    async fn send(&self, request: http::Request<()>) -> Result<http::Response<()>> {
        tracing::debug!(uri = %request.uri(), "loopback send");
        self.sent.lock().await.push(SentRequest {
            uri: request.uri().to_string(),
            headers: request.headers().clone(),
        });
        Ok(http::Response::new(()))
    }
}

/// Fails every request with a transport error.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnreachableSender;

#[async_trait]
impl RequestSender<http::Request<()>, http::Response<()>> for UnreachableSender {
    async fn send(&self, request: http::Request<()>) -> Result<http::Response<()>> {
        Err(FlowCtxError::Transport(format!("{} unreachable", request.uri())))
    }
}
