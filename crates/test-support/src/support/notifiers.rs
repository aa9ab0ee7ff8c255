//! Notifier doubles.

use flowctx_core::{CorrelationContext, FlowCtxError, Result};
use flowctx_interceptor::{OutboundRequest, OutboundResponse, OutgoingRequestNotifier};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum NotifierEvent {
    Before { context: CorrelationContext, uri: String },
    After { context: CorrelationContext, status: u16 },
}

impl NotifierEvent {
    pub fn context(&self) -> &CorrelationContext {
        match self {
            NotifierEvent::Before { context, .. } | NotifierEvent::After { context, .. } => context,
        }
    }
}

/// Records every callback in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<NotifierEvent>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NotifierEvent> {
        self.events.lock().expect("events lock").clone()
    }
}

impl<Req, Resp> OutgoingRequestNotifier<CorrelationContext, Req, Resp> for RecordingNotifier
where
    Req: OutboundRequest + ?Sized,
    Resp: OutboundResponse + ?Sized,
{
    fn on_before_request(&self, context: &CorrelationContext, request: &Req) -> Result<()> {
        self.events.lock().expect("events lock").push(NotifierEvent::Before {
            context: context.clone(),
            uri: request.uri(),
        });
        Ok(())
    }

    fn on_after_response(&self, context: &CorrelationContext, response: &Resp) -> Result<()> {
        self.events.lock().expect("events lock").push(NotifierEvent::After {
            context: context.clone(),
            status: response.status_code(),
        });
        Ok(())
    }
}

/// How a [`FailingNotifier`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    Error,
    Panic,
}

/// Fails every callback.
#[derive(Debug, Clone, Copy)]
pub struct FailingNotifier {
    mode: FailureMode,
}

impl FailingNotifier {
    pub fn erroring() -> Self {
        Self {
            mode: FailureMode::Error,
        }
    }

    pub fn panicking() -> Self {
        Self {
            mode: FailureMode::Panic,
        }
    }

    fn fail(&self, phase: &str) -> Result<()> {
        match self.mode {
            FailureMode::Error => Err(FlowCtxError::Transport(format!("notifier {} failed", phase))),
            FailureMode::Panic => panic!("notifier {} panicked", phase),
        }
    }
}

impl<C, Req: ?Sized, Resp: ?Sized> OutgoingRequestNotifier<C, Req, Resp> for FailingNotifier {
    fn on_before_request(&self, _context: &C, _request: &Req) -> Result<()> {
        self.fail("before")
    }

    fn on_after_response(&self, _context: &C, _response: &Resp) -> Result<()> {
        self.fail("after")
    }
}
