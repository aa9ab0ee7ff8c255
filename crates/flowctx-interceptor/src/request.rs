//! Host request and response representations.
//!
//! The instrumentation only needs header access and the target URI, so any
//! host type can take part by implementing these traits. Implementations
//! for the `http` crate types are provided.

use flowctx_core::{FlowCtxError, Result};
use http::{HeaderName, HeaderValue};

/// Per-request trace identifier assigned by the host (e.g. a server's own
/// request counter). Attach it as an `http::Request` extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceIdentifier(pub String);

/// Read-only view of an inbound request.
pub trait InboundRequest {
    /// First value of the header, if present and valid UTF-8.
    fn header(&self, name: &HeaderName) -> Option<&str>;

    fn trace_identifier(&self) -> Option<&str> {
        None
    }
}

/// Mutable view of an outbound request.
pub trait OutboundRequest {
    fn uri(&self) -> String;

    fn header(&self, name: &HeaderName) -> Option<&str>;

    fn contains_header(&self, name: &HeaderName) -> bool;

    /// Set the header to exactly `value`, replacing existing values.
    fn insert_header(&mut self, name: &HeaderName, value: &str) -> Result<()>;
}

/// Response to an outbound request.
pub trait OutboundResponse {
    fn status_code(&self) -> u16;
}

impl<B> InboundRequest for http::Request<B> {
    fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers().get(name).and_then(|v| v.to_str().ok())
    }

    fn trace_identifier(&self) -> Option<&str> {
        self.extensions()
            .get::<TraceIdentifier>()
            .map(|id| id.0.as_str())
    }
}

impl<B> OutboundRequest for http::Request<B> {
    fn uri(&self) -> String {
        http::Request::uri(self).to_string()
    }

    fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers().get(name).and_then(|v| v.to_str().ok())
    }

    fn contains_header(&self, name: &HeaderName) -> bool {
        self.headers().contains_key(name)
    }

    fn insert_header(&mut self, name: &HeaderName, value: &str) -> Result<()> {
        let value = header_value(name, value)?;
        self.headers_mut().insert(name.clone(), value);
        Ok(())
    }
}

impl<B> OutboundResponse for http::Response<B> {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

pub(crate) fn header_value(name: &HeaderName, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| {
        FlowCtxError::invalid_argument(format!("value for `{}` is not a valid header value", name))
    })
}
