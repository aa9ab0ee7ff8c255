//! Header names used on the wire.

use flowctx_core::{FlowCtxError, Result};
use http::HeaderName;

pub const DEFAULT_CORRELATION_ID_HEADER: &str = "x-ms-request-root-id";
pub const DEFAULT_REQUEST_ID_HEADER: &str = "x-ms-request-id";

/// Names of the correlation-id and request-id headers.
///
/// Built once at startup and handed to every factory and injector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderNames {
    correlation_id: HeaderName,
    request_id: HeaderName,
}

impl HeaderNames {
    pub fn new(correlation_id: &str, request_id: &str) -> Result<Self> {
        let correlation_id = parse_header_name(correlation_id)?;
        let request_id = parse_header_name(request_id)?;
        if correlation_id == request_id {
            return Err(FlowCtxError::configuration(format!(
                "correlation id and request id headers must differ (both `{}`)",
                correlation_id
            )));
        }
        Ok(Self {
            correlation_id,
            request_id,
        })
    }

    pub fn correlation_id(&self) -> &HeaderName {
        &self.correlation_id
    }

    pub fn request_id(&self) -> &HeaderName {
        &self.request_id
    }
}

impl Default for HeaderNames {
    fn default() -> Self {
        Self {
            correlation_id: HeaderName::from_static(DEFAULT_CORRELATION_ID_HEADER),
            request_id: HeaderName::from_static(DEFAULT_REQUEST_ID_HEADER),
        }
    }
}

fn parse_header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|e| FlowCtxError::configuration(format!("invalid header name `{}`: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_normalized() {
        let names = HeaderNames::new("X-Corr-Id", "X-Req-Id").unwrap();
        assert_eq!(names.correlation_id().as_str(), "x-corr-id");
        assert_eq!(names.request_id().as_str(), "x-req-id");
    }

    #[test]
    fn rejects_invalid_or_duplicate_names() {
        assert!(matches!(
            HeaderNames::new("bad header", "x-req"),
            Err(FlowCtxError::Configuration(_))
        ));
        assert!(matches!(
            HeaderNames::new("x-same", "X-Same"),
            Err(FlowCtxError::Configuration(_))
        ));
    }
}
