//! JSON settings for correlation instrumentation.
//!
//! ```json
//! {
//!   "InstrumentOutgoingRequests": true,
//!   "InstrumentIncomingRequests": "true",
//!   "Headers": {
//!     "CorrelationIdHeaderName": "x-ms-request-root-id",
//!     "RequestIdHeaderName": "x-ms-request-id"
//!   },
//!   "EndpointFilter": { "Allow": false, "Endpoints": ["core\\.windows\\.net"] }
//! }
//! ```
//!
//! Every section is optional. Unknown keys are ignored.

use crate::endpoint::EndpointFilter;
use crate::headers::HeaderNames;
use flowctx_core::{FlowCtxError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawSettings {
    instrument_outgoing_requests: Option<Value>,
    instrument_incoming_requests: Option<Value>,
    headers: Option<RawHeaders>,
    endpoint_filter: Option<RawEndpointFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawHeaders {
    correlation_id_header_name: Option<String>,
    request_id_header_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawEndpointFilter {
    allow: Option<Value>,
    endpoints: Option<Vec<String>>,
}

/// Validated correlation settings.
#[derive(Debug, Clone)]
pub struct CorrelationSettings {
    pub instrument_outgoing_requests: bool,
    pub instrument_incoming_requests: bool,
    pub headers: HeaderNames,
    pub endpoint_filter: EndpointFilter,
}

impl Default for CorrelationSettings {
    fn default() -> Self {
        Self {
            instrument_outgoing_requests: true,
            instrument_incoming_requests: true,
            headers: HeaderNames::default(),
            endpoint_filter: EndpointFilter::default(),
        }
    }
}

impl CorrelationSettings {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| FlowCtxError::configuration(format!("settings are not valid JSON: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawSettings = serde_json::from_value(value)
            .map_err(|e| FlowCtxError::configuration(format!("malformed settings: {}", e)))?;
        raw.validate()
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading correlation settings");
        Self::from_json_str(&text)
    }
}

impl RawSettings {
    fn validate(self) -> Result<CorrelationSettings> {
        let defaults = CorrelationSettings::default();

        let headers = match self.headers {
            None => defaults.headers,
            Some(raw) => {
                let correlation = raw.correlation_id_header_name.ok_or_else(|| {
                    FlowCtxError::configuration("Headers.CorrelationIdHeaderName is required")
                })?;
                let request = raw.request_id_header_name.ok_or_else(|| {
                    FlowCtxError::configuration("Headers.RequestIdHeaderName is required")
                })?;
                HeaderNames::new(&correlation, &request)?
            }
        };

        let endpoint_filter = match self.endpoint_filter {
            None => defaults.endpoint_filter,
            Some(raw) => {
                let allow = parse_flag("EndpointFilter.Allow", raw.allow)?.unwrap_or(false);
                let endpoints = raw.endpoints.ok_or_else(|| {
                    FlowCtxError::configuration("EndpointFilter.Endpoints is required")
                })?;
                EndpointFilter::new(endpoints, allow)?
            }
        };

        Ok(CorrelationSettings {
            instrument_outgoing_requests: parse_flag(
                "InstrumentOutgoingRequests",
                self.instrument_outgoing_requests,
            )?
            .unwrap_or(defaults.instrument_outgoing_requests),
            instrument_incoming_requests: parse_flag(
                "InstrumentIncomingRequests",
                self.instrument_incoming_requests,
            )?
            .unwrap_or(defaults.instrument_incoming_requests),
            headers,
            endpoint_filter,
        })
    }
}

/// A boolean, or the string "true"/"false" in any case.
fn parse_flag(name: &str, value: Option<Value>) -> Result<Option<bool>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(other) => Err(FlowCtxError::configuration(format!(
            "{} must be a boolean, got {}",
            name, other
        ))),
    }
}
