//! Deciding which outbound endpoints get instrumented.

use flowctx_core::{FlowCtxError, Result};
use regex::Regex;

/// Endpoints excluded by [`EndpointFilter::default`].
pub const DEFAULT_EXCLUDED_ENDPOINTS: [&str; 2] =
    [r"core\.windows\.net", r"dc\.services\.visualstudio\.com"];

/// Decides whether an outbound URI should be instrumented.
pub trait EndpointValidator: Send + Sync {
    fn validate(&self, uri: &str) -> bool;
}

/// Regex allow-list or deny-list over the full request URI.
///
/// With no patterns every endpoint is instrumented, whatever the mode.
#[derive(Debug, Clone)]
pub struct EndpointFilter {
    endpoints: Vec<Regex>,
    allow: bool,
}

impl EndpointFilter {
    pub fn new<I, S>(patterns: I, allow: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self {
            endpoints: Vec::new(),
            allow,
        };
        for pattern in patterns {
            filter.push(pattern.as_ref())?;
        }
        Ok(filter)
    }

    /// Instrument only URIs matching one of `patterns`.
    pub fn allow_list<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(patterns, true)
    }

    /// Instrument every URI except those matching one of `patterns`.
    pub fn deny_list<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(patterns, false)
    }

    pub fn add_endpoint(mut self, pattern: &str) -> Result<Self> {
        self.push(pattern)?;
        Ok(self)
    }

    pub fn is_allow_list(&self) -> bool {
        self.allow
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.endpoints.iter().map(Regex::as_str)
    }

    fn push(&mut self, pattern: &str) -> Result<()> {
        if self.endpoints.iter().any(|r| r.as_str() == pattern) {
            return Ok(());
        }
        let regex = Regex::new(pattern).map_err(|e| {
            FlowCtxError::configuration(format!("invalid endpoint pattern `{}`: {}", pattern, e))
        })?;
        self.endpoints.push(regex);
        Ok(())
    }
}

impl Default for EndpointFilter {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_EXCLUDED_ENDPOINTS
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect(),
            allow: false,
        }
    }
}

impl EndpointValidator for EndpointFilter {
    fn validate(&self, uri: &str) -> bool {
        if self.endpoints.is_empty() {
            return true;
        }
        let matched = self.endpoints.iter().any(|r| r.is_match(uri));
        matched == self.allow
    }
}

/// Instruments every endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl EndpointValidator for AllowAll {
    fn validate(&self, _uri: &str) -> bool {
        true
    }
}
