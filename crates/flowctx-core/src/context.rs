//! Correlation context carried by one logical flow.
//!
//! A [`CorrelationContext`] holds the flow identity (correlation id, request
//! id, and on derived copies a child request id) next to a bag of custom
//! fields. The identity lives in dedicated fields; the bag never stores the
//! reserved keys, so no mutation path can touch them.

use crate::error::{FlowCtxError, Result};
use crate::ids::{CorrelationId, RequestId};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

pub const CORRELATION_ID_KEY: &str = "correlationId";
pub const REQUEST_ID_KEY: &str = "requestId";
pub const CHILD_REQUEST_ID_KEY: &str = "childRequestId";

/// Keys owned by the context identity. Field mutation rejects all of them.
pub const RESERVED_KEYS: [&str; 3] = [CORRELATION_ID_KEY, REQUEST_ID_KEY, CHILD_REQUEST_ID_KEY];

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Capability of a context type to produce the copy attached to one
/// outbound call.
pub trait DeriveChild: Clone {
    /// Derive the context for an outbound call identified by
    /// `child_request_id`. `None` must return the receiver itself.
    fn derive_child(&self, child_request_id: Option<&str>) -> Cow<'_, Self>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationContext {
    correlation_id: CorrelationId,
    request_id: Option<RequestId>,
    child_request_id: Option<RequestId>,
    fields: IndexMap<String, Value>,
}

impl CorrelationContext {
    /// Root context with no request id.
    pub fn new(correlation_id: impl Into<String>) -> Result<Self> {
        Self::try_from_parts(Some(correlation_id.into()), None)
    }

    /// Root context for an inbound request.
    pub fn with_request_id(
        correlation_id: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Result<Self> {
        Self::try_from_parts(Some(correlation_id.into()), Some(request_id.into()))
    }

    /// Root context from nullable parts, as they come off the wire.
    ///
    /// A missing correlation id is rejected; any supplied value, empty
    /// included, is kept as given. An empty request id is treated as absent.
    pub fn try_from_parts(correlation_id: Option<String>, request_id: Option<String>) -> Result<Self> {
        let correlation_id = correlation_id
            .map(CorrelationId::new)
            .ok_or_else(|| FlowCtxError::invalid_argument("correlation id is required"))?;

        Ok(Self {
            correlation_id,
            request_id: request_id.filter(|id| !id.is_empty()).map(RequestId::new),
            child_request_id: None,
            fields: IndexMap::new(),
        })
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn child_request_id(&self) -> Option<&RequestId> {
        self.child_request_id.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.child_request_id.is_none()
    }

    /// Look up any key, reserved or custom.
    ///
    /// `requestId` is always present (JSON null when unset); `childRequestId`
    /// only exists on derived contexts.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            CORRELATION_ID_KEY => Some(Value::String(self.correlation_id.as_str().to_string())),
            REQUEST_ID_KEY => Some(optional_id_value(self.request_id.as_ref())),
            CHILD_REQUEST_ID_KEY => self
                .child_request_id
                .as_ref()
                .map(|id| Value::String(id.as_str().to_string())),
            _ => self.fields.get(key).cloned(),
        }
    }

    /// Borrow a custom field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn contains_key(&self, key: &str) -> bool {
        match key {
            CORRELATION_ID_KEY | REQUEST_ID_KEY => true,
            CHILD_REQUEST_ID_KEY => self.child_request_id.is_some(),
            _ => self.fields.contains_key(key),
        }
    }

    /// Insert a new custom field. Fails if the key is reserved or already
    /// present.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        reject_reserved(&key, "add")?;
        if self.fields.contains_key(&key) {
            return Err(FlowCtxError::invalid_argument(format!(
                "field `{}` already exists",
                key
            )));
        }
        self.fields.insert(key, value.into());
        Ok(())
    }

    /// Insert or overwrite a custom field, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<Option<Value>> {
        let key = key.into();
        reject_reserved(&key, "set")?;
        Ok(self.fields.insert(key, value.into()))
    }

    /// Remove a custom field, keeping the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Result<Option<Value>> {
        reject_reserved(key, "remove")?;
        Ok(self.fields.shift_remove(key))
    }

    /// Drop every custom field. Identity is untouched.
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Number of stored pairs, reserved keys included.
    pub fn len(&self) -> usize {
        let reserved = if self.child_request_id.is_some() { 3 } else { 2 };
        reserved + self.fields.len()
    }

    /// Always false: the identity keys are always present.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All pairs: identity keys first, then custom fields in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Value)> + '_ {
        let identity: [Option<(&str, Value)>; 3] = [
            Some((
                CORRELATION_ID_KEY,
                Value::String(self.correlation_id.as_str().to_string()),
            )),
            Some((REQUEST_ID_KEY, optional_id_value(self.request_id.as_ref()))),
            self.child_request_id
                .as_ref()
                .map(|id| (CHILD_REQUEST_ID_KEY, Value::String(id.as_str().to_string()))),
        ];

        identity
            .into_iter()
            .flatten()
            .chain(self.fields.iter().map(|(k, v)| (k.as_str(), v.clone())))
    }
}

impl DeriveChild for CorrelationContext {
    fn derive_child(&self, child_request_id: Option<&str>) -> Cow<'_, Self> {
        let Some(child_request_id) = child_request_id else {
            return Cow::Borrowed(self);
        };

        Cow::Owned(Self {
            correlation_id: self.correlation_id.clone(),
            request_id: self.request_id.clone(),
            child_request_id: Some(RequestId::from(child_request_id)),
            fields: self.fields.clone(),
        })
    }
}

impl fmt::Display for CorrelationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.correlation_id)?;
        if let Some(request_id) = &self.request_id {
            write!(f, "/{}", request_id)?;
        }
        if let Some(child) = &self.child_request_id {
            write!(f, "/{}", child)?;
        }
        Ok(())
    }
}

impl Serialize for CorrelationContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.entries() {
            map.serialize_entry(key, &value)?;
        }
        map.end()
    }
}

fn optional_id_value(id: Option<&RequestId>) -> Value {
    id.map(|id| Value::String(id.as_str().to_string()))
        .unwrap_or(Value::Null)
}

fn reject_reserved(key: &str, operation: &str) -> Result<()> {
    if is_reserved_key(key) {
        return Err(FlowCtxError::invalid_argument(format!(
            "could not {} reserved key `{}`",
            operation, key
        )));
    }
    Ok(())
}
