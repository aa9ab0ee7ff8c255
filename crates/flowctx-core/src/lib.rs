//! Correlation context types and flow-local propagation.

pub mod ambient;
pub mod context;
pub mod correlation;
pub mod error;
pub mod ids;

pub use ambient::{ContextGuard, ContextSlot, FlowSnapshot};
pub use context::{CorrelationContext, DeriveChild};
pub use error::{FlowCtxError, Result};
pub use ids::{CorrelationId, RequestId};
