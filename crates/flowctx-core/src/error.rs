use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowCtxError {
    /// A required input was missing or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Settings could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The outbound message already carries the correlation header.
    #[error("{header} header already exists")]
    HeaderConflict { header: String },

    /// The ambient slot holds a value of a different type.
    #[error("ambient context is not a {expected}")]
    ContextTypeMismatch { expected: &'static str },

    #[error("outbound request failed: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlowCtxError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, FlowCtxError>;
