//! Error types for the format layer

/// Errors raised while encoding or decoding common-format data
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Underlying JSON codec failure
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Structurally valid JSON that does not match the expected shape
    #[error("malformed wire data: {0}")]
    MalformedWireData(String),

    /// Dotted field path that cannot be parsed
    #[error("invalid field path '{path}': {reason}")]
    InvalidFieldPath { path: String, reason: String },

    /// Base64 payload that does not decode
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl FormatError {
    /// Create malformed wire data error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedWireData(message.into())
    }

    /// Create invalid field path error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFieldPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for format operations
pub type FormatResult<T> = Result<T, FormatError>;
