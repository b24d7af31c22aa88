//! Error types for the asset store
//!
//! Covers:
//! - Resolution failures (missing files, unregistered types)
//! - Wire data that does not fit the destination object
//! - Inheritance graph problems (unsaved parents, cycles)
//! - Filesystem I/O

use flatland_format::{AssetPath, FormatError};

/// Errors raised by [`crate::Store`] operations
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// No filesystem layer holds the path
    #[error("asset not found: {path}")]
    NotFound { path: AssetPath },

    /// Save was called with no writable layer registered
    #[error("no writable file system registered")]
    NoWritableFileSystem,

    /// Type name with no registered descriptor
    #[error("unknown asset type: '{0}'")]
    UnknownType(String),

    /// Loaded or converted value has a different type than expected
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Parent operation on an asset that has never been saved or loaded
    #[error("asset is not loaded from a path: {0}")]
    NotLoaded(String),

    /// Tree does not fit the destination value
    #[error("malformed wire data: {0}")]
    MalformedWireData(String),

    /// Parent chain or reference chain loops back on itself
    #[error("inheritance cycle through {path}")]
    Cycle { path: AssetPath },

    /// Load recursion went past the configured depth
    #[error("load depth limit {limit} exceeded at {path}")]
    DepthExceeded { path: AssetPath, limit: usize },

    /// Asset is write-locked further up the current call chain
    #[error("asset of type {0} is locked by an operation in progress")]
    Reentrant(String),

    /// IO error from a filesystem layer
    #[error("io error on {path}: {source}")]
    Io {
        path: AssetPath,
        #[source]
        source: std::io::Error,
    },

    /// Envelope or tree codec failure
    #[error("format error: {0}")]
    Format(FormatError),
}

impl AssetError {
    /// Create not-found error for path
    pub fn not_found(path: impl Into<AssetPath>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create type mismatch error
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create malformed wire data error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedWireData(message.into())
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<AssetPath>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the caller can reasonably retry or fall back
    ///
    /// Missing files and unsaved parents are recoverable; corrupt data,
    /// cycles and unregistered types need a code or content fix.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::NotLoaded(_) | Self::NoWritableFileSystem | Self::Io { .. }
        )
    }
}

impl From<FormatError> for AssetError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::MalformedWireData(message) => Self::MalformedWireData(message),
            FormatError::Base64(source) => Self::MalformedWireData(format!("invalid base64: {source}")),
            other => Self::Format(other),
        }
    }
}

/// Result alias for asset operations
pub type AssetResult<T> = Result<T, AssetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_format_errors_flatten() {
        let err: AssetError = FormatError::malformed("missing Path").into();
        assert!(matches!(err, AssetError::MalformedWireData(ref m) if m == "missing Path"));
    }

    #[test]
    fn json_errors_stay_format_errors() {
        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AssetError = FormatError::Json(json).into();
        assert!(matches!(err, AssetError::Format(FormatError::Json(_))));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn recoverable_errors() {
        assert!(AssetError::not_found("a.json").is_recoverable());
        assert!(AssetError::NotLoaded("Unit".into()).is_recoverable());
        assert!(!AssetError::UnknownType("Unit".into()).is_recoverable());
        assert!(!AssetError::Cycle { path: "a.json".into() }.is_recoverable());
    }

    #[test]
    fn display_messages() {
        assert_eq!(AssetError::not_found("a.json").to_string(), "asset not found: a.json");
        assert_eq!(
            AssetError::type_mismatch("Leaf", "Node").to_string(),
            "type mismatch: expected Leaf, found Node"
        );
    }
}
