//! # Error Types
//!
//! Invalid user input is never an error in the Rust sense: it is recorded
//! as [`ErrorEntry`](crate::ErrorEntry) values inside the form state.
//! [`FormError`] covers structural misuse of the engine's API, such as an
//! update addressed at a path that does not resolve.

use thiserror::Error;

/// Structural error raised by path-addressed reads and updates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// No node or field exists at the path.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The dotted path that failed to resolve.
        path: String,
    },

    /// A list node was addressed with a segment that is not an index.
    #[error("invalid list index '{segment}' at {path}")]
    InvalidIndex {
        /// The dotted path being resolved.
        path: String,
        /// The offending segment.
        segment: String,
    },

    /// A path continues below a field that has no nested schema.
    #[error("field '{field}' has no nested form; cannot descend into {path}")]
    NotNested {
        /// Field that was expected to hold a nested form.
        field: String,
        /// The full dotted path.
        path: String,
    },

    /// The update does not apply to the shape of the addressed node.
    #[error("shape mismatch at {path}: expected {expected}, found {found}")]
    ShapeMismatch {
        /// The dotted path of the node.
        path: String,
        /// Shape the operation requires.
        expected: &'static str,
        /// Shape the node has.
        found: &'static str,
    },

    /// A payload cannot be applied at the addressed location.
    #[error("unsupported payload at {path}: {reason}")]
    InvalidPayload {
        /// The dotted path of the node.
        path: String,
        /// Why the payload was rejected.
        reason: String,
    },
}

impl FormError {
    /// Create a path-not-found error.
    pub fn path_not_found(path: impl Into<String>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    /// Create an invalid-payload error.
    pub fn invalid_payload(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_path() {
        let err = FormError::path_not_found("movie.title");
        assert_eq!(err.to_string(), "path not found: movie.title");
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = FormError::ShapeMismatch {
            path: "actors".to_string(),
            expected: "object",
            found: "list",
        };
        assert!(err.to_string().contains("expected object, found list"));
    }
}
