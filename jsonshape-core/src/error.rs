//! Error types for jsonshape operations
//!
//! Diagnostics (wrong types, missing fields, value mismatches) are not
//! errors: they flow through the report sink and validation continues.
//! The variants here are faults that abort the operation.

use thiserror::Error;

/// Main error type for jsonshape operations
#[derive(Error, Debug)]
pub enum ShapeError {
    /// Path expression parsing errors
    #[error("Failed to parse path '{path}': {message}")]
    PathParse {
        /// The raw path text
        path: String,
        /// What went wrong
        message: String,
    },

    /// A redirect named an identifier with no registered target
    #[error("Unknown reference '{id}': no expected node registered under this identifier")]
    UnknownReference {
        /// The unresolved identifier
        id: String,
    },

    /// Recursion depth exceeded during comparison
    #[error("Maximum comparison depth {limit} exceeded")]
    DepthExceeded {
        /// The configured depth bound
        limit: usize,
    },

    /// JSON parse failure from the underlying parser
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for jsonshape operations
pub type Result<T> = std::result::Result<T, ShapeError>;

impl ShapeError {
    /// Create a new path parse error
    #[must_use]
    pub fn path_parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PathParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new unknown-reference error
    #[must_use]
    pub fn unknown_reference(id: impl Into<String>) -> Self {
        Self::UnknownReference { id: id.into() }
    }

    /// Create a new depth-exceeded error
    #[must_use]
    pub fn depth_exceeded(limit: usize) -> Self {
        Self::DepthExceeded { limit }
    }
}
