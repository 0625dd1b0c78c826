//! Error types for the OT engine

use crate::conflict::ResolutionStrategy;
use thiserror::Error;
use uuid::Uuid;

/// Invalid transform inputs or results.
///
/// Raised by the transform engine and by [`apply_operation`](crate::apply_operation)
/// when an operation cannot be placed in a document. Never retried internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// Arithmetic on a position or length would go below zero
    #[error("Operation {op} would produce a negative {field}")]
    Negative {
        /// Offending operation
        op: Uuid,
        /// `position` or `length`
        field: &'static str,
    },

    /// Position or length does not fit in the address space
    #[error("Operation {op} overflows: position {position} + length {length}")]
    Overflow {
        /// Offending operation
        op: Uuid,
        /// Operation position
        position: usize,
        /// Operation length
        length: usize,
    },

    /// Operation reaches past the end of the document
    #[error(
        "Operation {op} out of bounds: range {position}..{end} exceeds content length {content_len}"
    )]
    OutOfBounds {
        /// Offending operation
        op: Uuid,
        /// Start of the range
        position: usize,
        /// End of the range (exclusive)
        end: usize,
        /// Content length in characters
        content_len: usize,
    },
}

/// Conflict resolution failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    /// A strategy was selected that nothing can carry out
    #[error("No handler registered for conflict strategy '{0}'")]
    UnhandledStrategy(ResolutionStrategy),

    /// The manual handler refused to pick a winner
    #[error("Manual conflict resolution failed: {0}")]
    Manual(String),
}

/// Umbrella error for the crate.
#[derive(Error, Debug)]
pub enum OtError {
    /// Transform or apply failed
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Conflict could not be resolved
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// Client referenced a version the document has not reached
    #[error("Unknown base version {base} for document '{doc_id}' (current version {current})")]
    UnknownVersion {
        /// Document ID
        doc_id: String,
        /// Version the client claimed to have seen
        base: u64,
        /// Current document version
        current: u64,
    },

    /// Formatting spans are unordered, overlapping or out of range
    #[error("Invalid spans: {0}")]
    InvalidSpans(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for OtError {
    fn from(err: serde_json::Error) -> Self {
        OtError::Serialization(err.to_string())
    }
}

/// Result type for OT operations
pub type OtResult<T> = Result<T, OtError>;
