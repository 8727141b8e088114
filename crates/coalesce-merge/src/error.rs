use std::fmt;

use coalesce_schema::SchemaError;
use coalesce_store::{ConstraintViolation, StoreError};
use coalesce_types::EntityRef;

/// Errors that abort a merge. Every one of them rolls back the whole
/// transaction, nested merges included.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// A donor is not of the survivor's type. Raised before any mutation.
    #[error("type mismatch: cannot merge {donor} into {survivor}")]
    TypeMismatch { survivor: EntityRef, donor: EntityRef },

    /// A write violated a declared constraint.
    #[error("validation failed: {0}")]
    Validation(ConstraintViolation),

    /// A donor or related record disappeared.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other persistence failure.
    #[error("store error: {0}")]
    Store(StoreError),

    /// The merge set itself is malformed, or nesting ran too deep.
    #[error("invalid merge set: {0}")]
    InvalidMergeSet(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MergeError {
    pub fn invalid(reason: impl fmt::Display) -> Self {
        Self::InvalidMergeSet(reason.to_string())
    }
}

impl From<StoreError> for MergeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(violation) => Self::Validation(violation),
            StoreError::NotFound(entity) => Self::NotFound(entity.to_string()),
            err @ StoreError::MissingJoinRow { .. } => Self::NotFound(err.to_string()),
            other => Self::Store(other),
        }
    }
}

impl From<SchemaError> for MergeError {
    fn from(err: SchemaError) -> Self {
        Self::Store(StoreError::Schema(err))
    }
}

/// Result alias for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;
