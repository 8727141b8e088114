use coalesce_schema::SchemaError;
use coalesce_types::{EntityId, EntityRef, EntityType};

use crate::constraints::ConstraintViolation;

/// Errors from entity store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The record does not exist (or no longer exists).
    #[error("record not found: {0}")]
    NotFound(EntityRef),

    /// A join row expected by a rewrite is missing.
    #[error("no row in {table} linking {owner} to {target}")]
    MissingJoinRow {
        table: String,
        owner: EntityId,
        target: EntityId,
    },

    /// A write violated a declared constraint.
    #[error("validation failed: {0}")]
    Validation(#[from] ConstraintViolation),

    /// The attribute is not declared on the entity type.
    #[error("{entity_type} has no attribute '{attribute}'")]
    UnknownAttribute {
        entity_type: EntityType,
        attribute: String,
    },

    /// No relationship in the schema uses this join table.
    #[error("unknown join table: {0}")]
    UnknownJoinTable(String),

    /// A record with this identity already exists.
    #[error("duplicate record: {0}")]
    DuplicateId(EntityRef),

    /// The schema rejected a lookup.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Storage backend failure.
    #[error("store backend error: {0}")]
    Backend(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Returns `true` for missing records and missing join rows.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::MissingJoinRow { .. })
    }

    /// Returns `true` for declared-constraint violations.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
