use coalesce_types::{EntityType, TypeError};
use thiserror::Error;

/// Errors raised while declaring, loading, or querying a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    #[error("entity type declared twice: {0}")]
    DuplicateEntityType(EntityType),

    #[error("{entity}: attribute '{attribute}' declared twice")]
    DuplicateAttribute { entity: EntityType, attribute: String },

    #[error("{entity}: relationship '{relationship}' declared twice")]
    DuplicateRelationship {
        entity: EntityType,
        relationship: String,
    },

    #[error("{entity}: unknown relationship '{relationship}'")]
    UnknownRelationship {
        entity: EntityType,
        relationship: String,
    },

    #[error("{entity}.{relationship}: target type {target} is not declared")]
    UnknownTarget {
        entity: EntityType,
        relationship: String,
        target: EntityType,
    },

    #[error("{entity}.{relationship}: attribute '{attribute}' is not declared on {owner}")]
    MissingAttribute {
        entity: EntityType,
        relationship: String,
        attribute: String,
        owner: EntityType,
    },

    #[error("{entity}: unique constraint names undeclared attribute '{attribute}'")]
    UnknownUniqueAttribute { entity: EntityType, attribute: String },

    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    #[error("failed to parse schema: {0}")]
    Parse(String),

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Result alias for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;
