use thiserror::Error;

/// Errors produced by type parsing and conversion.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid entity id: {0}")]
    InvalidId(String),

    #[error("invalid entity reference '{0}': expected <Type>#<id>")]
    InvalidRef(String),

    #[error("unknown cardinality: {0}")]
    UnknownCardinality(String),

    #[error("entity type name cannot be empty")]
    EmptyTypeName,
}
