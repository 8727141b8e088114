//! Foundation types for coalesce.
//!
//! This crate provides the identity, value, and relationship-metadata types
//! shared by every other coalesce crate. It has no notion of storage or of
//! merging; it only describes records and how they relate.
//!
//! # Key Types
//!
//! - [`EntityId`]: Primary key of a stored record
//! - [`EntityType`]: Declared type name (`Company`, `Person`, ...)
//! - [`EntityRef`]: Type-qualified identity, unique across the whole store
//! - [`Value`]: Scalar attribute value with blank semantics
//! - [`Entity`]: Point-in-time snapshot of one record's attributes
//! - [`Relationship`]: Static reflection of a declared relationship
//! - [`IndifferentAttributes`]: Bookkeeping attributes ignored when merging

pub mod entity;
pub mod error;
pub mod identity;
pub mod indifferent;
pub mod relationship;
pub mod value;

pub use entity::{AttributeMap, Entity};
pub use error::TypeError;
pub use identity::{EntityId, EntityRef, EntityType};
pub use indifferent::{IndifferentAttributes, DEFAULT_INDIFFERENT_ATTRIBUTES};
pub use relationship::{Cardinality, Dependent, JoinTable, Linkage, Relationship};
pub use value::Value;
