//! Static model metadata for coalesce.
//!
//! Entity types are declared once, at startup, as [`EntityModel`]s and
//! registered in a [`Schema`]. The schema is the relationship-reflection
//! table the merge engine queries: which attributes a type has, which
//! relationships it declares (in declaration order), which of those are
//! excluded from merging, and how two records of the type are compared.
//!
//! # Quick Start
//!
//! ```rust
//! use coalesce_schema::{EntityModel, Schema};
//! use coalesce_types::{Dependent, EntityType, Relationship};
//!
//! let schema = Schema::builder()
//!     .model(
//!         EntityModel::new("Company")
//!             .text("name")
//!             .relationship(
//!                 Relationship::has_many("phonenumbers", EntityType::from("Phonenumber"), "company_id")
//!                     .dependent(Dependent::Destroy),
//!             ),
//!     )
//!     .model(EntityModel::new("Phonenumber").reference("company_id").text("number"))
//!     .build()
//!     .unwrap();
//! assert_eq!(schema.relationships("Company").unwrap().len(), 1);
//! ```
//!
//! Schemas can also be loaded from TOML through [`SchemaDef`].

pub mod behavior;
pub mod definition;
pub mod error;
pub mod model;
pub mod schema;

pub use behavior::{
    attributes_equivalent, DefaultBehavior, KeyAttribute, MergeBehavior, NormalizedBehavior,
    Normalizer,
};
pub use definition::{EquivalenceDef, ModelDef, RelationshipDef, SchemaDef};
pub use error::{SchemaError, SchemaResult};
pub use model::{AttributeDef, AttributeKind, EntityModel, UniqueConstraint};
pub use schema::{Schema, SchemaBuilder};
