//! Merge engine for coalesce.
//!
//! Folds one or more donor records into a survivor of the same type:
//!
//! - the **equivalence checker** decides whether two records are the same
//!   real-world thing, honoring per-type overrides from the schema;
//! - the **attribute resolver** fills the survivor's blank attributes from
//!   the donors, first donor first;
//! - the **relationship reflector** picks the relationships that take part
//!   (direct one-to-one, one-to-many and many-to-many, minus exclusions);
//! - the **relationship reassigner** moves each donor's related records
//!   onto the survivor, merging those equivalent to records the survivor
//!   already has.
//!
//! Donors are deleted at the end. Everything happens in one store
//! transaction: a failure anywhere, nested merges included, leaves the store
//! exactly as it was.
//!
//! # Example
//!
//! ```
//! use coalesce_merge::MergeEngine;
//! use coalesce_schema::{EntityModel, Schema};
//! use coalesce_store::{EntityStore, InMemoryEntityStore};
//! use coalesce_types::{AttributeMap, EntityType, Value};
//!
//! let schema = Schema::builder()
//!     .model(EntityModel::new("Company").text("name").text("alpha"))
//!     .build()
//!     .unwrap();
//! let store = InMemoryEntityStore::new(schema);
//! let company = EntityType::from("Company");
//!
//! let mut tx = store.begin().unwrap();
//! let mut attrs = AttributeMap::new();
//! attrs.insert("name".into(), Value::from("Acme"));
//! let survivor = tx.insert(&company, attrs).unwrap().entity_ref();
//! let mut attrs = AttributeMap::new();
//! attrs.insert("alpha".into(), Value::from("AC"));
//! let donor = tx.insert(&company, attrs).unwrap().entity_ref();
//! tx.commit().unwrap();
//!
//! let outcome = MergeEngine::default().merge(&store, &survivor, &[donor]).unwrap();
//! assert_eq!(outcome.survivor.get("alpha"), &Value::from("AC"));
//! assert_eq!(store.count("Company"), 1);
//! ```

pub mod attributes;
pub mod config;
pub mod engine;
pub mod equivalence;
pub mod error;
pub mod reflect;
pub mod report;

mod reassign;
mod session;

#[cfg(test)]
mod fixtures;

pub use attributes::resolve_attributes;
pub use config::MergeConfig;
pub use engine::MergeEngine;
pub use equivalence::equivalent;
pub use error::{MergeError, MergeResult};
pub use reflect::mergeable_relationships;
pub use report::{FilledAttribute, MergeOutcome, MergeReport, NestedMerge, Reassignment};
