//! Entity store boundary for coalesce.
//!
//! The merge engine never touches storage directly. It works against the
//! [`EntityStore`] / [`StoreTransaction`] traits defined here: read and write
//! attributes by name, follow relationships by reflection, repoint foreign
//! keys and join rows, and delete records with their declared dependents.
//!
//! # Transactions
//!
//! All work happens inside a [`StoreTransaction`] obtained from
//! [`EntityStore::begin`]. A transaction is committed explicitly and rolled
//! back when dropped. [`with_transaction`] wraps a closure so that a normal
//! return commits and any error rolls back. Nested work receives the same
//! `&mut dyn StoreTransaction`, so one call tree is one flat transaction.
//!
//! # Storage Backends
//!
//! - [`InMemoryEntityStore`] -- `BTreeMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Every write is validated against the schema's declared constraints.
//! 2. Deleting an already-deleted record is a no-op, not an error.
//! 3. Deletion cascades only where the schema declares a dependent.
//! 4. Join rows behave as a set: the same link is never stored twice.

pub mod constraints;
pub mod dataset;
pub mod error;
pub mod memory;
pub mod traits;
pub mod transaction;

pub use constraints::ConstraintViolation;
pub use dataset::{Dataset, JoinRow, RecordDef};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryEntityStore;
pub use traits::{EntityStore, Related, StoreTransaction};
pub use transaction::with_transaction;
