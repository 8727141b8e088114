use coalesce_schema::Schema;
use coalesce_types::{AttributeMap, Entity, EntityId, EntityRef, EntityType, JoinTable, Relationship, Value};

use crate::error::{StoreError, StoreResult};

/// Records reached by following one relationship.
#[derive(Clone, Debug, PartialEq)]
pub enum Related {
    /// A one-to-one or many-to-one relationship: at most one record.
    One(Option<Entity>),
    /// A collection, in store order.
    Many(Vec<Entity>),
}

impl Related {
    /// Flatten into a list of zero or more records.
    pub fn into_vec(self) -> Vec<Entity> {
        match self {
            Self::One(one) => one.into_iter().collect(),
            Self::Many(many) => many,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(one) => usize::from(one.is_some()),
            Self::Many(many) => many.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A persistent store of typed records.
///
/// All implementations must satisfy these invariants:
/// - Reads and writes only happen inside a [`StoreTransaction`].
/// - A transaction's writes become visible to later transactions only after
///   [`StoreTransaction::commit`]; dropping it discards them.
/// - Record ids are never reused within a type.
pub trait EntityStore: Send + Sync {
    /// The schema every record in this store conforms to.
    fn schema(&self) -> &Schema;

    /// Open a transaction.
    ///
    /// Backends may serialize transactions; the in-memory store blocks until
    /// the previous one ends.
    fn begin(&self) -> StoreResult<Box<dyn StoreTransaction + '_>>;
}

/// Reads and writes scoped to one atomic unit of work.
///
/// Entities returned from a transaction are detached snapshots. Writing one
/// back goes through [`Self::save`], which validates it against the schema.
pub trait StoreTransaction {
    fn schema(&self) -> &Schema;

    // ---- Records ----

    /// Insert a new record and return it with its assigned id.
    fn insert(&mut self, entity_type: &EntityType, attributes: AttributeMap) -> StoreResult<Entity>;

    /// Load a record. Returns `Ok(None)` if it does not exist.
    fn find(&self, entity: &EntityRef) -> StoreResult<Option<Entity>>;

    /// Load a record, failing with [`StoreError::NotFound`] if it is gone.
    fn get(&self, entity: &EntityRef) -> StoreResult<Entity> {
        self.find(entity)?
            .ok_or_else(|| StoreError::NotFound(entity.clone()))
    }

    fn exists(&self, entity: &EntityRef) -> StoreResult<bool> {
        Ok(self.find(entity)?.is_some())
    }

    /// Every record of a type, in id order.
    fn all(&self, entity_type: &str) -> StoreResult<Vec<Entity>>;

    /// Validate and persist `entity`, replacing the stored attributes.
    /// Returns the stored snapshot, including store-maintained timestamps.
    fn save(&mut self, entity: &Entity) -> StoreResult<Entity>;

    /// Delete a record and cascade to its declared dependents.
    ///
    /// Join rows referencing the record are always removed. Returns `false`
    /// if the record was already gone.
    fn delete(&mut self, entity: &EntityRef) -> StoreResult<bool>;

    // ---- Attributes ----

    /// Read one declared attribute.
    fn get_attribute(&self, entity: &EntityRef, name: &str) -> StoreResult<Value> {
        let model = self.schema().model(entity.entity_type.as_str())?;
        if !model.has_attribute(name) {
            return Err(StoreError::UnknownAttribute {
                entity_type: entity.entity_type.clone(),
                attribute: name.to_string(),
            });
        }
        Ok(self.get(entity)?.get(name).clone())
    }

    /// Write one attribute and persist the record.
    fn set_attribute(&mut self, entity: &EntityRef, name: &str, value: Value) -> StoreResult<Entity> {
        let mut record = self.get(entity)?;
        record.set(name, value);
        self.save(&record)
    }

    // ---- Relationships ----

    /// Relationships declared on a type, in declaration order.
    fn list_relationships(&self, entity_type: &str) -> StoreResult<Vec<Relationship>> {
        Ok(self.schema().relationships(entity_type)?.to_vec())
    }

    /// Follow a declared relationship, including derived ones.
    fn get_related(&self, entity: &EntityRef, relationship: &str) -> StoreResult<Related>;

    /// Point `entity`'s foreign key at `new_owner` and persist it.
    fn reassign_foreign_key(
        &mut self,
        entity: &EntityRef,
        foreign_key: &str,
        new_owner: EntityId,
    ) -> StoreResult<Entity> {
        self.set_attribute(entity, foreign_key, Value::Ref(new_owner))
    }

    /// Add a join row. Returns `false` if the link already existed.
    fn link(&mut self, join: &JoinTable, owner: EntityId, target: EntityId) -> StoreResult<bool>;

    /// Move the join row linking `old_owner` to `target` over to `new_owner`.
    ///
    /// If `new_owner` is already linked to `target` the old row is simply
    /// removed.
    fn rewrite_join_row(
        &mut self,
        join: &JoinTable,
        old_owner: EntityId,
        new_owner: EntityId,
        target: EntityId,
    ) -> StoreResult<()>;

    // ---- Completion ----

    /// Make every write of this transaction durable.
    fn commit(self: Box<Self>) -> StoreResult<()>;
}
