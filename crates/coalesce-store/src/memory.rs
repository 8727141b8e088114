use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use coalesce_schema::{EntityModel, Schema};
use coalesce_types::{
    AttributeMap, Dependent, Entity, EntityId, EntityRef, EntityType, JoinTable, Linkage,
    Relationship, Value,
};
use tracing::debug;

use crate::constraints::{check_record, coerce_attributes};
use crate::dataset::{Dataset, JoinRow, RecordDef};
use crate::error::{StoreError, StoreResult};
use crate::traits::{EntityStore, Related, StoreTransaction};

const CREATED_AT: &str = "created_at";
const UPDATED_AT: &str = "updated_at";

/// Committed contents of an in-memory store.
#[derive(Clone, Debug, Default)]
struct StoreState {
    tables: BTreeMap<EntityType, BTreeMap<EntityId, AttributeMap>>,
    joins: BTreeMap<String, BTreeSet<JoinRow>>,
    next_ids: BTreeMap<EntityType, u64>,
}

impl StoreState {
    fn find(&self, entity: &EntityRef) -> Option<Entity> {
        self.tables
            .get(&entity.entity_type)
            .and_then(|table| table.get(&entity.id))
            .map(|attrs| Entity::new(entity.entity_type.clone(), entity.id, attrs.clone()))
    }

    fn contains(&self, entity: &EntityRef) -> bool {
        self.tables
            .get(&entity.entity_type)
            .is_some_and(|table| table.contains_key(&entity.id))
    }

    fn rows<'s>(&'s self, entity_type: &EntityType) -> impl Iterator<Item = (EntityId, &'s AttributeMap)> + 's {
        self.tables
            .get(entity_type)
            .into_iter()
            .flat_map(|table| table.iter().map(|(id, attrs)| (*id, attrs)))
    }

    fn records(&self, entity_type: &EntityType) -> Vec<Entity> {
        self.rows(entity_type)
            .map(|(id, attrs)| Entity::new(entity_type.clone(), id, attrs.clone()))
            .collect()
    }

    fn write(&mut self, entity: &Entity) {
        self.tables
            .entry(entity.entity_type.clone())
            .or_default()
            .insert(entity.id, entity.attributes.clone());
    }

    fn remove(&mut self, entity: &EntityRef) -> bool {
        self.tables
            .get_mut(&entity.entity_type)
            .is_some_and(|table| table.remove(&entity.id).is_some())
    }

    fn allocate_id(&mut self, entity_type: &EntityType) -> EntityId {
        let next = self.next_ids.entry(entity_type.clone()).or_insert(1);
        let id = EntityId::new(*next);
        *next += 1;
        id
    }

    /// Keep the id counter ahead of an explicitly chosen id.
    fn reserve_id(&mut self, entity_type: &EntityType, id: EntityId) {
        let next = self.next_ids.entry(entity_type.clone()).or_insert(1);
        *next = (*next).max(id.get() + 1);
    }
}

/// In-memory, `BTreeMap`-based entity store.
///
/// Intended for tests, the command line tool, and embedding. A transaction
/// holds the store lock for its whole lifetime and works on a private copy
/// of the state, which replaces the committed state on commit. Dropping the
/// transaction discards the copy, so rollback is free.
pub struct InMemoryEntityStore {
    schema: Arc<Schema>,
    state: Mutex<StoreState>,
}

impl InMemoryEntityStore {
    /// Create an empty store for `schema`.
    pub fn new(schema: Schema) -> Self {
        Self::with_shared_schema(Arc::new(schema))
    }

    pub fn with_shared_schema(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Create a store pre-populated from `dataset`.
    ///
    /// Records keep their ids. Every record is validated once all of them
    /// are loaded, so unique constraints see the complete data.
    pub fn from_dataset(schema: Schema, dataset: &Dataset) -> StoreResult<Self> {
        let store = Self::new(schema);
        let mut tx = store.transaction()?;
        tx.import(dataset)?;
        tx.finish();
        Ok(store)
    }

    /// Export the committed contents.
    pub fn to_dataset(&self) -> Dataset {
        let state = self.state.lock().expect("lock poisoned");
        let records = state
            .tables
            .iter()
            .filter(|(_, table)| !table.is_empty())
            .map(|(entity_type, table)| {
                let rows: Vec<RecordDef> = table
                    .iter()
                    .map(|(id, attributes)| RecordDef {
                        id: *id,
                        attributes: attributes.clone(),
                    })
                    .collect();
                (entity_type.to_string(), rows)
            })
            .collect();
        let joins = state
            .joins
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(name, rows)| (name.clone(), rows.iter().cloned().collect::<Vec<_>>()))
            .collect();
        Dataset { records, joins }
    }

    /// Committed snapshot of one record.
    pub fn find(&self, entity: &EntityRef) -> Option<Entity> {
        self.state.lock().expect("lock poisoned").find(entity)
    }

    /// Committed records of one type, in id order.
    pub fn records(&self, entity_type: &str) -> Vec<Entity> {
        let state = self.state.lock().expect("lock poisoned");
        state.records(&EntityType::from(entity_type))
    }

    /// Number of committed records of one type.
    pub fn count(&self, entity_type: &str) -> usize {
        let state = self.state.lock().expect("lock poisoned");
        state.rows(&EntityType::from(entity_type)).count()
    }

    /// Committed rows of one join table.
    pub fn join_rows(&self, table: &str) -> Vec<JoinRow> {
        let state = self.state.lock().expect("lock poisoned");
        state
            .joins
            .get(table)
            .map(|rows| rows.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn transaction(&self) -> StoreResult<MemoryTransaction<'_>> {
        let committed = self
            .state
            .lock()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))?;
        let working = committed.clone();
        Ok(MemoryTransaction {
            schema: &self.schema,
            committed,
            working,
        })
    }
}

impl EntityStore for InMemoryEntityStore {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn begin(&self) -> StoreResult<Box<dyn StoreTransaction + '_>> {
        Ok(Box::new(self.transaction()?))
    }
}

impl std::fmt::Debug for InMemoryEntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().expect("lock poisoned");
        let records: usize = state.tables.values().map(BTreeMap::len).sum();
        f.debug_struct("InMemoryEntityStore")
            .field("entity_types", &self.schema.entity_types().count())
            .field("record_count", &records)
            .finish()
    }
}

/// Transaction over an [`InMemoryEntityStore`].
struct MemoryTransaction<'a> {
    schema: &'a Schema,
    committed: MutexGuard<'a, StoreState>,
    working: StoreState,
}

impl<'a> MemoryTransaction<'a> {
    fn finish(self) {
        let MemoryTransaction {
            mut committed,
            working,
            ..
        } = self;
        *committed = working;
        debug!("transaction committed");
    }

    fn validate(&self, model: &EntityModel, entity: &Entity) -> StoreResult<()> {
        check_record(model, entity, self.working.rows(&entity.entity_type))
    }

    fn follow(&self, owner: &Entity, rel: &Relationship) -> StoreResult<Related> {
        let records = match &rel.linkage {
            Linkage::ForeignKey {
                attribute,
                type_attribute,
            } => self
                .working
                .rows(&rel.target)
                .filter(|(_, attrs)| points_at(attrs, attribute, type_attribute.as_deref(), owner))
                .map(|(id, attrs)| Entity::new(rel.target.clone(), id, attrs.clone()))
                .collect(),
            Linkage::Owner { attribute } => owner
                .get(attribute)
                .as_entity_id()
                .and_then(|id| self.working.find(&EntityRef::new(rel.target.clone(), id)))
                .into_iter()
                .collect(),
            Linkage::Join(join) => self
                .working
                .joins
                .get(&join.name)
                .into_iter()
                .flatten()
                .filter(|row| row.get(&join.owner_key) == Some(owner.id))
                .filter_map(|row| row.get(&join.target_key))
                .filter_map(|id| self.working.find(&EntityRef::new(rel.target.clone(), id)))
                .collect(),
            Linkage::Through { through, source } => {
                let via = self.schema.relationship(owner.entity_type.as_str(), through)?;
                let mut seen = BTreeSet::new();
                let mut out = Vec::new();
                for middle in self.follow(owner, via)?.into_vec() {
                    let hop = self.schema.relationship(middle.entity_type.as_str(), source)?;
                    for record in self.follow(&middle, hop)?.into_vec() {
                        if seen.insert(record.id) {
                            out.push(record);
                        }
                    }
                }
                out
            }
        };
        Ok(if rel.cardinality.is_collection() {
            Related::Many(records)
        } else {
            Related::One(records.into_iter().next())
        })
    }

    fn import(&mut self, dataset: &Dataset) -> StoreResult<()> {
        let schema = self.schema;
        let mut loaded = Vec::new();
        for (type_name, records) in &dataset.records {
            let model = schema.model(type_name)?;
            for record in records {
                let entity = Entity::new(
                    model.name().clone(),
                    record.id,
                    coerce_attributes(model, record.attributes.clone())?,
                );
                let entity_ref = entity.entity_ref();
                if self.working.contains(&entity_ref) {
                    return Err(StoreError::DuplicateId(entity_ref));
                }
                self.working.reserve_id(model.name(), record.id);
                self.working.write(&entity);
                loaded.push(entity);
            }
        }
        for entity in &loaded {
            self.validate(schema.model(entity.entity_type.as_str())?, entity)?;
        }

        for (table, rows) in &dataset.joins {
            let Some(join) = find_join_table(schema, table) else {
                return Err(StoreError::UnknownJoinTable(table.clone()));
            };
            for row in rows {
                match (row.get(&join.owner_key), row.get(&join.target_key)) {
                    (Some(owner), Some(target)) => {
                        self.link(join, owner, target)?;
                    }
                    _ => {
                        return Err(StoreError::Serialization(format!(
                            "{table}: row needs {} and {}",
                            join.owner_key, join.target_key
                        )))
                    }
                }
            }
        }
        debug!(records = loaded.len(), "dataset imported");
        Ok(())
    }

    fn stamp(model: &EntityModel, attributes: &mut AttributeMap, previous: Option<&AttributeMap>) {
        if !model.has_timestamps() {
            return;
        }
        let now = Value::Timestamp(Utc::now());
        let created = attributes.get(CREATED_AT).filter(|v| !v.is_blank()).cloned();
        let created = created
            .or_else(|| previous.and_then(|p| p.get(CREATED_AT)).filter(|v| !v.is_blank()).cloned())
            .unwrap_or_else(|| now.clone());
        attributes.insert(CREATED_AT.to_string(), created);
        attributes.insert(UPDATED_AT.to_string(), now);
    }
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn schema(&self) -> &Schema {
        self.schema
    }

    fn insert(&mut self, entity_type: &EntityType, attributes: AttributeMap) -> StoreResult<Entity> {
        let model = self.schema.model(entity_type.as_str())?;
        let mut attributes = coerce_attributes(model, attributes)?;
        Self::stamp(model, &mut attributes, None);
        let id = self.working.allocate_id(entity_type);
        let entity = Entity::new(entity_type.clone(), id, attributes);
        self.validate(model, &entity)?;
        self.working.write(&entity);
        debug!(entity = %entity.entity_ref(), "inserted");
        Ok(entity)
    }

    fn find(&self, entity: &EntityRef) -> StoreResult<Option<Entity>> {
        self.schema.model(entity.entity_type.as_str())?;
        Ok(self.working.find(entity))
    }

    fn all(&self, entity_type: &str) -> StoreResult<Vec<Entity>> {
        let model = self.schema.model(entity_type)?;
        Ok(self.working.records(model.name()))
    }

    fn save(&mut self, entity: &Entity) -> StoreResult<Entity> {
        let model = self.schema.model(entity.entity_type.as_str())?;
        let entity_ref = entity.entity_ref();
        let previous = self
            .working
            .tables
            .get(&entity.entity_type)
            .and_then(|table| table.get(&entity.id))
            .ok_or_else(|| StoreError::NotFound(entity_ref.clone()))?;
        let mut attributes = coerce_attributes(model, entity.attributes.clone())?;
        Self::stamp(model, &mut attributes, Some(previous));
        let stored = Entity::new(entity.entity_type.clone(), entity.id, attributes);
        self.validate(model, &stored)?;
        self.working.write(&stored);
        debug!(entity = %entity_ref, "saved");
        Ok(stored)
    }

    fn delete(&mut self, entity: &EntityRef) -> StoreResult<bool> {
        let schema = self.schema;
        let model = schema.model(entity.entity_type.as_str())?;
        let Some(record) = self.working.find(entity) else {
            return Ok(false);
        };

        // Collect dependents while the record can still be followed.
        let mut destroy = Vec::new();
        let mut nullify = Vec::new();
        for rel in model.relationships() {
            match (rel.dependent, &rel.linkage) {
                (Dependent::None, _) | (_, Linkage::Through { .. }) => {}
                (Dependent::Destroy, _) => {
                    destroy.extend(self.follow(&record, rel)?.into_vec().iter().map(Entity::entity_ref));
                }
                (Dependent::Nullify, Linkage::ForeignKey { attribute, type_attribute }) => {
                    for related in self.follow(&record, rel)?.into_vec() {
                        nullify.push((related.entity_ref(), attribute, type_attribute.as_deref()));
                    }
                }
                (Dependent::Nullify, _) => {}
            }
        }

        self.working.remove(entity);
        for (join, column) in schema.join_columns_for(entity.entity_type.as_str()) {
            if let Some(rows) = self.working.joins.get_mut(&join.name) {
                rows.retain(|row| row.get(column) != Some(entity.id));
            }
        }
        debug!(entity = %entity, "deleted");

        for (related, attribute, type_attribute) in nullify {
            if let Some(mut dependent) = self.working.find(&related) {
                dependent.set(attribute.as_str(), Value::Null);
                if let Some(type_attribute) = type_attribute {
                    dependent.set(type_attribute, Value::Null);
                }
                self.save(&dependent)?;
            }
        }
        for related in destroy {
            self.delete(&related)?;
        }
        Ok(true)
    }

    fn get_related(&self, entity: &EntityRef, relationship: &str) -> StoreResult<Related> {
        let rel = self.schema.relationship(entity.entity_type.as_str(), relationship)?;
        let owner = self.get(entity)?;
        self.follow(&owner, rel)
    }

    fn link(&mut self, join: &JoinTable, owner: EntityId, target: EntityId) -> StoreResult<bool> {
        if find_join_table(self.schema, &join.name).is_none() {
            return Err(StoreError::UnknownJoinTable(join.name.clone()));
        }
        let rows = self.working.joins.entry(join.name.clone()).or_default();
        Ok(rows.insert(JoinRow::new(join, owner, target)))
    }

    fn rewrite_join_row(
        &mut self,
        join: &JoinTable,
        old_owner: EntityId,
        new_owner: EntityId,
        target: EntityId,
    ) -> StoreResult<()> {
        let missing = || StoreError::MissingJoinRow {
            table: join.name.clone(),
            owner: old_owner,
            target,
        };
        let rows = self.working.joins.get_mut(&join.name).ok_or_else(missing)?;
        if !rows.remove(&JoinRow::new(join, old_owner, target)) {
            return Err(missing());
        }
        rows.insert(JoinRow::new(join, new_owner, target));
        debug!(table = %join.name, from = %old_owner, to = %new_owner, target = %target, "join row rewritten");
        Ok(())
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        (*self).finish();
        Ok(())
    }
}

/// Returns `true` if `attrs` holds a foreign key (and, when polymorphic,
/// a type name) pointing at `owner`.
fn points_at(attrs: &AttributeMap, attribute: &str, type_attribute: Option<&str>, owner: &Entity) -> bool {
    let id_matches = attrs.get(attribute).and_then(Value::as_entity_id) == Some(owner.id);
    let type_matches = type_attribute.map_or(true, |t| {
        attrs.get(t).and_then(Value::as_text) == Some(owner.entity_type.as_str())
    });
    id_matches && type_matches
}

fn find_join_table<'s>(schema: &'s Schema, name: &str) -> Option<&'s JoinTable> {
    schema
        .models()
        .flat_map(|model| model.relationships())
        .filter_map(Relationship::join_table)
        .find(|join| join.name == name)
}
