//! Test-only model set: companies, people, and the records hanging off them.

use coalesce_schema::{EntityModel, KeyAttribute, NormalizedBehavior, Normalizer, Schema};
use coalesce_store::{with_transaction, EntityStore, InMemoryEntityStore, StoreResult};
use coalesce_types::{
    AttributeMap, Cardinality, Dependent, Entity, EntityId, EntityRef, EntityType, JoinTable,
    Relationship, Value,
};

pub(crate) fn ty(name: &str) -> EntityType {
    EntityType::from(name)
}

pub(crate) fn people_projects() -> JoinTable {
    JoinTable::new("people_projects", "person_id", "project_id")
}

pub(crate) fn schema() -> Schema {
    Schema::builder()
        .model(
            EntityModel::new("Company")
                .text("name")
                .text("alpha")
                .integer("status_code")
                .reference("creator_id")
                .reference("updater_id")
                .timestamps()
                .relationship(
                    Relationship::has_one("address", ty("Address"), "addressable_id")
                        .polymorphic("addressable_type")
                        .dependent(Dependent::Destroy),
                )
                .relationship(
                    Relationship::has_many("relationships", ty("Relationship"), "company_id")
                        .dependent(Dependent::Destroy),
                )
                .relationship(Relationship::through(
                    "people",
                    ty("Person"),
                    Cardinality::OneToMany,
                    "relationships",
                    "person",
                ))
                .relationship(Relationship::has_many("projects", ty("Project"), "company_id"))
                .relationship(
                    Relationship::has_many("phonenumbers", ty("Phonenumber"), "phonable_id")
                        .polymorphic("phonable_type")
                        .dependent(Dependent::Destroy),
                )
                .relationship(Relationship::belongs_to("creator", ty("Person"), "creator_id"))
                .relationship(Relationship::belongs_to("updater", ty("Person"), "updater_id")),
        )
        .model(
            EntityModel::new("Person")
                .text("name")
                .timestamps()
                .relationship(
                    Relationship::has_one("avatar", ty("Avatar"), "person_id").dependent(Dependent::Destroy),
                )
                .relationship(
                    Relationship::has_one("address", ty("Address"), "addressable_id")
                        .polymorphic("addressable_type")
                        .dependent(Dependent::Destroy),
                )
                .relationship(
                    Relationship::has_many("relationships", ty("Relationship"), "person_id")
                        .dependent(Dependent::Destroy),
                )
                .relationship(Relationship::through(
                    "companies",
                    ty("Company"),
                    Cardinality::OneToMany,
                    "relationships",
                    "company",
                ))
                .relationship(
                    Relationship::has_many("phonenumbers", ty("Phonenumber"), "phonable_id")
                        .polymorphic("phonable_type")
                        .dependent(Dependent::Destroy),
                )
                .relationship(Relationship::many_to_many("projects", ty("Project"), people_projects()))
                .exclude("avatar"),
        )
        .model(
            EntityModel::new("Project")
                .reference("company_id")
                .text("name")
                .text("code")
                .unique(["company_id", "name"])
                .relationship(Relationship::belongs_to("company", ty("Company"), "company_id"))
                .relationship(Relationship::many_to_many(
                    "people",
                    ty("Person"),
                    JoinTable::new("people_projects", "project_id", "person_id"),
                )),
        )
        .model(
            EntityModel::new("Relationship")
                .reference("company_id")
                .reference("person_id")
                .relationship(Relationship::belongs_to("company", ty("Company"), "company_id"))
                .relationship(Relationship::belongs_to("person", ty("Person"), "person_id")),
        )
        .model(
            EntityModel::new("Phonenumber")
                .reference("phonable_id")
                .text("phonable_type")
                .text("country_code")
                .text("number")
                .text("description")
                .behavior(NormalizedBehavior::new(vec![
                    KeyAttribute::new("country_code", Normalizer::Exact),
                    KeyAttribute::new("number", Normalizer::Digits),
                ])),
        )
        .model(
            EntityModel::new("Address")
                .reference("addressable_id")
                .text("addressable_type")
                .text("street")
                .text("zip")
                .text("city"),
        )
        .model(
            EntityModel::new("Avatar")
                .reference("person_id")
                .text("url")
                .text("alt"),
        )
        .build()
        .expect("fixture schema is valid")
}

/// A store over [`schema`] with committed-per-call helpers.
pub(crate) struct Fixture {
    pub(crate) store: InMemoryEntityStore,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self {
            store: InMemoryEntityStore::new(schema()),
        }
    }

    pub(crate) fn create(&self, entity_type: &str, attributes: &[(&str, Value)]) -> EntityRef {
        let attributes: AttributeMap = attributes
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        with_transaction(&self.store, |tx| -> StoreResult<_> {
            tx.insert(&ty(entity_type), attributes)
        })
        .expect("fixture insert")
        .entity_ref()
    }

    /// Attributes pointing a polymorphic record at `owner`.
    pub(crate) fn owned_by(prefix: &str, owner: &EntityRef) -> [(String, Value); 2] {
        [
            (format!("{prefix}_id"), Value::Ref(owner.id)),
            (format!("{prefix}_type"), Value::from(owner.entity_type.as_str())),
        ]
    }

    pub(crate) fn create_owned(
        &self,
        entity_type: &str,
        prefix: &str,
        owner: &EntityRef,
        attributes: &[(&str, Value)],
    ) -> EntityRef {
        let owner_attrs = Self::owned_by(prefix, owner);
        let mut all: Vec<(&str, Value)> = owner_attrs
            .iter()
            .map(|(name, value)| (name.as_str(), value.clone()))
            .collect();
        all.extend(attributes.iter().cloned());
        self.create(entity_type, &all)
    }

    pub(crate) fn link(&self, person: &EntityRef, project: &EntityRef) {
        with_transaction(&self.store, |tx| -> StoreResult<_> {
            tx.link(&people_projects(), person.id, project.id)
        })
        .expect("fixture link");
    }

    pub(crate) fn get(&self, entity: &EntityRef) -> Option<Entity> {
        self.store.find(entity)
    }

    pub(crate) fn exists(&self, entity: &EntityRef) -> bool {
        self.get(entity).is_some()
    }

    pub(crate) fn related(&self, entity: &EntityRef, relationship: &str) -> Vec<Entity> {
        let tx = self.store.begin().expect("fixture begin");
        tx.get_related(entity, relationship)
            .expect("fixture related")
            .into_vec()
    }

    pub(crate) fn related_ids(&self, entity: &EntityRef, relationship: &str) -> Vec<EntityId> {
        self.related(entity, relationship).iter().map(|e| e.id).collect()
    }
}
