use std::collections::{BTreeMap, BTreeSet};

use coalesce_types::{EntityType, JoinTable, Linkage, Relationship};
use tracing::debug;

use crate::error::{SchemaError, SchemaResult};
use crate::model::EntityModel;

/// Registry of every declared entity type.
///
/// Built once through [`SchemaBuilder`], which validates that relationship
/// targets, foreign keys, and derived-relationship paths all resolve. A
/// built schema is immutable and safe to share.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    models: BTreeMap<EntityType, EntityModel>,
    order: Vec<EntityType>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn get(&self, entity_type: &str) -> Option<&EntityModel> {
        self.models.get(entity_type)
    }

    pub fn model(&self, entity_type: &str) -> SchemaResult<&EntityModel> {
        self.get(entity_type)
            .ok_or_else(|| SchemaError::UnknownEntityType(entity_type.to_string()))
    }

    pub fn contains(&self, entity_type: &str) -> bool {
        self.models.contains_key(entity_type)
    }

    /// Declared types, in registration order.
    pub fn entity_types(&self) -> impl Iterator<Item = &EntityType> {
        self.order.iter()
    }

    pub fn models(&self) -> impl Iterator<Item = &EntityModel> {
        self.order.iter().filter_map(|ty| self.models.get(ty))
    }

    /// All relationships a type declares, in declaration order.
    pub fn relationships(&self, entity_type: &str) -> SchemaResult<&[Relationship]> {
        Ok(self.model(entity_type)?.relationships())
    }

    pub fn relationship(&self, entity_type: &str, name: &str) -> SchemaResult<&Relationship> {
        let model = self.model(entity_type)?;
        model
            .relationship_def(name)
            .ok_or_else(|| SchemaError::UnknownRelationship {
                entity: model.name().clone(),
                relationship: name.to_string(),
            })
    }

    /// Join-table columns that reference records of `entity_type`, from
    /// relationships declared on either side. Deduplicated by table and column.
    pub fn join_columns_for(&self, entity_type: &str) -> Vec<(&JoinTable, &str)> {
        let mut seen = BTreeSet::new();
        let mut columns = Vec::new();
        for model in self.models() {
            for rel in model.relationships() {
                let Some(join) = rel.join_table() else {
                    continue;
                };
                let mut candidates = Vec::with_capacity(2);
                if model.name().as_str() == entity_type {
                    candidates.push(join.owner_key.as_str());
                }
                if rel.target.as_str() == entity_type {
                    candidates.push(join.target_key.as_str());
                }
                for column in candidates {
                    if seen.insert((join.name.as_str(), column)) {
                        columns.push((join, column));
                    }
                }
            }
        }
        columns
    }

    fn validate(&self) -> SchemaResult<()> {
        for model in self.models() {
            self.validate_model(model)?;
        }
        Ok(())
    }

    fn validate_model(&self, model: &EntityModel) -> SchemaResult<()> {
        let entity = model.name();

        let mut attribute_names = BTreeSet::new();
        for name in model.attribute_names() {
            if !attribute_names.insert(name) {
                return Err(SchemaError::DuplicateAttribute {
                    entity: entity.clone(),
                    attribute: name.to_string(),
                });
            }
        }

        let mut relationship_names = BTreeSet::new();
        for rel in model.relationships() {
            if !relationship_names.insert(rel.name.as_str()) {
                return Err(SchemaError::DuplicateRelationship {
                    entity: entity.clone(),
                    relationship: rel.name.clone(),
                });
            }
            self.validate_relationship(model, rel)?;
        }

        for name in model.declared_exclusions() {
            if model.relationship_def(name).is_none() {
                return Err(SchemaError::UnknownRelationship {
                    entity: entity.clone(),
                    relationship: name.to_string(),
                });
            }
        }

        for constraint in model.unique_constraints() {
            if constraint.attributes.is_empty() {
                return Err(SchemaError::InvalidDefinition(format!(
                    "{entity}: unique constraint without attributes"
                )));
            }
            for attribute in &constraint.attributes {
                if !model.has_attribute(attribute) {
                    return Err(SchemaError::UnknownUniqueAttribute {
                        entity: entity.clone(),
                        attribute: attribute.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_relationship(&self, model: &EntityModel, rel: &Relationship) -> SchemaResult<()> {
        let entity = model.name();
        let target = self
            .get(rel.target.as_str())
            .ok_or_else(|| SchemaError::UnknownTarget {
                entity: entity.clone(),
                relationship: rel.name.clone(),
                target: rel.target.clone(),
            })?;

        let missing = |attribute: &str, owner: &EntityModel| SchemaError::MissingAttribute {
            entity: entity.clone(),
            relationship: rel.name.clone(),
            attribute: attribute.to_string(),
            owner: owner.name().clone(),
        };

        match &rel.linkage {
            Linkage::ForeignKey {
                attribute,
                type_attribute,
            } => {
                if !target.has_attribute(attribute) {
                    return Err(missing(attribute, target));
                }
                if let Some(type_attribute) = type_attribute {
                    if !target.has_attribute(type_attribute) {
                        return Err(missing(type_attribute, target));
                    }
                }
            }
            Linkage::Owner { attribute } => {
                if !model.has_attribute(attribute) {
                    return Err(missing(attribute, model));
                }
            }
            Linkage::Join(join) => {
                if join.owner_key == join.target_key {
                    return Err(SchemaError::InvalidDefinition(format!(
                        "{entity}.{}: join table {} uses '{}' for both sides",
                        rel.name, join.name, join.owner_key
                    )));
                }
            }
            Linkage::Through { through, source } => {
                let via = model
                    .relationship_def(through)
                    .ok_or_else(|| SchemaError::UnknownRelationship {
                        entity: entity.clone(),
                        relationship: through.clone(),
                    })?;
                let source_rel = self.relationship(via.target.as_str(), source)?;
                if source_rel.target != rel.target {
                    return Err(SchemaError::InvalidDefinition(format!(
                        "{entity}.{}: source {}.{source} targets {}, expected {}",
                        rel.name, via.target, source_rel.target, rel.target
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Collects models and validates them into a [`Schema`].
#[derive(Default)]
pub struct SchemaBuilder {
    models: Vec<EntityModel>,
}

impl SchemaBuilder {
    pub fn model(mut self, model: EntityModel) -> Self {
        self.models.push(model);
        self
    }

    pub fn build(self) -> SchemaResult<Schema> {
        let mut schema = Schema::default();
        for model in self.models {
            let name = model.name().clone();
            if name.as_str().trim().is_empty() {
                return Err(SchemaError::InvalidDefinition(
                    "entity type name cannot be empty".into(),
                ));
            }
            if schema.models.contains_key(&name) {
                return Err(SchemaError::DuplicateEntityType(name));
            }
            schema.order.push(name.clone());
            schema.models.insert(name, model);
        }
        schema.validate()?;
        debug!(models = schema.order.len(), "schema registered");
        Ok(schema)
    }
}
