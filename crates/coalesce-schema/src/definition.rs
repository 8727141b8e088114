//! Serializable schema definitions.
//!
//! ```toml
//! [[models]]
//! name = "Company"
//! timestamps = true
//! attributes = [{ name = "name", kind = "text" }]
//!
//! [[models.relationships]]
//! name = "phonenumbers"
//! target = "Phonenumber"
//! cardinality = "one-to-many"
//! as = "phonable"
//! dependent = "destroy"
//! ```
//!
//! Foreign keys default from the declaring type (`company_id`), or from the
//! polymorphic name (`phonable_id` / `phonable_type`) when `as` is given.

use coalesce_types::{Cardinality, Dependent, EntityType, JoinTable, Relationship};
use serde::{Deserialize, Serialize};

use crate::behavior::{KeyAttribute, NormalizedBehavior};
use crate::error::{SchemaError, SchemaResult};
use crate::model::{AttributeDef, EntityModel};
use crate::schema::Schema;

/// Top-level schema document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SchemaDef {
    #[serde(default)]
    pub models: Vec<ModelDef>,
}

/// One entity type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelDef {
    pub name: String,
    #[serde(default)]
    pub timestamps: bool,
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
    #[serde(default)]
    pub relationships: Vec<RelationshipDef>,
    /// Relationships excluded from merges.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Each entry is one (possibly composite) unique constraint.
    #[serde(default)]
    pub unique: Vec<Vec<String>>,
    #[serde(default)]
    pub equivalence: Option<EquivalenceDef>,
}

/// Declarative equivalence override.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EquivalenceDef {
    pub keys: Vec<KeyAttribute>,
}

/// One relationship, in the loose form accepted from files.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationshipDef {
    pub name: String,
    pub target: String,
    pub cardinality: Cardinality,
    #[serde(default)]
    pub foreign_key: Option<String>,
    /// Polymorphic name: the target stores `<as>_id` and `<as>_type`.
    #[serde(default, rename = "as")]
    pub polymorphic_as: Option<String>,
    #[serde(default)]
    pub join_table: Option<String>,
    #[serde(default)]
    pub owner_key: Option<String>,
    #[serde(default)]
    pub target_key: Option<String>,
    #[serde(default)]
    pub through: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub dependent: Dependent,
}

impl SchemaDef {
    pub fn from_toml_str(input: &str) -> SchemaResult<Self> {
        toml::from_str(input).map_err(|e| SchemaError::Parse(e.to_string()))
    }

    /// Compile and validate into a [`Schema`].
    pub fn into_schema(self) -> SchemaResult<Schema> {
        let mut builder = Schema::builder();
        for model in self.models {
            builder = builder.model(model.into_model()?);
        }
        builder.build()
    }
}

impl ModelDef {
    fn into_model(self) -> SchemaResult<EntityModel> {
        let entity = EntityType::new(self.name.clone())?;
        let mut model = EntityModel::new(entity.as_str());
        for attribute in self.attributes {
            model = model.attribute(attribute);
        }
        if self.timestamps {
            model = model.timestamps();
        }
        for rel in self.relationships {
            model = model.relationship(rel.into_relationship(&entity)?);
        }
        for name in &self.exclude {
            model = model.exclude(name);
        }
        for constraint in self.unique {
            model = model.unique(constraint);
        }
        if let Some(equivalence) = self.equivalence {
            model = model.behavior(NormalizedBehavior::new(equivalence.keys));
        }
        Ok(model)
    }
}

impl RelationshipDef {
    fn into_relationship(self, owner: &EntityType) -> SchemaResult<Relationship> {
        let target = EntityType::new(self.target.clone())?;
        let invalid = |reason: &str| {
            SchemaError::InvalidDefinition(format!("{owner}.{}: {reason}", self.name))
        };

        if let Some(through) = &self.through {
            let source = self
                .source
                .clone()
                .ok_or_else(|| invalid("derived relationship needs a source"))?;
            return Ok(Relationship::through(
                self.name.clone(),
                target,
                self.cardinality,
                through.clone(),
                source,
            ));
        }

        let rel = match self.cardinality {
            Cardinality::OneToOne | Cardinality::OneToMany => {
                let foreign_key = match (&self.foreign_key, &self.polymorphic_as) {
                    (Some(fk), _) => fk.clone(),
                    (None, Some(name)) => format!("{name}_id"),
                    (None, None) => format!("{}_id", snake_case(owner.as_str())),
                };
                let rel = if self.cardinality == Cardinality::OneToOne {
                    Relationship::has_one(self.name.clone(), target, foreign_key)
                } else {
                    Relationship::has_many(self.name.clone(), target, foreign_key)
                };
                match &self.polymorphic_as {
                    Some(name) => rel.polymorphic(format!("{name}_type")),
                    None => rel,
                }
            }
            Cardinality::ManyToOne => {
                let foreign_key = self
                    .foreign_key
                    .clone()
                    .unwrap_or_else(|| format!("{}_id", self.name));
                Relationship::belongs_to(self.name.clone(), target, foreign_key)
            }
            Cardinality::ManyToMany => {
                let table = self
                    .join_table
                    .clone()
                    .ok_or_else(|| invalid("many-to-many needs a join_table"))?;
                let owner_key = self
                    .owner_key
                    .clone()
                    .unwrap_or_else(|| format!("{}_id", snake_case(owner.as_str())));
                let target_key = self
                    .target_key
                    .clone()
                    .unwrap_or_else(|| format!("{}_id", snake_case(&self.target)));
                Relationship::many_to_many(
                    self.name.clone(),
                    target,
                    JoinTable::new(table, owner_key, target_key),
                )
            }
        };
        Ok(rel.dependent(self.dependent))
    }
}

/// `ProjectTask` becomes `project_task`.
fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
