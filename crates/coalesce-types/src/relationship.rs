use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::identity::EntityType;

/// How many records sit on each side of a relationship.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    /// At most one related record, which stores the foreign key.
    OneToOne,
    /// Any number of related records, each storing the foreign key.
    OneToMany,
    /// Any number of related records, linked through a join table.
    ManyToMany,
    /// This record stores the foreign key of one related record.
    ManyToOne,
}

impl Cardinality {
    /// Returns `true` if the relationship resolves to a collection.
    pub fn is_collection(self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneToOne => "one-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToMany => "many-to-many",
            Self::ManyToOne => "many-to-one",
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cardinality {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one-to-one" | "has-one" => Ok(Self::OneToOne),
            "one-to-many" | "has-many" => Ok(Self::OneToMany),
            "many-to-many" => Ok(Self::ManyToMany),
            "many-to-one" | "belongs-to" => Ok(Self::ManyToOne),
            other => Err(TypeError::UnknownCardinality(other.to_string())),
        }
    }
}

/// What happens to related records when the owner is deleted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dependent {
    /// Related records are left untouched.
    #[default]
    None,
    /// Related records are deleted, cascading further.
    Destroy,
    /// The related records' foreign keys are cleared.
    Nullify,
}

/// A join table linking two entity types.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinTable {
    /// Table name, e.g. `people_projects`.
    pub name: String,
    /// Column holding the id of the side that declares the relationship.
    pub owner_key: String,
    /// Column holding the id of the related side.
    pub target_key: String,
}

impl JoinTable {
    pub fn new(
        name: impl Into<String>,
        owner_key: impl Into<String>,
        target_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            owner_key: owner_key.into(),
            target_key: target_key.into(),
        }
    }
}

/// How a relationship is physically stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Linkage {
    /// The related record stores the owner's id in `attribute`. Polymorphic
    /// relationships also store the owner's type name in `type_attribute`.
    ForeignKey {
        attribute: String,
        type_attribute: Option<String>,
    },
    /// The declaring record stores the related record's id in `attribute`.
    Owner { attribute: String },
    /// Rows in a join table link both sides.
    Join(JoinTable),
    /// Derived by following `through` on the declaring type and then
    /// `source` on each intermediate record.
    Through { through: String, source: String },
}

/// Static reflection of one declared relationship.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub name: String,
    pub target: EntityType,
    pub cardinality: Cardinality,
    pub linkage: Linkage,
    #[serde(default)]
    pub dependent: Dependent,
}

impl Relationship {
    /// A one-to-one relationship whose foreign key lives on `target`.
    pub fn has_one(name: impl Into<String>, target: EntityType, foreign_key: impl Into<String>) -> Self {
        Self::keyed(name, target, Cardinality::OneToOne, foreign_key)
    }

    /// A one-to-many relationship whose foreign key lives on `target`.
    pub fn has_many(
        name: impl Into<String>,
        target: EntityType,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::keyed(name, target, Cardinality::OneToMany, foreign_key)
    }

    /// A many-to-one relationship whose foreign key lives on the declaring type.
    pub fn belongs_to(
        name: impl Into<String>,
        target: EntityType,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target,
            cardinality: Cardinality::ManyToOne,
            linkage: Linkage::Owner {
                attribute: foreign_key.into(),
            },
            dependent: Dependent::None,
        }
    }

    /// A many-to-many relationship stored in `join`.
    pub fn many_to_many(name: impl Into<String>, target: EntityType, join: JoinTable) -> Self {
        Self {
            name: name.into(),
            target,
            cardinality: Cardinality::ManyToMany,
            linkage: Linkage::Join(join),
            dependent: Dependent::None,
        }
    }

    /// A derived relationship computed through another one.
    pub fn through(
        name: impl Into<String>,
        target: EntityType,
        cardinality: Cardinality,
        through: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target,
            cardinality,
            linkage: Linkage::Through {
                through: through.into(),
                source: source.into(),
            },
            dependent: Dependent::None,
        }
    }

    fn keyed(
        name: impl Into<String>,
        target: EntityType,
        cardinality: Cardinality,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target,
            cardinality,
            linkage: Linkage::ForeignKey {
                attribute: foreign_key.into(),
                type_attribute: None,
            },
            dependent: Dependent::None,
        }
    }

    /// Mark a foreign-key relationship as polymorphic, storing the owner's
    /// type name in `type_attribute`. No effect on other linkages.
    pub fn polymorphic(mut self, type_attribute: impl Into<String>) -> Self {
        if let Linkage::ForeignKey {
            type_attribute: slot,
            ..
        } = &mut self.linkage
        {
            *slot = Some(type_attribute.into());
        }
        self
    }

    pub fn dependent(mut self, dependent: Dependent) -> Self {
        self.dependent = dependent;
        self
    }

    /// Returns `true` unless the relationship is derived through another.
    pub fn is_direct(&self) -> bool {
        !matches!(self.linkage, Linkage::Through { .. })
    }

    /// The foreign-key attribute, on whichever side stores it.
    pub fn foreign_key(&self) -> Option<&str> {
        match &self.linkage {
            Linkage::ForeignKey { attribute, .. } | Linkage::Owner { attribute } => {
                Some(attribute)
            }
            Linkage::Join(_) | Linkage::Through { .. } => None,
        }
    }

    /// The polymorphic type attribute on the related record, if any.
    pub fn type_attribute(&self) -> Option<&str> {
        match &self.linkage {
            Linkage::ForeignKey { type_attribute, .. } => type_attribute.as_deref(),
            _ => None,
        }
    }

    pub fn join_table(&self) -> Option<&JoinTable> {
        match &self.linkage {
            Linkage::Join(join) => Some(join),
            _ => None,
        }
    }
}
