use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use coalesce_types::{EntityId, EntityType, Relationship, Value};
use serde::{Deserialize, Serialize};

use crate::behavior::{DefaultBehavior, MergeBehavior};

/// Declared kind of an attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributeKind {
    /// Accepts any value.
    #[default]
    Any,
    Text,
    Integer,
    Float,
    Boolean,
    Timestamp,
    /// Holds the id of another record.
    Reference,
    List,
}

impl AttributeKind {
    /// Returns `true` if `value` may be stored in an attribute of this kind.
    /// Null is accepted by every kind; presence is a separate constraint.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (Self::Any, _) => true,
            (Self::Text, Value::Text(_))
            | (Self::Integer, Value::Int(_))
            | (Self::Float, Value::Float(_) | Value::Int(_))
            | (Self::Boolean, Value::Bool(_))
            | (Self::Timestamp, Value::Timestamp(_))
            | (Self::Reference, Value::Ref(_))
            | (Self::List, Value::List(_)) => true,
            _ => false,
        }
    }

    /// Best-effort conversion of loosely-typed input (JSON numbers and
    /// strings) into this kind. Values that cannot be converted are returned
    /// unchanged so that validation reports them.
    pub fn coerce(self, value: Value) -> Value {
        match (self, value) {
            (Self::Reference, Value::Int(n)) if n >= 0 => {
                Value::Ref(EntityId::new(n.unsigned_abs()))
            }
            (Self::Timestamp, Value::Text(s)) => match DateTime::parse_from_rfc3339(&s) {
                Ok(ts) => Value::Timestamp(ts.with_timezone(&Utc)),
                Err(_) => Value::Text(s),
            },
            (Self::Float, Value::Int(n)) => Value::Float(n as f64),
            (_, value) => value,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::Reference => "reference",
            Self::List => "list",
        }
    }
}

/// A declared attribute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    #[serde(default)]
    pub kind: AttributeKind,
    /// Saving a record with this attribute blank fails validation.
    #[serde(default)]
    pub required: bool,
}

impl AttributeDef {
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// No two live records of a type may share the same non-blank values for
/// all of `attributes`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueConstraint {
    pub attributes: Vec<String>,
}

/// Static description of one entity type.
#[derive(Clone, Debug)]
pub struct EntityModel {
    name: EntityType,
    attributes: Vec<AttributeDef>,
    relationships: Vec<Relationship>,
    unique: Vec<UniqueConstraint>,
    excluded: BTreeSet<String>,
    timestamps: bool,
    behavior: Arc<dyn MergeBehavior>,
}

impl EntityModel {
    pub fn new(name: &str) -> Self {
        Self {
            name: EntityType::from(name),
            attributes: Vec::new(),
            relationships: Vec::new(),
            unique: Vec::new(),
            excluded: BTreeSet::new(),
            timestamps: false,
            behavior: Arc::new(DefaultBehavior),
        }
    }

    // ---- Declaration ----

    pub fn attribute(mut self, attribute: AttributeDef) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn text(self, name: &str) -> Self {
        self.attribute(AttributeDef::new(name, AttributeKind::Text))
    }

    pub fn integer(self, name: &str) -> Self {
        self.attribute(AttributeDef::new(name, AttributeKind::Integer))
    }

    pub fn reference(self, name: &str) -> Self {
        self.attribute(AttributeDef::new(name, AttributeKind::Reference))
    }

    /// Declare `created_at` and `updated_at`, maintained by the store.
    pub fn timestamps(mut self) -> Self {
        self.timestamps = true;
        for name in ["created_at", "updated_at"] {
            if self.attribute_def(name).is_none() {
                self.attributes
                    .push(AttributeDef::new(name, AttributeKind::Timestamp));
            }
        }
        self
    }

    pub fn relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Exclude a relationship from merges: it is neither reassigned nor
    /// merged, and donor-side records go away with the donor.
    pub fn exclude(mut self, relationship: &str) -> Self {
        self.excluded.insert(relationship.to_string());
        self
    }

    pub fn unique<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique.push(UniqueConstraint {
            attributes: attributes.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn behavior(mut self, behavior: impl MergeBehavior + 'static) -> Self {
        self.behavior = Arc::new(behavior);
        self
    }

    pub fn shared_behavior(mut self, behavior: Arc<dyn MergeBehavior>) -> Self {
        self.behavior = behavior;
        self
    }

    // ---- Queries ----

    pub fn name(&self) -> &EntityType {
        &self.name
    }

    pub fn attributes(&self) -> &[AttributeDef] {
        &self.attributes
    }

    pub fn attribute_def(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute_def(name).is_some()
    }

    /// Declared attribute names, in declaration order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    /// Declared relationships, in declaration order.
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn relationship_def(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }

    pub fn unique_constraints(&self) -> &[UniqueConstraint] {
        &self.unique
    }

    pub fn has_timestamps(&self) -> bool {
        self.timestamps
    }

    /// Declared exclusions, without those contributed by the behavior.
    pub fn declared_exclusions(&self) -> impl Iterator<Item = &str> {
        self.excluded.iter().map(String::as_str)
    }

    /// Returns `true` if the named relationship is excluded from merges,
    /// either by declaration or by the type's behavior.
    pub fn excludes(&self, relationship: &str) -> bool {
        self.excluded.contains(relationship) || self.behavior.excludes_relationship(relationship)
    }

    pub fn merge_behavior(&self) -> &dyn MergeBehavior {
        self.behavior.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::NormalizedBehavior;

    #[test]
    fn kind_accepts() {
        assert!(AttributeKind::Text.accepts(&Value::from("x")));
        assert!(AttributeKind::Text.accepts(&Value::Null));
        assert!(!AttributeKind::Text.accepts(&Value::Int(1)));
        assert!(AttributeKind::Float.accepts(&Value::Int(1)));
        assert!(AttributeKind::Reference.accepts(&Value::Ref(EntityId::new(1))));
        assert!(!AttributeKind::Reference.accepts(&Value::from("1")));
        assert!(AttributeKind::Any.accepts(&Value::List(vec![])));
    }

    #[test]
    fn kind_coerce() {
        assert_eq!(
            AttributeKind::Reference.coerce(Value::Int(3)),
            Value::Ref(EntityId::new(3))
        );
        assert_eq!(AttributeKind::Reference.coerce(Value::Int(-3)), Value::Int(-3));
        assert_eq!(AttributeKind::Float.coerce(Value::Int(2)), Value::Float(2.0));
        let ts = AttributeKind::Timestamp.coerce(Value::from("2008-01-10T00:00:00Z"));
        assert!(matches!(ts, Value::Timestamp(_)));
        let bad = AttributeKind::Timestamp.coerce(Value::from("yesterday"));
        assert_eq!(bad, Value::from("yesterday"));
        assert_eq!(AttributeKind::Text.coerce(Value::Int(1)), Value::Int(1));
    }

    #[test]
    fn timestamps_declared_once() {
        let model = EntityModel::new("Company")
            .attribute(AttributeDef::new("created_at", AttributeKind::Timestamp))
            .timestamps();
        assert!(model.has_timestamps());
        assert_eq!(
            model.attribute_names().collect::<Vec<_>>(),
            vec!["created_at", "updated_at"]
        );
    }

    #[test]
    fn exclusions_combine_declared_and_behavior() {
        let model = EntityModel::new("Person")
            .exclude("avatar")
            .behavior(NormalizedBehavior::new(vec![]).excluding("history"));
        assert!(model.excludes("avatar"));
        assert!(model.excludes("history"));
        assert!(!model.excludes("address"));
        assert_eq!(model.declared_exclusions().collect::<Vec<_>>(), vec!["avatar"]);
    }

    #[test]
    fn relationship_order_is_declaration_order() {
        let model = EntityModel::new("Company")
            .relationship(Relationship::has_many("b", EntityType::from("B"), "company_id"))
            .relationship(Relationship::has_many("a", EntityType::from("A"), "company_id"));
        let names: Vec<_> = model.relationships().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(model.relationship_def("a").is_some());
        assert!(model.relationship_def("c").is_none());
    }
}
