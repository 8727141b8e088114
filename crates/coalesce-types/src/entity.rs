use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::{EntityId, EntityRef, EntityType};
use crate::value::Value;

/// Attribute name to value, ordered by name for deterministic output.
pub type AttributeMap = BTreeMap<String, Value>;

static NULL: Value = Value::Null;

/// Point-in-time snapshot of one stored record.
///
/// An `Entity` is a detached copy: mutating it has no effect on the store
/// until it is saved. Absent attributes read as [`Value::Null`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_type: EntityType,
    pub id: EntityId,
    #[serde(default)]
    pub attributes: AttributeMap,
}

impl Entity {
    pub fn new(entity_type: EntityType, id: EntityId, attributes: AttributeMap) -> Self {
        Self {
            entity_type,
            id,
            attributes,
        }
    }

    /// Type-qualified identity of this record.
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.entity_type.clone(), self.id)
    }

    /// Read an attribute; absent attributes are null.
    pub fn get(&self, name: &str) -> &Value {
        self.attributes.get(name).unwrap_or(&NULL)
    }

    /// Write an attribute, returning the previous value if one was set.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attributes.insert(name.into(), value.into())
    }

    /// Builder-style [`Self::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn is_blank(&self, name: &str) -> bool {
        self.get(name).is_blank()
    }

    /// Returns `true` if both snapshots are of the same declared type.
    pub fn same_type(&self, other: &Entity) -> bool {
        self.entity_type == other.entity_type
    }

    /// Returns `true` if both snapshots describe the same stored record.
    pub fn same_record(&self, other: &Entity) -> bool {
        self.same_type(other) && self.id == other.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(id: u64) -> Entity {
        Entity::new(EntityType::from("Company"), EntityId::new(id), AttributeMap::new())
    }

    #[test]
    fn absent_attribute_reads_null() {
        let c = company(1);
        assert_eq!(c.get("name"), &Value::Null);
        assert!(c.is_blank("name"));
    }

    #[test]
    fn set_returns_previous() {
        let mut c = company(1);
        assert_eq!(c.set("name", "Acme"), None);
        assert_eq!(c.set("name", "Acme Corp"), Some(Value::from("Acme")));
        assert_eq!(c.get("name"), &Value::from("Acme Corp"));
    }

    #[test]
    fn same_record_requires_type_and_id() {
        let a = company(1);
        let b = company(1).with("name", "other");
        let c = company(2);
        let p = Entity::new(EntityType::from("Person"), EntityId::new(1), AttributeMap::new());
        assert!(a.same_record(&b));
        assert!(!a.same_record(&c));
        assert!(!a.same_record(&p));
        assert!(a.same_type(&c));
    }

    #[test]
    fn entity_ref_matches_identity() {
        assert_eq!(company(4).entity_ref().to_string(), "Company#4");
    }
}
