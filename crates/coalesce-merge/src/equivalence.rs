//! Equivalence Checker.
//!
//! The same predicate serves callers deciding whether two records are
//! duplicates and the reassigner deciding whether a donor's related record
//! folds into one the survivor already has.

use coalesce_schema::{attributes_equivalent, Schema};
use coalesce_types::{Entity, IndifferentAttributes, Linkage, Relationship, Value};

/// Returns `true` if `a` and `b` represent the same real-world record.
///
/// Records of different types are never equivalent. Types unknown to the
/// schema fall back to plain attribute comparison.
pub fn equivalent(schema: &Schema, indifferent: &IndifferentAttributes, a: &Entity, b: &Entity) -> bool {
    if !a.same_type(b) {
        return false;
    }
    match schema.get(a.entity_type.as_str()) {
        Some(model) => model.merge_behavior().equivalent(a, b, indifferent),
        None => attributes_equivalent(a, b, indifferent),
    }
}

/// Read-only copy of `record` as it would look once owned by `owner`
/// through `rel`. Join-table relationships leave the record unchanged.
pub(crate) fn as_owned_by(rel: &Relationship, record: &Entity, owner: &Entity) -> Entity {
    let mut probe = record.clone();
    if let Linkage::ForeignKey { attribute, type_attribute } = &rel.linkage {
        probe.set(attribute.as_str(), Value::Ref(owner.id));
        if let Some(type_attribute) = type_attribute {
            probe.set(type_attribute.as_str(), owner.entity_type.as_str());
        }
    }
    probe
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use coalesce_types::{AttributeMap, EntityId, EntityType, JoinTable};
    use proptest::prelude::*;

    fn record(ty: &str, id: u64) -> Entity {
        Entity::new(EntityType::from(ty), EntityId::new(id), AttributeMap::new())
    }

    #[test]
    fn uses_type_override() {
        let schema = fixtures::schema();
        let ind = IndifferentAttributes::default();
        let a = record("Phonenumber", 1).with("country_code", "32").with("number", "123456");
        let b = record("Phonenumber", 2)
            .with("country_code", "32")
            .with("number", "12/34.56")
            .with("description", "Home");
        assert!(equivalent(&schema, &ind, &a, &b));
        let c = b.clone().with("country_code", "31");
        assert!(!equivalent(&schema, &ind, &a, &c));
    }

    #[test]
    fn types_must_match() {
        let schema = fixtures::schema();
        let ind = IndifferentAttributes::default();
        assert!(!equivalent(&schema, &ind, &record("Company", 1), &record("Person", 1)));
    }

    #[test]
    fn unknown_type_compares_attributes() {
        let schema = fixtures::schema();
        let ind = IndifferentAttributes::default();
        let a = record("Planet", 1).with("name", "Mars");
        let b = record("Planet", 2).with("name", "Mars");
        assert!(equivalent(&schema, &ind, &a, &b));
    }

    #[test]
    fn owned_copy_rewrites_foreign_key() {
        let schema = fixtures::schema();
        let rel = schema.relationship("Company", "phonenumbers").unwrap();
        let owner = record("Company", 1);
        let phone = record("Phonenumber", 5)
            .with("phonable_id", EntityId::new(2))
            .with("phonable_type", "Company");
        let probe = as_owned_by(rel, &phone, &owner);
        assert_eq!(probe.get("phonable_id"), &Value::Ref(EntityId::new(1)));
        assert_eq!(probe.get("phonable_type"), &Value::from("Company"));
        // The input record is untouched.
        assert_eq!(phone.get("phonable_id"), &Value::Ref(EntityId::new(2)));
    }

    #[test]
    fn owned_copy_ignores_join_tables() {
        let rel = Relationship::many_to_many(
            "projects",
            EntityType::from("Project"),
            JoinTable::new("people_projects", "person_id", "project_id"),
        );
        let project = record("Project", 3).with("name", "X");
        assert_eq!(as_owned_by(&rel, &project, &record("Person", 1)), project);
    }

    fn arb_phone() -> impl Strategy<Value = Entity> {
        (1u64..20, "(31|32)?", "[0-9/. ]{0,6}", "(Home|Work)?").prop_map(|(id, cc, number, desc)| {
            record("Phonenumber", id)
                .with("country_code", cc)
                .with("number", number)
                .with("description", desc)
        })
    }

    proptest! {
        #[test]
        fn reflexive(a in arb_phone()) {
            let schema = fixtures::schema();
            let ind = IndifferentAttributes::default();
            prop_assert!(equivalent(&schema, &ind, &a, &a));
        }

        #[test]
        fn symmetric(a in arb_phone(), b in arb_phone()) {
            let schema = fixtures::schema();
            let ind = IndifferentAttributes::default();
            prop_assert_eq!(
                equivalent(&schema, &ind, &a, &b),
                equivalent(&schema, &ind, &b, &a)
            );
        }
    }
}
