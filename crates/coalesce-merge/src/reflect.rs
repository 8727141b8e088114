use coalesce_schema::EntityModel;
use coalesce_types::{Cardinality, Relationship};

/// Relationships of `model` that take part in merging, in declaration order.
///
/// Derived relationships, many-to-one references, and excluded
/// relationships are left out. A many-to-one foreign key lives on the
/// record itself and is handled as an ordinary attribute.
pub fn mergeable_relationships(model: &EntityModel) -> Vec<&Relationship> {
    model
        .relationships()
        .iter()
        .filter(|rel| rel.is_direct())
        .filter(|rel| {
            matches!(
                rel.cardinality,
                Cardinality::OneToOne | Cardinality::OneToMany | Cardinality::ManyToMany
            )
        })
        .filter(|rel| !model.excludes(&rel.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn names(model: &EntityModel) -> Vec<&str> {
        mergeable_relationships(model)
            .into_iter()
            .map(|rel| rel.name.as_str())
            .collect()
    }

    #[test]
    fn company_relationships() {
        let schema = fixtures::schema();
        assert_eq!(
            names(schema.model("Company").unwrap()),
            vec!["address", "relationships", "projects", "phonenumbers"]
        );
    }

    #[test]
    fn person_skips_excluded_and_derived() {
        let schema = fixtures::schema();
        assert_eq!(
            names(schema.model("Person").unwrap()),
            vec!["address", "relationships", "phonenumbers", "projects"]
        );
    }

    #[test]
    fn join_models_have_nothing_to_merge() {
        let schema = fixtures::schema();
        assert!(names(schema.model("Relationship").unwrap()).is_empty());
        assert_eq!(names(schema.model("Project").unwrap()), vec!["people"]);
    }
}
