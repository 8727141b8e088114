//! Declared-constraint checks applied on every write.

use coalesce_schema::EntityModel;
use coalesce_types::{AttributeMap, Entity, EntityId, EntityRef};

use crate::error::{StoreError, StoreResult};

/// A write that breaks a constraint declared in the schema.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConstraintViolation {
    #[error("{entity}: '{attribute}' can't be blank")]
    Required { entity: EntityRef, attribute: String },

    #[error("{entity}: ({}) already taken by #{}", attributes.join(", "), conflict.get())]
    Unique {
        entity: EntityRef,
        attributes: Vec<String>,
        conflict: EntityId,
    },

    #[error("{entity}: '{attribute}' expects {expected}, got {found}")]
    KindMismatch {
        entity: EntityRef,
        attribute: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Coerce loosely-typed input into the declared kinds.
///
/// Fails on attributes the model does not declare.
pub(crate) fn coerce_attributes(model: &EntityModel, attributes: AttributeMap) -> StoreResult<AttributeMap> {
    attributes
        .into_iter()
        .map(|(name, value)| match model.attribute_def(&name) {
            Some(def) => Ok((name, def.kind.coerce(value))),
            None => Err(StoreError::UnknownAttribute {
                entity_type: model.name().clone(),
                attribute: name,
            }),
        })
        .collect()
}

/// Check `entity` against its model's kinds, presence rules, and unique
/// constraints. `peers` yields every other stored record of the same type.
pub(crate) fn check_record<'a, I>(model: &EntityModel, entity: &Entity, peers: I) -> StoreResult<()>
where
    I: IntoIterator<Item = (EntityId, &'a AttributeMap)>,
{
    for def in model.attributes() {
        let value = entity.get(&def.name);
        if !def.kind.accepts(value) {
            return Err(ConstraintViolation::KindMismatch {
                entity: entity.entity_ref(),
                attribute: def.name.clone(),
                expected: def.kind.as_str(),
                found: value.kind_name(),
            }
            .into());
        }
        if def.required && value.is_blank() {
            return Err(ConstraintViolation::Required {
                entity: entity.entity_ref(),
                attribute: def.name.clone(),
            }
            .into());
        }
    }

    let constraints = model.unique_constraints();
    if constraints.is_empty() {
        return Ok(());
    }
    let peers: Vec<_> = peers.into_iter().filter(|(id, _)| *id != entity.id).collect();
    for constraint in constraints {
        // Blank values never collide.
        if constraint.attributes.iter().any(|a| entity.is_blank(a)) {
            continue;
        }
        let clash = peers.iter().find(|(_, attrs)| {
            constraint
                .attributes
                .iter()
                .all(|a| attrs.get(a) == Some(entity.get(a)))
        });
        if let Some((conflict, _)) = clash {
            return Err(ConstraintViolation::Unique {
                entity: entity.entity_ref(),
                attributes: constraint.attributes.clone(),
                conflict: *conflict,
            }
            .into());
        }
    }
    Ok(())
}
