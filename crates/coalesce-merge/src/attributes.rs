use coalesce_schema::EntityModel;
use coalesce_types::{Entity, IndifferentAttributes};

use crate::report::FilledAttribute;

/// Fill the survivor's blank attributes from `donors`, first donor first.
///
/// Only declared, non-indifferent attributes take part. A non-blank
/// survivor value is never replaced, and once an attribute is filled later
/// donors are not consulted for it. The survivor is changed in place;
/// persisting it is up to the caller.
pub fn resolve_attributes(
    model: &EntityModel,
    indifferent: &IndifferentAttributes,
    survivor: &mut Entity,
    donors: &[Entity],
) -> Vec<FilledAttribute> {
    let mut blank: Vec<&str> = model
        .attribute_names()
        .filter(|name| !indifferent.contains(name) && survivor.is_blank(name))
        .collect();
    let target = survivor.entity_ref();
    let mut filled = Vec::new();

    for donor in donors {
        if blank.is_empty() {
            break;
        }
        blank.retain(|name| {
            let value = donor.get(name);
            if value.is_blank() {
                return true;
            }
            survivor.set(*name, value.clone());
            filled.push(FilledAttribute {
                entity: target.clone(),
                attribute: (*name).to_string(),
                source: donor.entity_ref(),
            });
            false
        });
    }
    filled
}
