use std::collections::BTreeSet;

use coalesce_store::StoreTransaction;
use coalesce_types::{Entity, EntityRef};
use tracing::debug;

use crate::attributes::resolve_attributes;
use crate::config::MergeConfig;
use crate::error::{MergeError, MergeResult};
use crate::reflect::mergeable_relationships;
use crate::report::MergeReport;

/// State shared by one top-level merge and every merge it nests.
///
/// All work goes through the one transaction borrowed here, so the whole
/// call tree commits or rolls back together. Records taking part in an
/// active merge are tracked so that cascades over cyclic relationships
/// never start a second merge on the same record.
pub(crate) struct MergeSession<'a> {
    pub(crate) config: &'a MergeConfig,
    pub(crate) tx: &'a mut dyn StoreTransaction,
    pub(crate) report: MergeReport,
    in_flight: BTreeSet<EntityRef>,
    depth: usize,
}

impl<'a> MergeSession<'a> {
    pub(crate) fn new(config: &'a MergeConfig, tx: &'a mut dyn StoreTransaction) -> Self {
        Self {
            config,
            tx,
            report: MergeReport::default(),
            in_flight: BTreeSet::new(),
            depth: 0,
        }
    }

    pub(crate) fn into_report(self) -> MergeReport {
        self.report
    }

    /// Returns `true` if neither record takes part in an active merge.
    pub(crate) fn can_nest(&self, a: &EntityRef, b: &EntityRef) -> bool {
        !self.in_flight.contains(a) && !self.in_flight.contains(b)
    }

    /// Run a merge one level deeper than the current one.
    pub(crate) fn nested(&mut self, survivor: &EntityRef, donor: &EntityRef) -> MergeResult<Entity> {
        self.depth += 1;
        let result = self.merge(survivor, std::slice::from_ref(donor));
        self.depth -= 1;
        result
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    /// Merge `donors` into `survivor` and delete the donors.
    pub(crate) fn merge(&mut self, survivor: &EntityRef, donors: &[EntityRef]) -> MergeResult<Entity> {
        check_merge_set(survivor, donors)?;
        if self.depth > self.config.max_depth {
            return Err(MergeError::invalid(format_args!(
                "nested merges exceed max depth {}",
                self.config.max_depth
            )));
        }

        let entered: Vec<EntityRef> = std::iter::once(survivor)
            .chain(donors)
            .filter(|entity| self.in_flight.insert((*entity).clone()))
            .cloned()
            .collect();
        let result = self.run(survivor, donors);
        for entity in &entered {
            self.in_flight.remove(entity);
        }
        result
    }

    fn run(&mut self, survivor: &EntityRef, donors: &[EntityRef]) -> MergeResult<Entity> {
        let mut record = self.tx.get(survivor)?;
        let donor_records = donors
            .iter()
            .map(|donor| self.tx.get(donor))
            .collect::<Result<Vec<_>, _>>()?;

        let (filled, relationships) = {
            let model = self.tx.schema().model(survivor.entity_type.as_str())?;
            let filled = resolve_attributes(
                model,
                &self.config.indifferent_attributes,
                &mut record,
                &donor_records,
            );
            let relationships: Vec<_> = mergeable_relationships(model).into_iter().cloned().collect();
            (filled, relationships)
        };
        if !filled.is_empty() {
            self.tx.save(&record)?;
            debug!(survivor = %survivor, filled = filled.len(), "attributes resolved");
            self.report.filled.extend(filled);
        }

        for rel in &relationships {
            for donor in donors {
                self.reassign(rel, survivor, donor)?;
            }
        }

        for donor in donors {
            match self.tx.find(donor)? {
                Some(current) => {
                    self.tx.delete(&current.entity_ref())?;
                    debug!(donor = %donor, depth = self.depth, "donor deleted");
                    self.report.deleted.push(donor.clone());
                }
                None => debug!(donor = %donor, "donor already gone"),
            }
        }

        Ok(self.tx.get(survivor)?)
    }
}

/// Reject malformed merge sets before anything is written.
pub(crate) fn check_merge_set(survivor: &EntityRef, donors: &[EntityRef]) -> MergeResult<()> {
    if donors.is_empty() {
        return Err(MergeError::invalid(format_args!("no donors given for {survivor}")));
    }
    let mut seen = BTreeSet::new();
    for donor in donors {
        if donor.entity_type != survivor.entity_type {
            return Err(MergeError::TypeMismatch {
                survivor: survivor.clone(),
                donor: donor.clone(),
            });
        }
        if donor == survivor {
            return Err(MergeError::invalid(format_args!("{survivor} is listed as its own donor")));
        }
        if !seen.insert(donor) {
            return Err(MergeError::invalid(format_args!("{donor} is listed twice")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coalesce_types::{EntityId, EntityType};

    fn r(ty: &str, id: u64) -> EntityRef {
        EntityRef::new(EntityType::from(ty), EntityId::new(id))
    }

    #[test]
    fn accepts_well_formed_set() {
        check_merge_set(&r("Company", 1), &[r("Company", 2), r("Company", 3)]).unwrap();
    }

    #[test]
    fn rejects_mixed_types() {
        let err = check_merge_set(&r("Company", 1), &[r("Company", 2), r("Person", 3)]).unwrap_err();
        assert!(matches!(err, MergeError::TypeMismatch { donor, .. } if donor == r("Person", 3)));
    }

    #[test]
    fn rejects_self_duplicates_and_empty() {
        assert!(matches!(
            check_merge_set(&r("Company", 1), &[r("Company", 1)]),
            Err(MergeError::InvalidMergeSet(_))
        ));
        assert!(matches!(
            check_merge_set(&r("Company", 1), &[r("Company", 2), r("Company", 2)]),
            Err(MergeError::InvalidMergeSet(_))
        ));
        assert!(matches!(
            check_merge_set(&r("Company", 1), &[]),
            Err(MergeError::InvalidMergeSet(_))
        ));
    }
}
