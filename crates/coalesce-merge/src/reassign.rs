//! Relationship Reassigner.
//!
//! Moves or merges a donor's related records onto the survivor, one
//! relationship at a time. For collections every decision is taken against
//! read-only copies first, and only then written, so the outcome does not
//! depend on the order in which foreign keys are rewritten.

use coalesce_types::{Entity, EntityRef, Linkage, Relationship};
use tracing::debug;

use crate::equivalence::{as_owned_by, equivalent};
use crate::error::MergeResult;
use crate::report::{NestedMerge, Reassignment};
use crate::session::MergeSession;

/// One planned change for a donor-side related record.
enum Step {
    /// Repoint the record at the survivor.
    Move(Entity),
    /// Fold the record into an equivalent one the survivor already holds.
    Merge { into: EntityRef, record: EntityRef },
}

impl MergeSession<'_> {
    pub(crate) fn reassign(&mut self, rel: &Relationship, survivor: &EntityRef, donor: &EntityRef) -> MergeResult<()> {
        if rel.cardinality.is_collection() {
            self.reassign_many(rel, survivor, donor)
        } else {
            self.reassign_one(rel, survivor, donor)
        }
    }

    fn reassign_one(&mut self, rel: &Relationship, survivor: &EntityRef, donor: &EntityRef) -> MergeResult<()> {
        let Some(other) = self.tx.get_related(donor, &rel.name)?.into_vec().into_iter().next() else {
            return Ok(());
        };
        let local = self.tx.get_related(survivor, &rel.name)?.into_vec().into_iter().next();
        match local {
            None => self.move_record(rel, survivor, donor, &other),
            Some(local) if local.same_record(&other) => Ok(()),
            Some(local) => {
                let (local, other) = (local.entity_ref(), other.entity_ref());
                if self.can_nest(&local, &other) {
                    self.merge_record(rel, &local, &other)
                } else {
                    debug!(relationship = %rel.name, record = %other, "record already being merged, left in place");
                    Ok(())
                }
            }
        }
    }

    fn reassign_many(&mut self, rel: &Relationship, survivor: &EntityRef, donor: &EntityRef) -> MergeResult<()> {
        let owner = self.tx.get(survivor)?;
        let local = self.tx.get_related(survivor, &rel.name)?.into_vec();
        let other: Vec<Entity> = self
            .tx
            .get_related(donor, &rel.name)?
            .into_vec()
            .into_iter()
            .filter(|record| !local.iter().any(|l| l.same_record(record)))
            .collect();
        if other.is_empty() {
            return Ok(());
        }

        // Records moved earlier in this pass count as local for later ones.
        let mut members = local;
        let mut plan = Vec::with_capacity(other.len());
        for record in other {
            let probe = as_owned_by(rel, &record, &owner);
            let record_ref = record.entity_ref();
            let into = members
                .iter()
                .find(|member| {
                    self.can_nest(&member.entity_ref(), &record_ref)
                        && equivalent(self.tx.schema(), &self.config.indifferent_attributes, member, &probe)
                })
                .map(Entity::entity_ref);
            match into {
                Some(into) => plan.push(Step::Merge {
                    into,
                    record: record_ref,
                }),
                None => {
                    plan.push(Step::Move(record));
                    members.push(probe);
                }
            }
        }

        for step in plan {
            match step {
                Step::Move(record) => {
                    if self.tx.exists(&record.entity_ref())? {
                        self.move_record(rel, survivor, donor, &record)?;
                    }
                }
                Step::Merge { into, record } => {
                    if !self.tx.exists(&record)? {
                        continue;
                    }
                    if self.tx.exists(&into)? {
                        self.merge_record(rel, &into, &record)?;
                    } else {
                        let record = self.tx.get(&record)?;
                        self.move_record(rel, survivor, donor, &record)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Point `record` at the survivor instead of the donor.
    fn move_record(
        &mut self,
        rel: &Relationship,
        survivor: &EntityRef,
        donor: &EntityRef,
        record: &Entity,
    ) -> MergeResult<()> {
        match &rel.linkage {
            Linkage::ForeignKey { attribute, .. } => {
                self.tx.reassign_foreign_key(&record.entity_ref(), attribute, survivor.id)?;
            }
            Linkage::Join(join) => {
                self.tx.rewrite_join_row(join, donor.id, survivor.id, record.id)?;
            }
            // Filtered out by the reflector.
            Linkage::Owner { .. } | Linkage::Through { .. } => return Ok(()),
        }
        debug!(relationship = %rel.name, record = %record.entity_ref(), from = %donor, to = %survivor, "reassigned");
        self.report.reassigned.push(Reassignment {
            record: record.entity_ref(),
            relationship: rel.name.clone(),
            from: donor.clone(),
            to: survivor.clone(),
        });
        Ok(())
    }

    fn merge_record(&mut self, rel: &Relationship, into: &EntityRef, record: &EntityRef) -> MergeResult<()> {
        let depth = self.depth() + 1;
        debug!(relationship = %rel.name, survivor = %into, donor = %record, depth, "nested merge");
        self.report.nested.push(NestedMerge {
            relationship: rel.name.clone(),
            survivor: into.clone(),
            donor: record.clone(),
            depth,
        });
        self.nested(into, record)?;
        Ok(())
    }
}
