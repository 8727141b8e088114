use coalesce_types::{Entity, EntityRef};
use serde::{Deserialize, Serialize};

/// A survivor attribute filled from a donor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilledAttribute {
    pub entity: EntityRef,
    pub attribute: String,
    pub source: EntityRef,
}

/// A related record repointed from a donor to a survivor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reassignment {
    pub record: EntityRef,
    pub relationship: String,
    pub from: EntityRef,
    pub to: EntityRef,
}

/// A related record merged into an equivalent one instead of being moved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedMerge {
    pub relationship: String,
    pub survivor: EntityRef,
    pub donor: EntityRef,
    /// 1 for merges started directly by the top-level merge.
    pub depth: usize,
}

/// Everything a merge changed, in the order it happened.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub filled: Vec<FilledAttribute>,
    pub reassigned: Vec<Reassignment>,
    pub nested: Vec<NestedMerge>,
    /// Donors deleted, nested donors included. Dependents removed by the
    /// store's cascade are not listed.
    pub deleted: Vec<EntityRef>,
}

impl MergeReport {
    /// Returns `true` if nothing but donor deletion happened.
    pub fn is_trivial(&self) -> bool {
        self.filled.is_empty() && self.reassigned.is_empty() && self.nested.is_empty()
    }
}

/// Result of a successful merge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// The survivor as stored after the merge.
    pub survivor: Entity,
    pub report: MergeReport,
}
