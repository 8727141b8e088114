use coalesce_schema::Schema;
use coalesce_store::{with_transaction, EntityStore, StoreTransaction};
use coalesce_types::{Entity, EntityRef};
use tracing::{debug, info};

use crate::config::MergeConfig;
use crate::equivalence;
use crate::error::MergeResult;
use crate::report::MergeOutcome;
use crate::session::MergeSession;

// ---------------------------------------------------------------------------
// MergeEngine
// ---------------------------------------------------------------------------

/// Folds duplicate records into a survivor.
///
/// A merge runs in three phases inside one transaction:
///
/// 1. blank survivor attributes are filled from the donors, in order;
/// 2. every mergeable relationship of every donor is moved onto the
///    survivor, merging related records that are equivalent to ones the
///    survivor already holds;
/// 3. the donors are deleted, cascading per their type's declarations.
///
/// Any failure rolls back all three phases.
#[derive(Clone, Debug, Default)]
pub struct MergeEngine {
    config: MergeConfig,
}

impl MergeEngine {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Returns `true` if `a` and `b` represent the same real-world record,
    /// using the per-type override when the schema declares one.
    pub fn equivalent(&self, schema: &Schema, a: &Entity, b: &Entity) -> bool {
        equivalence::equivalent(schema, &self.config.indifferent_attributes, a, b)
    }

    /// Merge `donors` into `survivor` in a transaction of its own.
    ///
    /// Donors are listed in priority order. On success the donors no longer
    /// exist and the returned outcome carries the stored survivor.
    pub fn merge<S>(&self, store: &S, survivor: &EntityRef, donors: &[EntityRef]) -> MergeResult<MergeOutcome>
    where
        S: EntityStore + ?Sized,
    {
        info!(survivor = %survivor, donors = donors.len(), "merge started");
        let outcome = with_transaction(store, |tx| self.merge_within(tx, survivor, donors))?;
        info!(
            survivor = %survivor,
            filled = outcome.report.filled.len(),
            reassigned = outcome.report.reassigned.len(),
            nested = outcome.report.nested.len(),
            deleted = outcome.report.deleted.len(),
            "merge committed"
        );
        Ok(outcome)
    }

    /// Merge inside a transaction owned by the caller, who decides whether
    /// to commit. Several merges may share one transaction this way.
    pub fn merge_within(
        &self,
        tx: &mut dyn StoreTransaction,
        survivor: &EntityRef,
        donors: &[EntityRef],
    ) -> MergeResult<MergeOutcome> {
        let mut session = MergeSession::new(&self.config, tx);
        let survivor = session.merge(survivor, donors)?;
        Ok(MergeOutcome {
            survivor,
            report: session.into_report(),
        })
    }

    /// Run the merge and roll it back, returning what it would have done.
    pub fn preview<S>(&self, store: &S, survivor: &EntityRef, donors: &[EntityRef]) -> MergeResult<MergeOutcome>
    where
        S: EntityStore + ?Sized,
    {
        let mut tx = store.begin()?;
        let outcome = self.merge_within(tx.as_mut(), survivor, donors);
        drop(tx);
        debug!(survivor = %survivor, "preview rolled back");
        outcome
    }
}
