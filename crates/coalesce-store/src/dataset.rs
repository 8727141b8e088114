//! JSON import and export of store contents.
//!
//! ```json
//! {
//!   "records": {
//!     "Company": [{ "id": 1, "attributes": { "name": "Acme" } }]
//!   },
//!   "joins": {
//!     "people_projects": [{ "person_id": 1, "project_id": 2 }]
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use coalesce_types::{AttributeMap, EntityId, JoinTable};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// One row of a join table: column name to referenced id.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JoinRow(BTreeMap<String, EntityId>);

impl JoinRow {
    /// The row linking `owner` to `target` in `join`.
    pub fn new(join: &JoinTable, owner: EntityId, target: EntityId) -> Self {
        let mut columns = BTreeMap::new();
        columns.insert(join.owner_key.clone(), owner);
        columns.insert(join.target_key.clone(), target);
        Self(columns)
    }

    pub fn get(&self, column: &str) -> Option<EntityId> {
        self.0.get(column).copied()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// A stored record in exchange form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordDef {
    pub id: EntityId,
    #[serde(default)]
    pub attributes: AttributeMap,
}

/// Full contents of a store: records by type name, join rows by table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub records: BTreeMap<String, Vec<RecordDef>>,
    #[serde(default)]
    pub joins: BTreeMap<String, Vec<JoinRow>>,
}

impl Dataset {
    pub fn from_json_str(input: &str) -> StoreResult<Self> {
        serde_json::from_str(input).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> StoreResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Number of records across all types.
    pub fn record_count(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }
}
