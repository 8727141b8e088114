use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Per-record bookkeeping attributes that carry no domain meaning.
pub const DEFAULT_INDIFFERENT_ATTRIBUTES: [&str; 6] = [
    "id",
    "position",
    "created_at",
    "updated_at",
    "creator_id",
    "updater_id",
];

/// Attribute names excluded from both equivalence comparison and attribute
/// fallback resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndifferentAttributes(BTreeSet<String>);

impl IndifferentAttributes {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// An empty set: every attribute participates.
    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for IndifferentAttributes {
    fn default() -> Self {
        Self::new(DEFAULT_INDIFFERENT_ATTRIBUTES)
    }
}
