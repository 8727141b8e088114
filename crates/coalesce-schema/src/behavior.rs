//! Per-type merge capabilities.
//!
//! Every [`EntityModel`](crate::EntityModel) carries a [`MergeBehavior`].
//! The merge engine only talks to this trait; concrete types decide how
//! their records are compared and which relationships stay out of merges.

use std::collections::BTreeSet;
use std::fmt;

use coalesce_types::{Entity, IndifferentAttributes, Value};
use serde::{Deserialize, Serialize};

/// Capability interface an entity type exposes to the merge engine.
///
/// Both methods have defaults, so most types use [`DefaultBehavior`].
/// Implementations must keep [`Self::equivalent`] reflexive and symmetric:
/// the same predicate decides whether callers merge two records at all and
/// whether the engine folds two related records into one.
pub trait MergeBehavior: Send + Sync + fmt::Debug {
    /// Returns `true` if `a` and `b` represent the same real-world record.
    fn equivalent(&self, a: &Entity, b: &Entity, indifferent: &IndifferentAttributes) -> bool {
        attributes_equivalent(a, b, indifferent)
    }

    /// Returns `true` if the named relationship must never be merged or
    /// reassigned, in addition to the model's declared exclusions.
    fn excludes_relationship(&self, _name: &str) -> bool {
        false
    }
}

/// Default comparison: same declared type and equal attribute maps once
/// indifferent attributes are removed. Absent attributes compare as null.
pub fn attributes_equivalent(a: &Entity, b: &Entity, indifferent: &IndifferentAttributes) -> bool {
    if !a.same_type(b) {
        return false;
    }
    let names: BTreeSet<&str> = a
        .attributes
        .keys()
        .chain(b.attributes.keys())
        .map(String::as_str)
        .filter(|name| !indifferent.contains(name))
        .collect();
    names.into_iter().all(|name| a.get(name).same_as(b.get(name)))
}

/// Behavior with every default: attribute comparison, no extra exclusions.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultBehavior;

impl MergeBehavior for DefaultBehavior {}

/// Value normalization applied before comparing a key attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Normalizer {
    #[default]
    Exact,
    /// Keep only ASCII digits (`"12/34.56"` becomes `"123456"`).
    Digits,
    CaseInsensitive,
    Trimmed,
}

impl Normalizer {
    pub fn apply(self, value: &Value) -> Value {
        let Value::Text(text) = value else {
            return value.clone();
        };
        match self {
            Self::Exact => value.clone(),
            Self::Digits => Value::Text(text.chars().filter(char::is_ascii_digit).collect()),
            Self::CaseInsensitive => Value::Text(text.to_lowercase()),
            Self::Trimmed => Value::Text(text.trim().to_string()),
        }
    }
}

/// An attribute compared by a [`NormalizedBehavior`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttribute {
    pub attribute: String,
    #[serde(default)]
    pub normalize: Normalizer,
}

impl KeyAttribute {
    pub fn new(attribute: impl Into<String>, normalize: Normalizer) -> Self {
        Self {
            attribute: attribute.into(),
            normalize,
        }
    }
}

/// Compares records on a fixed set of key attributes after normalization,
/// ignoring every other attribute.
///
/// This is how a phone number type says "same country code and same digits,
/// regardless of formatting or description".
#[derive(Clone, Debug, Default)]
pub struct NormalizedBehavior {
    keys: Vec<KeyAttribute>,
    excluded: BTreeSet<String>,
}

impl NormalizedBehavior {
    pub fn new(keys: Vec<KeyAttribute>) -> Self {
        Self {
            keys,
            excluded: BTreeSet::new(),
        }
    }

    /// Also exclude the named relationship from merges.
    pub fn excluding(mut self, relationship: impl Into<String>) -> Self {
        self.excluded.insert(relationship.into());
        self
    }

    pub fn keys(&self) -> &[KeyAttribute] {
        &self.keys
    }
}

impl MergeBehavior for NormalizedBehavior {
    fn equivalent(&self, a: &Entity, b: &Entity, _indifferent: &IndifferentAttributes) -> bool {
        a.same_type(b)
            && self.keys.iter().all(|key| {
                key.normalize.apply(a.get(&key.attribute)).same_as(&key.normalize.apply(b.get(&key.attribute)))
            })
    }

    fn excludes_relationship(&self, name: &str) -> bool {
        self.excluded.contains(name)
    }
}
