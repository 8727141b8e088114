use coalesce_types::IndifferentAttributes;
use serde::{Deserialize, Serialize};

use crate::error::{MergeError, MergeResult};

/// Configuration for the merge engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Attributes ignored by equivalence checks and never filled from donors.
    pub indifferent_attributes: IndifferentAttributes,
    /// Maximum nesting of merges started by one-to-one and dedup cascades.
    /// Exceeding it aborts the whole merge.
    pub max_depth: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            indifferent_attributes: IndifferentAttributes::default(),
            max_depth: 32,
        }
    }
}

impl MergeConfig {
    /// Parse a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(input: &str) -> MergeResult<Self> {
        toml::from_str(input).map_err(|e| MergeError::Config(e.to_string()))
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_indifferent(mut self, attributes: IndifferentAttributes) -> Self {
        self.indifferent_attributes = attributes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MergeConfig::default();
        assert_eq!(config.max_depth, 32);
        assert!(config.indifferent_attributes.contains("updated_at"));
        assert!(config.indifferent_attributes.contains("creator_id"));
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(MergeConfig::from_toml_str("").unwrap(), MergeConfig::default());
    }

    #[test]
    fn toml_overrides() {
        let config = MergeConfig::from_toml_str(
            "max_depth = 4\nindifferent_attributes = [\"id\", \"revision\"]\n",
        )
        .unwrap();
        assert_eq!(config.max_depth, 4);
        assert!(config.indifferent_attributes.contains("revision"));
        assert!(!config.indifferent_attributes.contains("created_at"));
    }

    #[test]
    fn bad_toml() {
        assert!(matches!(
            MergeConfig::from_toml_str("max_depth = \"deep\""),
            Err(MergeError::Config(_))
        ));
    }
}
