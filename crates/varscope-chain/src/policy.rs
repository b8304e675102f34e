//! Merge policy for composite values.
//!
//! `Override` returns the value from the highest layer holding a key.
//! `Merge` deep-merges nested mappings from every layer holding the key,
//! bottom layer first.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ChainError;

/// How lookups combine values for a key present in several layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Highest layer wins outright.
    #[default]
    #[serde(alias = "replace")]
    Override,
    /// Nested mappings are deep-merged across layers.
    Merge,
}

impl MergePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Override => "override",
            Self::Merge => "merge",
        }
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergePolicy {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "override" | "replace" => Ok(Self::Override),
            "merge" => Ok(Self::Merge),
            _ => Err(ChainError::UnknownPolicy(s.to_string())),
        }
    }
}
