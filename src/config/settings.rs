//! Resolver settings
//!
//! Settings come from a TOML file, then the `VARSCOPE_HASH_BEHAVIOUR`
//! environment variable, then CLI flags. Later sources win.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use varscope_chain::MergePolicy;

use super::error::ConfigError;

/// Environment variable overriding `hash_behaviour`
pub const HASH_BEHAVIOUR_ENV: &str = "VARSCOPE_HASH_BEHAVIOUR";

/// Settings that control how scopes are read
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// How values under the same key in several scopes combine
    #[serde(default)]
    pub hash_behaviour: MergePolicy,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    /// Parse settings from a TOML string
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))
    }

    /// Apply the environment override, if the variable is set
    pub fn with_env(self) -> Result<Self, ConfigError> {
        let value = std::env::var(HASH_BEHAVIOUR_ENV).ok();
        self.with_hash_behaviour(value.as_deref())
    }

    /// Apply a textual `hash_behaviour` override; `None` keeps the current value
    pub fn with_hash_behaviour(mut self, value: Option<&str>) -> Result<Self, ConfigError> {
        if let Some(raw) = value {
            self.hash_behaviour = raw.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "hash_behaviour must be 'override' or 'merge', got '{}'",
                    raw
                ))
            })?;
        }
        Ok(self)
    }
}
