//! Scope stack with provenance
//!
//! Scopes are pushed from least to most specific:
//! 1. Defaults
//! 2. Group scopes, in the order given
//! 3. Host scope
//! 4. Extra variables (`--set key=value`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use varscope_chain::{LayeredMap, MergePolicy};

use super::error::ConfigError;
use super::load::load_scope_file;
use super::settings::Settings;

/// Schema version for resolved output
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "varscope/resolved@1";

/// Where a scope layer came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScopeOrigin {
    Defaults,
    Group,
    Host,
    Extra,
}

/// A contributing scope layer with provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScopeSource {
    pub origin: ScopeOrigin,

    /// File path (None for extra variables)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for extra variables)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Scope files to load, least specific first
#[derive(Debug, Clone, Default)]
pub struct ScopeFiles {
    pub defaults: Option<PathBuf>,
    pub groups: Vec<PathBuf>,
    pub host: Option<PathBuf>,
}

/// A layered variable map plus the sources that built it
#[derive(Debug, Clone)]
pub struct ScopeStack {
    vars: LayeredMap,
    sources: Vec<ScopeSource>,
}

impl ScopeStack {
    /// An empty stack using the settings' hash behaviour
    pub fn new(settings: &Settings) -> Self {
        Self {
            vars: LayeredMap::with_policy(settings.hash_behaviour),
            sources: Vec::new(),
        }
    }

    /// Build a stack from scope files and extra variables
    pub fn build(
        settings: &Settings,
        files: &ScopeFiles,
        extra: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut stack = Self::new(settings);

        if let Some(path) = &files.defaults {
            stack.push_file(ScopeOrigin::Defaults, path)?;
        }
        for path in &files.groups {
            stack.push_file(ScopeOrigin::Group, path)?;
        }
        if let Some(path) = &files.host {
            stack.push_file(ScopeOrigin::Host, path)?;
        }
        if let Some(extra) = extra {
            stack.push_value(ScopeOrigin::Extra, extra)?;
        }

        tracing::debug!(
            layers = stack.vars.depth(),
            keys = stack.vars.len(),
            policy = %stack.vars.policy(),
            "built scope stack"
        );
        Ok(stack)
    }

    /// Load a scope file and push it as a new layer.
    ///
    /// Files that do not exist are skipped.
    pub fn push_file(&mut self, origin: ScopeOrigin, path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "scope file not found, skipping");
            return Ok(());
        }

        let (value, digest) = load_scope_file(path)?;
        self.vars.update(value)?;
        self.sources.push(ScopeSource {
            origin,
            path: Some(path.to_string_lossy().to_string()),
            digest: Some(digest),
        });
        tracing::debug!(path = %path.display(), ?origin, "loaded scope file");
        Ok(())
    }

    /// Push an in-memory mapping as a new layer
    pub fn push_value(&mut self, origin: ScopeOrigin, value: Value) -> Result<(), ConfigError> {
        self.vars.update(value)?;
        self.sources.push(ScopeSource {
            origin,
            path: None,
            digest: None,
        });
        Ok(())
    }

    /// Drop the most specific layer and its provenance record.
    ///
    /// Every layer above the base has exactly one source. The stack is left
    /// unchanged when popping fails.
    pub fn pop(&mut self) -> Result<ScopeSource, ConfigError> {
        if self.sources.len() + 1 != self.vars.depth() {
            return Err(ConfigError::ValidationError(format!(
                "scope stack has {} layers above the base but {} sources",
                self.vars.depth() - 1,
                self.sources.len()
            )));
        }
        self.vars.pop()?;
        self.sources
            .pop()
            .ok_or_else(|| ConfigError::ValidationError("no scope source to pop".to_string()))
    }

    pub fn vars(&self) -> &LayeredMap {
        &self.vars
    }

    /// Write a variable; see [`LayeredMap::set`] for where it lands
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.vars.set(key, value);
    }

    /// Remove a variable from every scope, returning how many held it
    pub fn delete(&mut self, key: &str) -> usize {
        self.vars.delete(key)
    }

    /// Contributing sources, least specific first
    pub fn sources(&self) -> &[ScopeSource] {
        &self.sources
    }

    /// Snapshot the composed variables
    pub fn resolve(&self) -> ResolvedScope {
        ResolvedScope {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            hash_behaviour: self.vars.policy(),
            vars: self.vars.to_dict(),
            sources: self.sources.clone(),
        }
    }
}

/// Composed variables with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedScope {
    pub schema_version: u32,

    pub schema_id: String,

    /// When this snapshot was taken
    pub created_at: DateTime<Utc>,

    pub hash_behaviour: MergePolicy,

    /// Every variable in the key union, resolved under `hash_behaviour`
    pub vars: Map<String, Value>,

    /// Contributing sources in precedence order
    pub sources: Vec<ScopeSource>,
}

impl ResolvedScope {
    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }
}

/// Parse an extra variable of the form `key=value`.
///
/// The value is read as JSON when it parses, otherwise as a plain string.
pub fn parse_extra_var(raw: &str) -> Result<(String, Value), ConfigError> {
    let (key, value) = raw.split_once('=').ok_or_else(|| {
        ConfigError::ValidationError(format!("extra variable '{}' must be key=value", raw))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "extra variable '{}' has an empty key",
            raw
        )));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Collect `key=value` pairs into one mapping; later pairs win
pub fn extra_vars<S: AsRef<str>>(pairs: &[S]) -> Result<Option<Value>, ConfigError> {
    if pairs.is_empty() {
        return Ok(None);
    }
    let mut map = Map::new();
    for pair in pairs {
        let (key, value) = parse_extra_var(pair.as_ref())?;
        map.insert(key, value);
    }
    Ok(Some(Value::Object(map)))
}
