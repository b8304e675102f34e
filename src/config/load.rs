//! Reading scope files from disk
//!
//! A scope file is TOML, or JSON when its extension is `.json`. Each load
//! also yields the SHA-256 digest of the raw bytes for provenance.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use super::error::ConfigError;

/// On-disk format of a scope file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeFormat {
    Toml,
    Json,
}

impl ScopeFormat {
    /// Pick the format from the file extension, defaulting to TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// Load a scope file, returning its value and hex digest
pub fn load_scope_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path)?;
    let digest = hex::encode(Sha256::digest(&bytes));
    let value = parse_scope(&bytes, ScopeFormat::from_path(path))?;
    Ok((value, digest))
}

/// Parse raw scope bytes in the given format
pub fn parse_scope(bytes: &[u8], format: ScopeFormat) -> Result<Value, ConfigError> {
    match format {
        ScopeFormat::Json => serde_json::from_slice(bytes)
            .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e))),
        ScopeFormat::Toml => {
            let contents = std::str::from_utf8(bytes)
                .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;
            let table: toml::Table = toml::from_str(contents)
                .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;
            Ok(toml_to_json(toml::Value::Table(table)))
        }
    }
}

/// Convert a TOML value to a JSON value
pub fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            Value::Object(table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect())
        }
    }
}
