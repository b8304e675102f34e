//! Error types for layered lookups and stack manipulation.

/// Errors raised by [`LayeredMap`](crate::LayeredMap) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// No layer holds the requested key.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A value pushed as a layer is not a mapping.
    #[error("layer must be a mapping, found {found}")]
    TypeMismatch { found: &'static str },

    /// Pop was attempted with only the base layer left.
    #[error("cannot pop the base layer")]
    EmptyStack,

    /// A merge policy name was not recognised.
    #[error("unknown merge policy: {0} (expected 'override' or 'merge')")]
    UnknownPolicy(String),
}

pub type Result<T> = std::result::Result<T, ChainError>;

/// Name of a JSON value's kind, for error messages.
pub(crate) fn kind_of(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
