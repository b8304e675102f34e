//! Scope loading and settings
//!
//! Builds a layered variable stack from scope files:
//! 1. Defaults
//! 2. Group scopes
//! 3. Host scope
//! 4. Extra variables

mod error;
mod load;
mod scope;
mod settings;

pub use error::ConfigError;
pub use load::{load_scope_file, parse_scope, toml_to_json, ScopeFormat};
pub use scope::{
    extra_vars, parse_extra_var, ResolvedScope, ScopeFiles, ScopeOrigin, ScopeSource, ScopeStack,
    SCHEMA_ID, SCHEMA_VERSION,
};
pub use settings::{Settings, HASH_BEHAVIOUR_ENV};
