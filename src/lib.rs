//! Varscope - layered variable scopes
//!
//! Loads variable scopes (defaults, groups, host, extra variables) into a
//! [`LayeredMap`] and reads them back as one mapping, with either
//! override or deep-merge semantics for nested values.

pub mod config;
pub mod logging;

pub use config::{
    ConfigError, ResolvedScope, ScopeFiles, ScopeOrigin, ScopeSource, ScopeStack, Settings,
};
pub use varscope_chain::{ChainError, Layer, LayeredMap, MergePolicy, SharedLayer};
