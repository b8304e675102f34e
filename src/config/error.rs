//! Configuration errors

use std::io;
use varscope_chain::ChainError;

/// Errors raised while loading settings or scope files
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}
