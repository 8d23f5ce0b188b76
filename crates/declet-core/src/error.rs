#![forbid(unsafe_code)]

//! Error types shared across the workspace.

use thiserror::Error;

/// Type-erased error carried through scheduled tasks and node hooks.
pub type BoxError = Box<dyn std::error::Error + 'static>;

/// Invalid configuration input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key}: expected a positive integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key}: must be greater than zero")]
    Zero { key: &'static str },
}
