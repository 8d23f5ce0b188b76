#![forbid(unsafe_code)]

//! Error taxonomy for template instantiation.

use thiserror::Error;

/// Failure raised while invoking a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template `{template}` takes {expected} positional arguments but {given} were given")]
    Arity {
        template: String,
        expected: usize,
        given: usize,
    },

    #[error("template `{template}` failed: {message}")]
    Failed { template: String, message: String },
}

impl TemplateError {
    #[must_use]
    pub fn failed(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            template: template.into(),
            message: message.into(),
        }
    }
}

/// The produced item count does not fit the requested tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UnpackError {
    #[error("need more than {available} values to unpack")]
    NotEnough { required: usize, available: usize },

    #[error("too many values to unpack")]
    TooMany { expected: usize, available: usize },
}

/// Failure of a dynamic template refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DynamicTemplateError {
    /// Refreshing requires a parent to insert into. This is a programming
    /// error in the caller, not a recoverable condition.
    #[error("dynamic template `{node}` has no parent to insert items into")]
    NoParent { node: String },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Unpack(#[from] UnpackError),
}
