//! Error types for index configuration, lookup and evaluation.

use indexpages_types::EvalError;
use std::path::PathBuf;
use thiserror::Error;

/// Problems found while reading or compiling the index configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{filename}: section [{section}]: key required")]
    MissingKey { section: String, filename: String },

    #[error("{filename}: section [{section}.fields]: field names should not contain periods (got '{name}')")]
    DottedFieldName {
        section: String,
        filename: String,
        name: String,
    },

    #[error(
        "expression syntax error in config file: {message}\n    in expression {expression:?}\n    for name {name:?} in section [{section}]\n    in file {filename}"
    )]
    ExpressionSyntax {
        section: String,
        filename: String,
        name: String,
        expression: String,
        message: String,
    },

    #[error("{filename}: section [{section}]: subindex '{subindex}' has no section")]
    UnknownSubindex {
        section: String,
        subindex: String,
        filename: String,
    },
}

/// Failure to find an index root
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no index named '{name}' is configured")]
    NoSuchIndex { name: String },

    #[error("no parent record exists at '{path}' for index '{index}'")]
    MissingParent { index: String, path: String },

    #[error("'{path}' has no sub-index")]
    NoSubindex { path: String },

    #[error("pagination is not enabled for '{path}'")]
    PaginationDisabled { path: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("Failed to render template '{template}': {message}")]
    Render { template: String, message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfacing through an attribute lookup inside an expression
impl From<Error> for EvalError {
    fn from(err: Error) -> Self {
        match err {
            Error::Eval(err) => err,
            other => EvalError::Other(other.to_string()),
        }
    }
}
