//! Contract between the index engine and an expression language.
//!
//! Index rules (`key`, `slug_format`, `items`, custom fields) are written in
//! whatever expression language the host provides. The engine only needs
//! to compile a rule once and evaluate it against a scope.

use crate::pad::Pad;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A rule that failed to compile
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (at offset {offset})")]
pub struct SyntaxError {
    pub message: String,
    pub offset: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Failure while evaluating a compiled rule
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("'{type_name}' value has no attribute '{name}'")]
    NoAttribute { type_name: String, name: String },

    #[error("unknown filter '{0}'")]
    UnknownFilter(String),

    #[error("filter '{filter}': {message}")]
    Filter { filter: String, message: String },

    #[error("type error: {0}")]
    Type(String),

    #[error("{0}")]
    Other(String),
}

/// Variables visible to an expression
pub struct Scope<'a> {
    pub pad: &'a dyn Pad,
    pub alt: &'a str,
    pub this: Option<Value>,
    pub item: Option<Value>,
}

impl<'a> Scope<'a> {
    pub fn new(pad: &'a dyn Pad, alt: &'a str) -> Self {
        Self {
            pad,
            alt,
            this: None,
            item: None,
        }
    }

    pub fn with_this(mut self, this: Value) -> Self {
        self.this = Some(this);
        self
    }

    pub fn with_item(mut self, item: Value) -> Self {
        self.item = Some(item);
        self
    }

    /// Resolve a top-level name
    pub fn lookup(&self, name: &str) -> Option<Value> {
        match name {
            "this" => self.this.clone(),
            "item" => self.item.clone(),
            "alt" => Some(Value::from(self.alt)),
            _ => None,
        }
    }
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("alt", &self.alt)
            .field("this", &self.this)
            .field("item", &self.item)
            .finish()
    }
}

/// A rule compiled once at configuration time
pub trait CompiledExpression: Send + Sync + fmt::Debug {
    /// The raw expression text
    fn source(&self) -> &str;

    fn evaluate(&self, scope: &Scope<'_>) -> Result<Value, EvalError>;
}

/// Compiles rule text into evaluable expressions
pub trait ExpressionEngine: Send + Sync {
    fn compile(&self, source: &str) -> Result<Arc<dyn CompiledExpression>, SyntaxError>;
}
