//! Shared types for indexpages
//!
//! This crate provides the value model passed between the index engine,
//! the expression language and the host build system, together with the
//! contracts the host has to implement (record tree, dependency recording,
//! record-scoped caching of virtual objects).

pub mod expr;
pub mod pad;
pub mod record;
pub mod value;

pub use expr::{CompiledExpression, EvalError, ExpressionEngine, Scope, SyntaxError};
pub use pad::{DependencyRecorder, Pad, SuspendGuard, VirtualCache, VirtualKey};
pub use record::Record;
pub use value::{Object, Value};

/// Alt tag of the primary (default) language variant
pub const PRIMARY_ALT: &str = "_primary";
