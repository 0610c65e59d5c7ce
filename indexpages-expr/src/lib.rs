//! Rule expression language for index pages
//!
//! A small Jinja-flavoured language used by index configuration to compute
//! grouping keys, slugs, item selections and custom fields:
//!
//! ```text
//! item.pub_date|dateformat('%Y')
//! 'Posts from ' ~ this.key
//! this.children.filter(F._id != 'drafts')
//! '{:02d}'.format(item.pub_date.month)
//! ```

pub mod ast;
pub mod error;
pub mod eval;
mod filters;
pub mod lexer;
pub mod parser;

pub use ast::Expr;
pub use error::{ExprError, Span};
pub use eval::Evaluator;
pub use parser::parse;

use indexpages_types::{CompiledExpression, EvalError, ExpressionEngine, Scope, SyntaxError, Value};
use std::sync::Arc;

/// A parsed expression together with its source text
#[derive(Debug, Clone)]
pub struct Compiled {
    source: String,
    ast: Expr,
}

impl Compiled {
    pub fn ast(&self) -> &Expr {
        &self.ast
    }
}

impl CompiledExpression for Compiled {
    fn source(&self) -> &str {
        &self.source
    }

    fn evaluate(&self, scope: &Scope<'_>) -> Result<Value, EvalError> {
        Evaluator::new(scope).eval(&self.ast)
    }
}

/// The [`ExpressionEngine`] backed by this crate's parser
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Engine
    }
}

impl ExpressionEngine for Engine {
    fn compile(&self, source: &str) -> Result<Arc<dyn CompiledExpression>, SyntaxError> {
        let ast = parse(source)?;
        Ok(Arc::new(Compiled {
            source: source.to_string(),
            ast,
        }))
    }
}
