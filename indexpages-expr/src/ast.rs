//! Syntax tree of rule expressions.

use crate::error::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Str(String),
    Bool(bool),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    List(Vec<Expr>),
    Name(String),
    /// `target.name`
    Attr { target: Box<Expr>, name: String },
    /// `target[index]`
    Index { target: Box<Expr>, index: Box<Expr> },
    /// `target.name(args)`
    Method {
        target: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    /// `target|name(args)`
    Filter {
        target: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    /// `lhs ~ rhs`
    Concat(Box<Expr>, Box<Expr>),
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}
