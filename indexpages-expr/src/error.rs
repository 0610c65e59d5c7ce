use indexpages_types::SyntaxError;

/// Byte range in the expression source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Errors raised while compiling a rule expression
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    #[error("Lexer error at {span:?}: {message}")]
    LexerError { span: Span, message: String },

    #[error("Parser error at {span:?}: {message}")]
    ParserError { span: Span, message: String },
}

impl ExprError {
    pub fn span(&self) -> Span {
        match self {
            ExprError::LexerError { span, .. } | ExprError::ParserError { span, .. } => *span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ExprError::LexerError { message, .. } | ExprError::ParserError { message, .. } => message,
        }
    }
}

impl From<ExprError> for SyntaxError {
    fn from(err: ExprError) -> Self {
        SyntaxError::new(err.message(), err.span().start)
    }
}

pub type Result<T> = std::result::Result<T, ExprError>;
