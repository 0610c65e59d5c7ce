use crate::error::{ExprError, Result, Span};
use logos::Logos;

/// Tokens of the rule expression language
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // Keywords
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("none")]
    None,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,

    // Identifiers and literals
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    IntLiteral(i64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r"'([^'\\]|\\.)*'", |lex| unescape(lex.slice()))]
    StringLiteral(String),

    // Operators
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("~")]
    Tilde,
    #[token("|")]
    Pipe,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // Punctuation
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,

    // End of input
    Eof,
}

/// Strip the quotes of a string literal and resolve backslash escapes
fn unescape(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// A token with its source span
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

impl SpannedToken {
    pub fn new(token: Token, span: Span) -> Self {
        Self { token, span }
    }
}

/// Tokenize an expression, appending a trailing [`Token::Eof`]
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>> {
    let mut lex = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(token_result) = lex.next() {
        let span = Span::new(lex.span().start, lex.span().end);
        match token_result {
            Ok(token) => tokens.push(SpannedToken::new(token, span)),
            Err(_) => {
                return Err(ExprError::LexerError {
                    span,
                    message: format!("Invalid token: {}", &source[span.start..span.end]),
                });
            }
        }
    }

    tokens.push(SpannedToken::new(Token::Eof, Span::new(source.len(), source.len())));
    Ok(tokens)
}
