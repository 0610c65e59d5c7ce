use crate::ast::{CompareOp, Expr, ExprKind, Literal};
use crate::error::{ExprError, Result, Span};
use crate::lexer::{SpannedToken, Token};

/// Recursive-descent parser for rule expressions
///
/// Precedence, loosest first: `or`, `and`, `not`, comparison, `~`,
/// filters, postfix (attribute, index, method call).
pub struct Parser<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [SpannedToken]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse a complete expression; trailing tokens are an error
    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.parse_or()?;
        if !self.is_eof() {
            return Err(self.error_here("Unexpected token"));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&SpannedToken> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek()
            .map(|t| std::mem::discriminant(&t.token) == std::mem::discriminant(expected))
            .unwrap_or(false)
    }

    fn consume(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<Span> {
        if self.check(&expected) {
            let span = self.current_span();
            self.pos += 1;
            Ok(span)
        } else {
            Err(self.error_here(&format!("Expected {:?}", expected)))
        }
    }

    fn is_eof(&self) -> bool {
        self.peek()
            .map(|t| matches!(t.token, Token::Eof))
            .unwrap_or(true)
    }

    fn current_span(&self) -> Span {
        self.peek().map(|t| t.span).unwrap_or_default()
    }

    fn error_here(&self, message: &str) -> ExprError {
        let found = self
            .peek()
            .map(|t| match &t.token {
                Token::Eof => "end of expression".to_string(),
                other => format!("{:?}", other),
            })
            .unwrap_or_else(|| "end of expression".to_string());
        ExprError::ParserError {
            span: self.current_span(),
            message: format!("{}, found {}", message, found),
        }
    }

    fn expect_identifier(&mut self) -> Result<(String, Span)> {
        match self.peek() {
            Some(SpannedToken {
                token: Token::Identifier(name),
                span,
            }) => {
                let rv = (name.clone(), *span);
                self.pos += 1;
                Ok(rv)
            }
            _ => Err(self.error_here("Expected identifier")),
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.consume(&Token::Or) {
            let rhs = self.parse_and()?;
            let span = Span::new(lhs.span.start, rhs.span.end);
            lhs = Expr::new(ExprKind::Or(Box::new(lhs), Box::new(rhs)), span);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_not()?;
        while self.consume(&Token::And) {
            let rhs = self.parse_not()?;
            let span = Span::new(lhs.span.start, rhs.span.end);
            lhs = Expr::new(ExprKind::And(Box::new(lhs), Box::new(rhs)), span);
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.check(&Token::Not) {
            let start = self.current_span().start;
            self.pos += 1;
            let operand = self.parse_not()?;
            let span = Span::new(start, operand.span.end);
            return Ok(Expr::new(ExprKind::Not(Box::new(operand)), span));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Expr> {
        let lhs = self.parse_concat()?;
        let op = if self.consume(&Token::EqEq) {
            CompareOp::Eq
        } else if self.consume(&Token::NotEq) {
            CompareOp::NotEq
        } else {
            return Ok(lhs);
        };
        let rhs = self.parse_concat()?;
        let span = Span::new(lhs.span.start, rhs.span.end);
        Ok(Expr::new(
            ExprKind::Compare {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        ))
    }

    fn parse_concat(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_filtered()?;
        while self.consume(&Token::Tilde) {
            let rhs = self.parse_filtered()?;
            let span = Span::new(lhs.span.start, rhs.span.end);
            lhs = Expr::new(ExprKind::Concat(Box::new(lhs), Box::new(rhs)), span);
        }
        Ok(lhs)
    }

    fn parse_filtered(&mut self) -> Result<Expr> {
        let mut target = self.parse_postfix()?;
        while self.consume(&Token::Pipe) {
            let (name, name_span) = self.expect_identifier()?;
            let mut end = name_span.end;
            let args = if self.check(&Token::LParen) {
                let (args, args_end) = self.parse_call_args()?;
                end = args_end;
                args
            } else {
                Vec::new()
            };
            let span = Span::new(target.span.start, end);
            target = Expr::new(
                ExprKind::Filter {
                    target: Box::new(target),
                    name,
                    args,
                },
                span,
            );
        }
        Ok(target)
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut target = self.parse_primary()?;
        loop {
            if self.consume(&Token::Dot) {
                let (name, name_span) = self.expect_identifier()?;
                if self.check(&Token::LParen) {
                    let (args, end) = self.parse_call_args()?;
                    let span = Span::new(target.span.start, end);
                    target = Expr::new(
                        ExprKind::Method {
                            target: Box::new(target),
                            name,
                            args,
                        },
                        span,
                    );
                } else {
                    let span = Span::new(target.span.start, name_span.end);
                    target = Expr::new(
                        ExprKind::Attr {
                            target: Box::new(target),
                            name,
                        },
                        span,
                    );
                }
            } else if self.consume(&Token::LBracket) {
                let index = self.parse_or()?;
                let end = self.expect(Token::RBracket)?.end;
                let span = Span::new(target.span.start, end);
                target = Expr::new(
                    ExprKind::Index {
                        target: Box::new(target),
                        index: Box::new(index),
                    },
                    span,
                );
            } else {
                return Ok(target);
            }
        }
    }

    /// Parse `( expr, ... )`, returning the arguments and the end offset
    fn parse_call_args(&mut self) -> Result<(Vec<Expr>, usize)> {
        self.expect(Token::LParen)?;
        let args = self.parse_comma_list(&Token::RParen)?;
        let end = self.expect(Token::RParen)?.end;
        Ok((args, end))
    }

    fn parse_comma_list(&mut self, close: &Token) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        if self.check(close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_or()?);
            if !self.consume(&Token::Comma) || self.check(close) {
                return Ok(items);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let Some(current) = self.advance().cloned() else {
            return Err(self.error_here("Expected expression"));
        };
        let span = current.span;
        let kind = match current.token {
            Token::IntLiteral(i) => ExprKind::Literal(Literal::Int(i)),
            Token::StringLiteral(s) => ExprKind::Literal(Literal::Str(s)),
            Token::True => ExprKind::Literal(Literal::Bool(true)),
            Token::False => ExprKind::Literal(Literal::Bool(false)),
            Token::None => ExprKind::Literal(Literal::None),
            Token::Identifier(name) => ExprKind::Name(name),
            Token::LParen => {
                let inner = self.parse_or()?;
                let end = self.expect(Token::RParen)?.end;
                return Ok(Expr::new(inner.kind, Span::new(span.start, end)));
            }
            Token::LBracket => {
                let items = self.parse_comma_list(&Token::RBracket)?;
                let end = self.expect(Token::RBracket)?.end;
                return Ok(Expr::new(ExprKind::List(items), Span::new(span.start, end)));
            }
            _ => {
                self.pos -= 1;
                return Err(self.error_here("Expected expression"));
            }
        };
        Ok(Expr::new(kind, span))
    }
}

/// Tokenize and parse an expression
pub fn parse(source: &str) -> Result<Expr> {
    let tokens = crate::lexer::tokenize(source)?;
    Parser::new(&tokens).parse()
}
