//! Expression parsing with operator precedence.
//!
//! Precedence (lowest → highest):
//! 1. `lambda`
//! 2. `a if c else b`
//! 3. `or`
//! 4. `and`
//! 5. `not`
//! 6. `==`, `!=`, `<`, `>`, `<=`, `>=` (no chaining)
//! 7. `+`, `-`
//! 8. `*`, `/`, `%`
//! 9. unary `-`
//! 10. `**` (right-associative)
//! 11. call `()`, attribute `.`

use sct_lexer::token::TokenKind;
use sct_types::ast::*;
use sct_types::ErrorCode;

use crate::parser::{Parser, MAX_EXPR_DEPTH};

impl<'src> Parser<'src> {
    /// Parse an expression, including `lambda`.
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.expr_depth += 1;
        if self.expr_depth > MAX_EXPR_DEPTH {
            self.error_at_current(
                ErrorCode::NESTING_LIMIT_EXCEEDED,
                "expression nested too deeply",
            );
            self.expr_depth -= 1;
            return None;
        }
        let result = if self.check(&TokenKind::Lambda) {
            self.parse_lambda()
        } else {
            self.parse_ternary()
        };
        self.expr_depth -= 1;
        result
    }

    /// `lambda params: body`
    fn parse_lambda(&mut self) -> Option<Expr> {
        let start = self.advance().span;
        let params = self.parse_params(&TokenKind::Colon)?;
        self.expect(&TokenKind::Colon)?;
        let body = self.parse_expression()?;
        let span = start.merge(body.span);
        Some(Expr::new(
            ExprKind::Lambda(Box::new(Lambda {
                params,
                body: Box::new(body),
            })),
            span,
        ))
    }

    /// `body [if test else orelse]`
    pub(crate) fn parse_ternary(&mut self) -> Option<Expr> {
        let body = self.parse_or()?;
        if !self.eat(&TokenKind::If) {
            return Some(body);
        }
        let test = self.parse_or()?;
        self.expect(&TokenKind::Else)?;
        let orelse = self.parse_expression()?;
        let span = body.span.merge(orelse.span);
        Some(Expr::new(
            ExprKind::IfExp {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            },
            span,
        ))
    }

    fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
        let span = left.span.merge(right.span);
        Expr::new(
            ExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            span,
        )
    }

    fn parse_or(&mut self) -> Option<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = Self::binary(left, BinOp::Or, right);
        }
        Some(left)
    }

    fn parse_and(&mut self) -> Option<Expr> {
        let mut left = self.parse_not()?;
        while self.eat(&TokenKind::And) {
            let right = self.parse_not()?;
            left = Self::binary(left, BinOp::And, right);
        }
        Some(left)
    }

    fn parse_not(&mut self) -> Option<Expr> {
        if !self.check(&TokenKind::Not) {
            return self.parse_comparison();
        }
        let start = self.advance().span;
        let operand = self.parse_not()?;
        let span = start.merge(operand.span);
        Some(Expr::new(
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn comparison_op(&self) -> Option<BinOp> {
        Some(match self.peek_kind() {
            TokenKind::EqEq => BinOp::Eq,
            TokenKind::BangEq => BinOp::NotEq,
            TokenKind::Less => BinOp::Less,
            TokenKind::Greater => BinOp::Greater,
            TokenKind::LessEq => BinOp::LessEq,
            TokenKind::GreaterEq => BinOp::GreaterEq,
            _ => return None,
        })
    }

    /// Comparisons do not chain: `a < b < c` is rejected.
    fn parse_comparison(&mut self) -> Option<Expr> {
        let left = self.parse_additive()?;
        let Some(op) = self.comparison_op() else {
            return Some(left);
        };
        self.advance();
        let right = self.parse_additive()?;
        if self.comparison_op().is_some() {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                "chained comparisons are not supported",
            );
            return None;
        }
        Some(Self::binary(left, op, right))
    }

    fn parse_additive(&mut self) -> Option<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Some(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Self::binary(left, op, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => return Some(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Self::binary(left, op, right);
        }
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        if !self.check(&TokenKind::Minus) {
            return self.parse_power();
        }
        let start = self.advance().span;
        let operand = self.parse_unary()?;
        let span = start.merge(operand.span);
        Some(Expr::new(
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// `postfix [** unary]`, right-associative.
    fn parse_power(&mut self) -> Option<Expr> {
        let base = self.parse_postfix()?;
        if !self.eat(&TokenKind::StarStar) {
            return Some(base);
        }
        let exponent = self.parse_unary()?;
        Some(Self::binary(base, BinOp::Pow, exponent))
    }

    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&TokenKind::LParen) {
                let (args, keywords) = self.parse_call_args()?;
                self.expect(&TokenKind::RParen)?;
                let span = expr.span.merge(self.previous_span());
                expr = Expr::new(
                    ExprKind::Call(Call {
                        func: Box::new(expr),
                        args,
                        keywords,
                    }),
                    span,
                );
            } else if self.eat(&TokenKind::Dot) {
                let attr = self.expect_identifier()?;
                let span = expr.span.merge(attr.span);
                expr = Expr::new(
                    ExprKind::Attribute {
                        value: Box::new(expr),
                        attr,
                    },
                    span,
                );
            } else {
                return Some(expr);
            }
        }
    }

    /// Positional arguments followed by `name=value` keywords.
    fn parse_call_args(&mut self) -> Option<(Vec<Expr>, Vec<Keyword>)> {
        let mut args = Vec::new();
        let mut keywords: Vec<Keyword> = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let is_keyword = matches!(self.peek_kind(), TokenKind::Identifier(_))
                && *self.look_ahead(1) == TokenKind::Eq;
            if is_keyword {
                let name = self.expect_identifier()?;
                self.advance();
                let value = self.parse_expression()?;
                let span = name.span.merge(value.span);
                keywords.push(Keyword { name, value, span });
            } else {
                let arg = self.parse_expression()?;
                if !keywords.is_empty() {
                    self.error_at(
                        ErrorCode::UNEXPECTED_TOKEN,
                        "positional argument follows keyword argument",
                        arg.span,
                    );
                    return None;
                }
                args.push(arg);
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Some((args, keywords))
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let token = self.advance();
        let span = token.span;
        let kind = match token.kind {
            TokenKind::Int(n) => ExprKind::Int(n),
            TokenKind::Float(n) => ExprKind::Float(n),
            TokenKind::Str(s) => ExprKind::Str(s),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::None => ExprKind::NoneLit,
            TokenKind::Identifier(name) => ExprKind::Name(name),
            TokenKind::LBracket => {
                let items = self.parse_items(&TokenKind::RBracket)?;
                self.expect(&TokenKind::RBracket)?;
                return Some(Expr::new(
                    ExprKind::List(items),
                    span.merge(self.previous_span()),
                ));
            }
            TokenKind::LParen => {
                if self.eat(&TokenKind::RParen) {
                    return Some(Expr::new(
                        ExprKind::Tuple(vec![]),
                        span.merge(self.previous_span()),
                    ));
                }
                let first = self.parse_expression()?;
                if !self.eat(&TokenKind::Comma) {
                    self.expect(&TokenKind::RParen)?;
                    return Some(first);
                }
                let mut items = vec![first];
                items.extend(self.parse_items(&TokenKind::RParen)?);
                self.expect(&TokenKind::RParen)?;
                return Some(Expr::new(
                    ExprKind::Tuple(items),
                    span.merge(self.previous_span()),
                ));
            }
            other => {
                self.error_at(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected expression, got '{other}'"),
                    span,
                );
                return None;
            }
        };
        Some(Expr::new(kind, span))
    }

    /// Comma-separated expressions up to `closing`, trailing comma allowed.
    fn parse_items(&mut self, closing: &TokenKind) -> Option<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.check(closing) {
            items.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Some(items)
    }
}
