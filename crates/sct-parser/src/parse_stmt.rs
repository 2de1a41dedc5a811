//! Statement parsing.

use sct_lexer::token::TokenKind;
use sct_types::ast::*;
use sct_types::{ErrorCode, Span};

use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// Parse one statement, compound or simple.
    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        match self.peek_kind() {
            TokenKind::Def => self.parse_function_def(),
            TokenKind::With => self.parse_with(),
            TokenKind::If => self.parse_if(),
            TokenKind::Indent => {
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "unexpected indent");
                self.advance();
                None
            }
            _ => self.parse_simple_statement(),
        }
    }

    /// `return`, `raise`, `pass`, assignment or expression, ending the line.
    fn parse_simple_statement(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        let stmt = match self.peek_kind() {
            TokenKind::Return => {
                self.advance();
                let value = if self.at_line_end() {
                    None
                } else {
                    Some(self.parse_expression_list()?)
                };
                Stmt::Return(ReturnStmt {
                    value,
                    span: start.merge(self.previous_span()),
                })
            }
            TokenKind::Raise => {
                self.advance();
                let exc = if self.at_line_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                Stmt::Raise(RaiseStmt {
                    exc,
                    span: start.merge(self.previous_span()),
                })
            }
            TokenKind::Pass => {
                self.advance();
                Stmt::Pass(start)
            }
            _ => {
                let expr = self.parse_expression_list()?;
                if self.eat(&TokenKind::Eq) {
                    let target = self.expr_to_target(&expr)?;
                    let value = self.parse_expression_list()?;
                    let span = expr.span.merge(value.span);
                    Stmt::Assign(AssignStmt {
                        target,
                        value,
                        span,
                    })
                } else {
                    let span = expr.span;
                    Stmt::Expr(ExprStmt { expr, span })
                }
            }
        };
        self.expect_line_end()?;
        Some(stmt)
    }

    fn at_line_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Eof | TokenKind::Dedent
        )
    }

    fn expect_line_end(&mut self) -> Option<()> {
        if self.eat(&TokenKind::Newline) || self.at_line_end() {
            return Some(());
        }
        self.error_at_current(
            ErrorCode::UNEXPECTED_TOKEN,
            format!("expected end of line, got '{}'", self.peek_kind()),
        );
        None
    }

    /// `: NEWLINE INDENT stmt+ DEDENT` or `: simple_stmt`.
    fn parse_suite(&mut self) -> Option<Block> {
        self.expect(&TokenKind::Colon)?;
        if !self.eat(&TokenKind::Newline) {
            let stmt = self.parse_simple_statement()?;
            let span = stmt.span();
            return Some(Block {
                stmts: vec![stmt],
                span,
            });
        }
        self.skip_newlines();
        if !self.eat(&TokenKind::Indent) {
            self.error_at_current_with_suggestion(
                ErrorCode::EXPECTED_INDENTED_BLOCK,
                "expected an indented block",
                "indent the lines after the ':'",
            );
            return None;
        }
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::Dedent) && !self.at_end() {
            stmts.push(self.parse_statement()?);
            self.skip_newlines();
        }
        self.eat(&TokenKind::Dedent);
        let span = match (stmts.first(), stmts.last()) {
            (Some(first), Some(last)) => first.span().merge(last.span()),
            _ => self.previous_span(),
        };
        Some(Block { stmts, span })
    }

    // ── Compound statements ──────────────────────────────────────────────────

    /// `def name(params): suite`
    fn parse_function_def(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::LParen)?;
        let params = self.parse_params(&TokenKind::RParen)?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_suite()?;
        let span = start.merge(body.span);
        Some(Stmt::FunctionDef(FunctionDef {
            name,
            params,
            body,
            span,
        }))
    }

    /// Parameters up to (not including) `closing`.
    pub(crate) fn parse_params(&mut self, closing: &TokenKind) -> Option<Params> {
        let mut params = Params::default();
        while !self.check(closing) {
            let start = self.current_span();
            if self.eat(&TokenKind::StarStar) {
                let name = self.expect_identifier()?;
                params.kwarg = Some(Param {
                    span: start.merge(name.span),
                    name,
                    default: None,
                });
            } else if self.eat(&TokenKind::Star) {
                let name = self.expect_identifier()?;
                params.vararg = Some(Param {
                    span: start.merge(name.span),
                    name,
                    default: None,
                });
            } else {
                let name = self.expect_identifier()?;
                let default = if self.eat(&TokenKind::Eq) {
                    Some(self.parse_ternary()?)
                } else {
                    None
                };
                let span = default
                    .as_ref()
                    .map_or(name.span, |d| name.span.merge(d.span));
                params.positional.push(Param {
                    name,
                    default,
                    span,
                });
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Some(params)
    }

    /// `with item [, item]*: suite`
    fn parse_with(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let mut items = Vec::new();
        loop {
            let context = self.parse_expression()?;
            let target = if self.eat(&TokenKind::As) {
                Some(self.parse_with_target()?)
            } else {
                None
            };
            let span = target
                .as_ref()
                .map_or(context.span, |t| context.span.merge(t.span()));
            items.push(WithItem {
                context,
                target,
                span,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let body = self.parse_suite()?;
        let span = start.merge(body.span);
        Some(Stmt::With(WithStmt { items, body, span }))
    }

    /// `name` or `(name, name, ...)`
    fn parse_with_target(&mut self) -> Option<Target> {
        let start = self.current_span();
        if !self.eat(&TokenKind::LParen) {
            return self.expect_identifier().map(Target::Name);
        }
        let mut names = Vec::new();
        while !self.check(&TokenKind::RParen) {
            names.push(self.expect_identifier()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Some(Target::Tuple(names, start.merge(self.previous_span())))
    }

    /// `if test: suite [elif test: suite]* [else: suite]`
    fn parse_if(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let test = self.parse_expression()?;
        let body = self.parse_suite()?;
        let orelse = if self.check(&TokenKind::Elif) {
            let nested = self.parse_if()?;
            let span = nested.span();
            Some(Block {
                stmts: vec![nested],
                span,
            })
        } else if self.eat(&TokenKind::Else) {
            Some(self.parse_suite()?)
        } else {
            None
        };
        let end = orelse.as_ref().map_or(body.span, |b| b.span);
        Some(Stmt::If(IfStmt {
            test,
            body,
            orelse,
            span: start.merge(end),
        }))
    }

    fn expr_to_target(&mut self, expr: &Expr) -> Option<Target> {
        let name_of = |e: &Expr| match &e.kind {
            ExprKind::Name(name) => Some(Ident::new(name.clone(), e.span)),
            _ => None,
        };
        let target = match &expr.kind {
            ExprKind::Name(_) => name_of(expr).map(Target::Name),
            ExprKind::Tuple(items) => items
                .iter()
                .map(name_of)
                .collect::<Option<Vec<_>>>()
                .map(|ids| Target::Tuple(ids, expr.span)),
            _ => None,
        };
        if target.is_none() {
            self.error_at(
                ErrorCode::INVALID_TARGET,
                format!("cannot assign to '{expr}'"),
                expr.span,
            );
        }
        target
    }

    /// `expr [, expr]*`; a bare comma list becomes a tuple.
    pub(crate) fn parse_expression_list(&mut self) -> Option<Expr> {
        let first = self.parse_expression()?;
        if !self.check(&TokenKind::Comma) {
            return Some(first);
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at_line_end() || self.check(&TokenKind::Eq) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        let span = items
            .iter()
            .map(|e| e.span)
            .reduce(Span::merge)
            .unwrap_or_else(|| self.previous_span());
        Some(Expr::new(ExprKind::Tuple(items), span))
    }
}
