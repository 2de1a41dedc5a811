//! Core parser infrastructure: token cursor, error reporting, entry points.

use sct_lexer::token::{Token, TokenKind};
use sct_lexer::Lexer;
use sct_types::ast::{Expr, Ident, Module};
use sct_types::{ErrorCode, ParseError, ParseErrors, SourceFile, Span};

/// Maximum expression nesting depth.
pub(crate) const MAX_EXPR_DEPTH: u32 = 64;

/// The SCT parser.
///
/// Consumes a token stream produced by the lexer and builds a [`Module`].
/// Errors are collected; statement-level recovery skips to the next line.
pub struct Parser<'src> {
    tokens: Vec<Token>,
    pos: usize,
    source_file: &'src SourceFile,
    errors: ParseErrors,
    pub(crate) expr_depth: u32,
}

/// Result of parsing.
pub struct ParseResult<T> {
    /// `None` when any error was reported.
    pub node: Option<T>,
    pub errors: ParseErrors,
}

impl<T> ParseResult<T> {
    pub fn into_result(self) -> Result<T, ParseErrors> {
        match self.node {
            Some(node) if !self.errors.has_errors() => Ok(node),
            _ => Err(self.errors),
        }
    }
}

/// Lex and parse a complete program.
pub fn parse_module(name: &str, source: &str) -> Result<Module, ParseErrors> {
    let sf = SourceFile::new(name, source);
    let lexed = Lexer::new(&sf).lex();
    let mut result = Parser::new(lexed.tokens, &sf).parse();
    if lexed.errors.has_errors() {
        let mut errors = lexed.errors;
        errors.extend(result.errors);
        result = ParseResult { node: None, errors };
    }
    result.into_result()
}

/// Lex and parse a single expression, e.g. a call template `f(3, b=2)`.
pub fn parse_expression(source: &str) -> Result<Expr, ParseErrors> {
    let sf = SourceFile::new("<expr>", source);
    let lexed = Lexer::new(&sf).lex();
    if lexed.errors.has_errors() {
        return Err(lexed.errors);
    }
    Parser::new(lexed.tokens, &sf).parse_single_expression().into_result()
}

impl<'src> Parser<'src> {
    pub fn new(tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        Self {
            tokens,
            pos: 0,
            source_file,
            errors: ParseErrors::empty(),
            expr_depth: 0,
        }
    }

    /// Parse a complete program.
    pub fn parse(mut self) -> ParseResult<Module> {
        let start = self.current_span();
        let mut stmts = Vec::new();
        self.skip_newlines();
        while !self.at_end() {
            if self.errors.total_errors >= sct_types::MAX_ERRORS {
                break;
            }
            match self.parse_statement() {
                Some(stmt) => stmts.push(stmt),
                None => self.synchronize(),
            }
            self.skip_newlines();
        }
        let span = start.merge(self.previous_span());
        let module = Module {
            body: sct_types::ast::Block { stmts, span },
            span,
        };
        self.finish(module)
    }

    /// Parse exactly one expression followed by end of input.
    pub fn parse_single_expression(mut self) -> ParseResult<Expr> {
        let expr = self.parse_expression();
        self.skip_newlines();
        if expr.is_some() && !self.at_end() {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("unexpected '{}' after expression", self.peek_kind()),
            );
        }
        match expr {
            Some(expr) => self.finish(expr),
            None => ParseResult {
                node: None,
                errors: self.errors,
            },
        }
    }

    fn finish<T>(self, node: T) -> ParseResult<T> {
        ParseResult {
            node: (!self.errors.has_errors()).then_some(node),
            errors: self.errors,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    pub(crate) fn peek(&self) -> &Token {
        static EOF: Token = Token {
            kind: TokenKind::Eof,
            span: Span {
                start_line: 1,
                start_col: 1,
                end_line: 1,
                end_col: 1,
            },
        };
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .unwrap_or(&EOF)
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn previous_span(&self) -> Span {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(token) => token.span,
            None => Span::point(1, 1),
        }
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.check(expected) {
            Some(self.advance())
        } else {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected '{}', got '{}'", expected, self.peek_kind()),
            );
            None
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected identifier, got '{other}'"),
                );
                None
            }
        }
    }

    // ── Errors ────────────────────────────────────────────────────────────────

    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let err = ParseError::new(&self.source_file.name, code, message, span, source_line);
        self.errors.push_error(err);
    }

    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    pub(crate) fn error_at_current_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        let span = self.current_span();
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let err = ParseError::new(&self.source_file.name, code, message, span, source_line)
            .with_suggestion(suggestion);
        self.errors.push_error(err);
    }

    /// Skip to the start of the next logical line.
    fn synchronize(&mut self) {
        while !self.at_end() {
            match self.advance().kind {
                TokenKind::Newline | TokenKind::Dedent => break,
                _ => {}
            }
        }
    }
}
