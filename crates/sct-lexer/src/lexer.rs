//! Core SCT lexer : converts source text to a token stream.
//!
//! Features:
//! - Indentation-structured blocks via `Indent` / `Dedent` tokens
//! - Newlines inside `()` and `[]` are not significant
//! - `#` comments and blank lines produce no tokens
//! - Error recovery: collects errors instead of stopping at the first

use sct_types::{ErrorCode, ParseError, ParseErrors, SourceFile, Span};

use crate::token::{Token, TokenKind};

/// Columns a tab advances indentation by.
const TAB_WIDTH: u32 = 4;

/// The SCT lexer.
pub struct Lexer<'src> {
    source: &'src [u8],
    source_file: &'src SourceFile,
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    col: u32,
    /// Open indentation widths; the bottom entry is always 0.
    indents: Vec<u32>,
    /// Open `(` / `[` nesting.
    paren_depth: u32,
    at_line_start: bool,
    tokens: Vec<Token>,
    errors: ParseErrors,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    pub errors: ParseErrors,
}

impl<'src> Lexer<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: source_file.source.as_bytes(),
            source_file,
            pos: 0,
            line: 1,
            col: 1,
            indents: vec![0],
            paren_depth: 0,
            at_line_start: true,
            tokens: Vec::new(),
            errors: ParseErrors::empty(),
        }
    }

    /// Lex the entire source file into a token stream.
    pub fn lex(mut self) -> LexResult {
        loop {
            if self.errors.total_errors >= sct_types::MAX_ERRORS {
                break;
            }
            if self.at_line_start && self.paren_depth == 0 {
                self.at_line_start = false;
                if !self.scan_indentation() {
                    break;
                }
                continue;
            }
            match self.peek() {
                None => break,
                Some(b' ' | b'\t' | b'\r') => {
                    self.advance();
                }
                Some(b'\\') if self.peek_at(1) == Some(b'\n') => {
                    self.advance();
                    self.advance();
                }
                Some(b'#') => self.skip_comment(),
                Some(b'\n') => {
                    let span = self.current_span();
                    self.advance();
                    if self.paren_depth == 0 {
                        self.push(TokenKind::Newline, span);
                        self.at_line_start = true;
                    }
                }
                Some(_) => self.scan_token(),
            }
        }
        self.finish()
    }

    fn finish(mut self) -> LexResult {
        let span = self.current_span();
        if self
            .tokens
            .last()
            .is_some_and(|t| t.kind != TokenKind::Newline)
        {
            self.push(TokenKind::Newline, span);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, span);
        }
        self.push(TokenKind::Eof, span);
        LexResult {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn push(&mut self, kind: TokenKind, span: Span) {
        self.tokens.push(Token::new(kind, span));
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let err = ParseError::new(&self.source_file.name, code, message, span, source_line);
        self.errors.push_error(err);
    }

    fn emit_error_with_suggestion(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        suggestion: impl Into<String>,
    ) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("");
        let err = ParseError::new(&self.source_file.name, code, message, span, source_line)
            .with_suggestion(suggestion);
        self.errors.push_error(err);
    }

    fn skip_comment(&mut self) {
        while self.peek().is_some_and(|c| c != b'\n') {
            self.advance();
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Indentation
    // ─────────────────────────────────────────────────────────────

    /// Measure the indentation of the next non-blank line and emit
    /// `Indent`/`Dedent` tokens. Returns `false` at end of input.
    fn scan_indentation(&mut self) -> bool {
        loop {
            let mut width = 0;
            while let Some(c) = self.peek() {
                match c {
                    b' ' => width += 1,
                    b'\t' => width += TAB_WIDTH - width % TAB_WIDTH,
                    b'\r' => {}
                    _ => break,
                }
                self.advance();
            }
            match self.peek() {
                None => return false,
                Some(b'\n') => {
                    self.advance();
                }
                Some(b'#') => self.skip_comment(),
                Some(_) => {
                    self.apply_indentation(width);
                    return true;
                }
            }
        }
    }

    fn apply_indentation(&mut self, width: u32) {
        let span = self.current_span();
        let top = self.indents.last().copied().unwrap_or(0);
        if width > top {
            self.indents.push(width);
            self.push(TokenKind::Indent, span);
            return;
        }
        while self.indents.last().is_some_and(|&w| w > width) {
            self.indents.pop();
            self.push(TokenKind::Dedent, span);
        }
        if self.indents.last().copied().unwrap_or(0) != width {
            self.emit_error_with_suggestion(
                ErrorCode::INCONSISTENT_DEDENT,
                "unindent does not match any outer indentation level",
                span,
                "align this line with an enclosing block",
            );
            self.indents.push(width);
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Tokens
    // ─────────────────────────────────────────────────────────────

    fn scan_token(&mut self) {
        let (line, col) = (self.line, self.col);
        let Some(c) = self.peek() else {
            return;
        };
        if c.is_ascii_digit() {
            return self.scan_number(line, col);
        }
        if c == b'"' || c == b'\'' {
            return self.scan_string(line, col, c);
        }
        if c.is_ascii_alphabetic() || c == b'_' {
            return self.scan_word(line, col);
        }

        self.advance();
        let next = self.peek();
        let kind = match (c, next) {
            (b'*', Some(b'*')) => Some(TokenKind::StarStar),
            (b'=', Some(b'=')) => Some(TokenKind::EqEq),
            (b'!', Some(b'=')) => Some(TokenKind::BangEq),
            (b'<', Some(b'=')) => Some(TokenKind::LessEq),
            (b'>', Some(b'=')) => Some(TokenKind::GreaterEq),
            _ => None,
        };
        let kind = match kind {
            Some(kind) => {
                self.advance();
                kind
            }
            None => match c {
                b'+' => TokenKind::Plus,
                b'-' => TokenKind::Minus,
                b'*' => TokenKind::Star,
                b'/' => TokenKind::Slash,
                b'%' => TokenKind::Percent,
                b'<' => TokenKind::Less,
                b'>' => TokenKind::Greater,
                b'=' => TokenKind::Eq,
                b',' => TokenKind::Comma,
                b':' => TokenKind::Colon,
                b'.' => TokenKind::Dot,
                b'(' | b'[' => {
                    self.paren_depth += 1;
                    if c == b'(' {
                        TokenKind::LParen
                    } else {
                        TokenKind::LBracket
                    }
                }
                b')' | b']' => {
                    self.paren_depth = self.paren_depth.saturating_sub(1);
                    if c == b')' {
                        TokenKind::RParen
                    } else {
                        TokenKind::RBracket
                    }
                }
                other => {
                    let span = self.span_from(line, col);
                    self.emit_error(
                        ErrorCode::UNEXPECTED_CHARACTER,
                        format!("unexpected character '{}'", other as char),
                        span,
                    );
                    return;
                }
            },
        };
        let span = self.span_from(line, col);
        self.push(kind, span);
    }

    fn scan_number(&mut self, line: u32, col: u32) {
        let start = self.pos;
        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == b'_' {
                self.advance();
            } else if c == b'.' && !is_float && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())
            {
                is_float = true;
                self.advance();
            } else {
                break;
            }
        }
        let text: String = String::from_utf8_lossy(&self.source[start..self.pos]).replace('_', "");
        let span = self.span_from(line, col);
        let kind = if is_float {
            text.parse().ok().map(TokenKind::Float)
        } else {
            text.parse().ok().map(TokenKind::Int)
        };
        match kind {
            Some(kind) => self.push(kind, span),
            None => self.emit_error(
                ErrorCode::INVALID_NUMBER,
                format!("invalid number literal '{text}'"),
                span,
            ),
        }
    }

    fn scan_string(&mut self, line: u32, col: u32, quote: u8) {
        self.advance();
        let mut bytes = Vec::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    let span = self.span_from(line, col);
                    self.emit_error_with_suggestion(
                        ErrorCode::UNTERMINATED_STRING,
                        "unterminated string literal",
                        span,
                        format!("close the string with {}", quote as char),
                    );
                    return;
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    self.advance();
                    let escaped = match self.advance() {
                        Some(b'n') => b'\n',
                        Some(b't') => b'\t',
                        Some(other) => other,
                        None => continue,
                    };
                    bytes.push(escaped);
                }
                Some(c) => {
                    self.advance();
                    bytes.push(c);
                }
            }
        }
        let span = self.span_from(line, col);
        self.push(
            TokenKind::Str(String::from_utf8_lossy(&bytes).into_owned()),
            span,
        );
    }

    fn scan_word(&mut self, line: u32, col: u32) {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.advance();
        }
        let word = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        let span = self.span_from(line, col);
        let kind = TokenKind::keyword(&word).unwrap_or(TokenKind::Identifier(word));
        self.push(kind, span);
    }
}
