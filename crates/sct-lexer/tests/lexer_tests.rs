//! Lexer tests: indentation layout, literals, bracket continuation and
//! error recovery.

use sct_lexer::{Lexer, TokenKind};
use sct_types::{ErrorCode, SourceFile};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

/// Lex source text and return just the token kinds (excluding final Eof).
fn kinds(source: &str) -> Vec<TokenKind> {
    let sf = SourceFile::new("test.py", source);
    let result = Lexer::new(&sf).lex();
    assert!(!result.errors.has_errors(), "{}", result.errors);
    result
        .tokens
        .into_iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| t.kind)
        .collect()
}

fn error_codes(source: &str) -> Vec<ErrorCode> {
    let sf = SourceFile::new("test.py", source);
    Lexer::new(&sf)
        .lex()
        .errors
        .errors
        .iter()
        .map(|e| e.code)
        .collect()
}

fn ident(name: &str) -> TokenKind {
    TokenKind::Identifier(name.into())
}

// ─────────────────────────────────────────────────────────────────────
// Layout
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_function_body_is_indented() {
    assert_eq!(
        kinds("def f(x):\n    return x\n"),
        vec![
            TokenKind::Def,
            ident("f"),
            TokenKind::LParen,
            ident("x"),
            TokenKind::RParen,
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Return,
            ident("x"),
            TokenKind::Newline,
            TokenKind::Dedent,
        ]
    );
}

#[test]
fn test_nested_blocks_close_together() {
    let tokens = kinds("with a:\n    if b:\n        pass\nx\n");
    let dedents = tokens
        .iter()
        .filter(|k| **k == TokenKind::Dedent)
        .count();
    assert_eq!(dedents, 2);
    assert_eq!(tokens[tokens.len() - 2], ident("x"));
}

#[test]
fn test_unclosed_blocks_are_closed_at_eof() {
    let tokens = kinds("def f():\n    pass");
    assert_eq!(
        &tokens[tokens.len() - 3..],
        &[TokenKind::Pass, TokenKind::Newline, TokenKind::Dedent]
    );
}

#[test]
fn test_newlines_inside_brackets_are_ignored() {
    assert_eq!(
        kinds("f(1,\n  2)\n"),
        vec![
            ident("f"),
            TokenKind::LParen,
            TokenKind::Int(1),
            TokenKind::Comma,
            TokenKind::Int(2),
            TokenKind::RParen,
            TokenKind::Newline,
        ]
    );
}

#[test]
fn test_tabs_count_as_indentation() {
    let tokens = kinds("if x:\n\tpass\n");
    assert!(tokens.contains(&TokenKind::Indent));
}

// ─────────────────────────────────────────────────────────────────────
// Literals and keywords
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_number_literals() {
    assert_eq!(
        kinds("1_000 2.5"),
        vec![TokenKind::Int(1000), TokenKind::Float(2.5), TokenKind::Newline]
    );
}

#[test]
fn test_string_escapes_and_quotes() {
    assert_eq!(
        kinds(r#"'a\'b' "c\nd""#),
        vec![
            TokenKind::Str("a'b".into()),
            TokenKind::Str("c\nd".into()),
            TokenKind::Newline,
        ]
    );
}

#[test]
fn test_keywords_are_recognised() {
    assert_eq!(
        kinds("lambda x: None if not x else True"),
        vec![
            TokenKind::Lambda,
            ident("x"),
            TokenKind::Colon,
            TokenKind::None,
            TokenKind::If,
            TokenKind::Not,
            ident("x"),
            TokenKind::Else,
            TokenKind::True,
            TokenKind::Newline,
        ]
    );
}

// ─────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_unterminated_string() {
    assert_eq!(error_codes("x = 'abc\n"), vec![ErrorCode::UNTERMINATED_STRING]);
    let sf = SourceFile::new("test.py", "x = 'abc\n");
    let result = Lexer::new(&sf).lex();
    assert_eq!(
        result.errors.errors[0].suggestion.as_deref(),
        Some("close the string with '")
    );
}

#[test]
fn test_inconsistent_dedent() {
    assert_eq!(
        error_codes("if x:\n    a\n  b\n"),
        vec![ErrorCode::INCONSISTENT_DEDENT]
    );
}

#[test]
fn test_unexpected_character_recovers() {
    let sf = SourceFile::new("test.py", "a $ b\n");
    let result = Lexer::new(&sf).lex();
    assert_eq!(result.errors.total_errors, 1);
    assert_eq!(result.errors.errors[0].code, ErrorCode::UNEXPECTED_CHARACTER);
    assert!(result.tokens.iter().any(|t| t.kind == ident("b")));
}
