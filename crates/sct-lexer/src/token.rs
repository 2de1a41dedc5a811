//! Token types for the SCT lexer.

use sct_types::Span;
use std::fmt;

/// Reserved words of the checked language subset.
pub const ALL_KEYWORDS: &[&str] = &[
    "def", "return", "lambda", "with", "as", "if", "elif", "else", "pass", "raise", "True",
    "False", "None", "and", "or", "not",
];

/// A single token with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────
    Int(i64),
    Float(f64),
    Str(String),
    Identifier(String),

    // ── Keywords ──────────────────────────────────────────────
    Def,
    Return,
    Lambda,
    With,
    As,
    If,
    Elif,
    Else,
    Pass,
    Raise,
    True,
    False,
    None,
    And,
    Or,
    Not,

    // ── Operators ─────────────────────────────────────────────
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    EqEq,
    BangEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    Eq,

    // ── Punctuation ───────────────────────────────────────────
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Dot,

    // ── Layout ────────────────────────────────────────────────
    /// End of a logical line.
    Newline,
    /// Indentation increased.
    Indent,
    /// Indentation decreased by one level.
    Dedent,
    Eof,
}

impl TokenKind {
    /// Map a word to its keyword token, if it is reserved.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        Some(match word {
            "def" => TokenKind::Def,
            "return" => TokenKind::Return,
            "lambda" => TokenKind::Lambda,
            "with" => TokenKind::With,
            "as" => TokenKind::As,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "pass" => TokenKind::Pass,
            "raise" => TokenKind::Raise,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            _ => return None,
        })
    }

    pub fn is_keyword(&self) -> bool {
        ALL_KEYWORDS.contains(&self.to_string().as_str())
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Int(n) => return write!(f, "{n}"),
            TokenKind::Float(n) => return write!(f, "{n:?}"),
            TokenKind::Str(s) => return write!(f, "{s:?}"),
            TokenKind::Identifier(name) => return f.write_str(name),
            TokenKind::Def => "def",
            TokenKind::Return => "return",
            TokenKind::Lambda => "lambda",
            TokenKind::With => "with",
            TokenKind::As => "as",
            TokenKind::If => "if",
            TokenKind::Elif => "elif",
            TokenKind::Else => "else",
            TokenKind::Pass => "pass",
            TokenKind::Raise => "raise",
            TokenKind::True => "True",
            TokenKind::False => "False",
            TokenKind::None => "None",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "not",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::StarStar => "**",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::EqEq => "==",
            TokenKind::BangEq => "!=",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::LessEq => "<=",
            TokenKind::GreaterEq => ">=",
            TokenKind::Eq => "=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::Newline => "newline",
            TokenKind::Indent => "indent",
            TokenKind::Dedent => "dedent",
            TokenKind::Eof => "end of file",
        };
        f.write_str(text)
    }
}
