//! Feedback message templates.
//!
//! A template is plain text with `{{ expr }}` placeholders. Expressions
//! support names, dotted field access, `[index]`, string and integer
//! literals, `+`, `==`, `!=`, `not`, `and`, `or` and the conditional
//! `a if cond else b`, evaluated against a set of JSON bindings.
//!
//! Referencing a binding that does not exist is a [`TemplateError`], never
//! an empty string.

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Named values a template is rendered against.
pub type Bindings = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template references undefined binding '{0}'")]
    Undefined(String),
    #[error("template syntax error in `{template}`: {reason}")]
    Syntax { template: String, reason: String },
    #[error("template type error: {0}")]
    Type(String),
}

/// Render `template` against `bindings`.
pub fn render(template: &str, bindings: &Bindings) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = placeholder_end(after).ok_or_else(|| TemplateError::Syntax {
            template: template.to_string(),
            reason: "unclosed '{{'".to_string(),
        })?;
        let expr = ExprParser::parse(&after[..end]).map_err(|reason| TemplateError::Syntax {
            template: template.to_string(),
            reason,
        })?;
        out.push_str(&display(&expr.eval(bindings)?));
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Byte offset of the `}}` closing a placeholder body. Braces inside
/// string literals do not count.
fn placeholder_end(body: &str) -> Option<usize> {
    let mut quote = None;
    let mut chars = body.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match (quote, c) {
            (Some(_), '\\') => {
                chars.next();
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '}') if matches!(chars.peek(), Some((_, '}'))) => return Some(i),
            (None, _) => {}
        }
    }
    None
}

/// Text form of a value inside rendered output.
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => repr(other),
    }
}

fn repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{s}'"),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(repr).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(fields) => {
            let fields: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("'{k}': {}", repr(v)))
                .collect();
            format!("{{{}}}", fields.join(", "))
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Str(String),
    Int(i64),
    Name(String),
    Dot,
    Plus,
    EqEq,
    NotEq,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '\'' | '"' => {
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some((_, ch)) if ch == c => break,
                        Some((_, '\\')) => match chars.next() {
                            Some((_, 'n')) => text.push('\n'),
                            Some((_, ch)) => text.push(ch),
                            None => return Err("unterminated string".to_string()),
                        },
                        Some((_, ch)) => text.push(ch),
                        None => return Err("unterminated string".to_string()),
                    }
                }
                tokens.push(Token::Str(text));
            }
            '0'..='9' => {
                let mut end = i + 1;
                while let Some((j, d)) = chars.peek().copied() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    end = j + 1;
                    chars.next();
                }
                let n = source[i..end]
                    .parse()
                    .map_err(|_| format!("invalid number '{}'", &source[i..end]))?;
                tokens.push(Token::Int(n));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = i + c.len_utf8();
                while let Some((j, d)) = chars.peek().copied() {
                    if !(d.is_alphanumeric() || d == '_') {
                        break;
                    }
                    end = j + d.len_utf8();
                    chars.next();
                }
                tokens.push(Token::Name(source[i..end].to_string()));
            }
            '.' => tokens.push(Token::Dot),
            '+' => tokens.push(Token::Plus),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '[' => tokens.push(Token::LBracket),
            ']' => tokens.push(Token::RBracket),
            '=' | '!' if chars.peek().is_some_and(|(_, n)| *n == '=') => {
                chars.next();
                tokens.push(if c == '=' { Token::EqEq } else { Token::NotEq });
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Var(String),
    Field(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    NotEq(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cond {
        test: Box<Expr>,
        then: Box<Expr>,
        orelse: Box<Expr>,
    },
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser {
    fn parse(source: &str) -> Result<Expr, String> {
        let mut parser = ExprParser {
            tokens: tokenize(source)?,
            pos: 0,
        };
        if parser.tokens.is_empty() {
            return Err("empty placeholder".to_string());
        }
        let expr = parser.conditional()?;
        match parser.tokens.get(parser.pos) {
            None => Ok(expr),
            Some(token) => Err(format!("unexpected {token:?}")),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.eat(&Token::Name(keyword.to_string()))
    }

    fn expect(&mut self, token: &Token) -> Result<(), String> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(format!("expected {token:?}"))
        }
    }

    fn conditional(&mut self) -> Result<Expr, String> {
        let then = self.or()?;
        if !self.eat_keyword("if") {
            return Ok(then);
        }
        let test = self.or()?;
        if !self.eat_keyword("else") {
            return Err("conditional without 'else'".to_string());
        }
        let orelse = self.conditional()?;
        Ok(Expr::Cond {
            test: Box::new(test),
            then: Box::new(then),
            orelse: Box::new(orelse),
        })
    }

    fn or(&mut self) -> Result<Expr, String> {
        let mut left = self.and()?;
        while self.eat_keyword("or") {
            left = Expr::Or(Box::new(left), Box::new(self.and()?));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, String> {
        let mut left = self.not()?;
        while self.eat_keyword("and") {
            left = Expr::And(Box::new(left), Box::new(self.not()?));
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Expr, String> {
        if self.eat_keyword("not") {
            return Ok(Expr::Not(Box::new(self.not()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, String> {
        let left = self.sum()?;
        if self.eat(&Token::EqEq) {
            return Ok(Expr::Eq(Box::new(left), Box::new(self.sum()?)));
        }
        if self.eat(&Token::NotEq) {
            return Ok(Expr::NotEq(Box::new(left), Box::new(self.sum()?)));
        }
        Ok(left)
    }

    fn sum(&mut self) -> Result<Expr, String> {
        let mut left = self.postfix()?;
        while self.eat(&Token::Plus) {
            left = Expr::Add(Box::new(left), Box::new(self.postfix()?));
        }
        Ok(left)
    }

    fn postfix(&mut self) -> Result<Expr, String> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                match self.tokens.get(self.pos).cloned() {
                    Some(Token::Name(field)) => {
                        self.pos += 1;
                        expr = Expr::Field(Box::new(expr), field);
                    }
                    _ => return Err("expected a field name after '.'".to_string()),
                }
            } else if self.eat(&Token::LBracket) {
                let index = self.conditional()?;
                self.expect(&Token::RBracket)?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| "unexpected end of placeholder".to_string())?;
        self.pos += 1;
        match token {
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Int(n) => Ok(Expr::Literal(Value::from(n))),
            Token::Name(name) => Ok(match name.as_str() {
                "true" | "True" => Expr::Literal(Value::Bool(true)),
                "false" | "False" => Expr::Literal(Value::Bool(false)),
                "none" | "None" => Expr::Literal(Value::Null),
                _ => Expr::Var(name),
            }),
            Token::LParen => {
                let inner = self.conditional()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            other => Err(format!("unexpected {other:?}")),
        }
    }
}

impl Expr {
    fn eval(&self, bindings: &Bindings) -> Result<Value, TemplateError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Var(name) => bindings
                .get(name)
                .cloned()
                .ok_or_else(|| TemplateError::Undefined(name.clone())),
            Expr::Field(object, field) => match object.eval(bindings)? {
                Value::Object(mut fields) => fields
                    .remove(field)
                    .ok_or_else(|| TemplateError::Undefined(field.clone())),
                other => Err(TemplateError::Type(format!(
                    "{} has no field '{field}'",
                    repr(&other)
                ))),
            },
            Expr::Index(object, index) => {
                let object = object.eval(bindings)?;
                let index = index.eval(bindings)?;
                let found = match (&object, &index) {
                    (Value::Array(items), Value::Number(n)) => n
                        .as_u64()
                        .and_then(|i| usize::try_from(i).ok())
                        .and_then(|i| items.get(i)),
                    (Value::Object(fields), Value::String(key)) => fields.get(key),
                    _ => None,
                };
                found.cloned().ok_or_else(|| {
                    TemplateError::Undefined(format!("{}[{}]", repr(&object), repr(&index)))
                })
            }
            Expr::Add(left, right) => add(left.eval(bindings)?, right.eval(bindings)?),
            Expr::Eq(left, right) => Ok(Value::Bool(left.eval(bindings)? == right.eval(bindings)?)),
            Expr::NotEq(left, right) => {
                Ok(Value::Bool(left.eval(bindings)? != right.eval(bindings)?))
            }
            Expr::Not(inner) => Ok(Value::Bool(!truthy(&inner.eval(bindings)?))),
            Expr::And(left, right) => {
                let left = left.eval(bindings)?;
                if truthy(&left) {
                    right.eval(bindings)
                } else {
                    Ok(left)
                }
            }
            Expr::Or(left, right) => {
                let left = left.eval(bindings)?;
                if truthy(&left) {
                    Ok(left)
                } else {
                    right.eval(bindings)
                }
            }
            Expr::Cond { test, then, orelse } => {
                if truthy(&test.eval(bindings)?) {
                    then.eval(bindings)
                } else {
                    orelse.eval(bindings)
                }
            }
        }
    }
}

fn add(left: Value, right: Value) -> Result<Value, TemplateError> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
        (Value::Array(mut a), Value::Array(b)) => {
            a.extend(b);
            Ok(Value::Array(a))
        }
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x
                .checked_add(y)
                .map(Value::from)
                .ok_or_else(|| TemplateError::Type("integer overflow".to_string())),
            _ => Ok(Value::from(
                a.as_f64().unwrap_or(f64::NAN) + b.as_f64().unwrap_or(f64::NAN),
            )),
        },
        (a, b) => Err(TemplateError::Type(format!(
            "cannot add {} and {}",
            repr(&a),
            repr(&b)
        ))),
    }
}
