//! Runtime values produced by an execution environment.

use crate::ast::{Block, Expr, Params};
use crate::process::RaisedError;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A runtime value.
///
/// `Display` renders the value the way the checked language's `repr`
/// would; [`Value::to_str`] gives the `str` form used by `print`.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Function(Rc<Function>),
    /// A builtin function, by name.
    Builtin(&'static str),
    ContextManager(Rc<ContextManager>),
    Exception(RaisedError),
}

/// A user-defined function or lambda closed over its defining scope.
#[derive(Debug, Clone)]
pub struct Function {
    /// `<lambda>` for anonymous functions.
    pub name: String,
    pub params: Params,
    /// Evaluated defaults, aligned with `params.positional`.
    pub defaults: Vec<Option<Value>>,
    pub body: FunctionBody,
    /// Non-global bindings visible where the function was defined.
    pub captured: BTreeMap<String, Value>,
}

#[derive(Debug, Clone)]
pub enum FunctionBody {
    Block(Block),
    Expr(Expr),
}

/// An object usable in a `with` statement.
#[derive(Debug, Clone)]
pub struct ContextManager {
    pub label: String,
    /// What entering the context yields.
    pub value: Value,
    /// When set, exiting the context raises this error.
    pub exit_error: Option<RaisedError>,
}

impl ContextManager {
    pub fn new(label: impl Into<String>, value: Value) -> Self {
        Self {
            label: label.into(),
            value,
            exit_error: None,
        }
    }

    pub fn failing_on_exit(mut self, error: RaisedError) -> Self {
        self.exit_error = Some(error);
        self
    }
}

impl Value {
    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::ContextManager(_) => "context_manager",
            Value::Exception(e) => &e.kind,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) | Value::Tuple(items) => !items.is_empty(),
            _ => true,
        }
    }

    /// The `str()` form: strings unquoted, everything else as `repr`.
    pub fn to_str(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Exception(e) => e.message.clone(),
            other => other.to_string(),
        }
    }

    /// Numeric view, for mixed int/float arithmetic.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::ContextManager(a), Value::ContextManager(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Exception(a), Value::Exception(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

fn repr_str(s: &str) -> String {
    if s.contains('\'') && !s.contains('"') {
        format!("\"{s}\"")
    } else {
        format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'").replace('\n', "\\n"))
    }
}

fn repr_float(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 {
        format!("{n:.1}")
    } else if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        format!("{n}")
    }
}

fn repr_items(items: &[Value]) -> String {
    items
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => f.write_str(&repr_float(*n)),
            Value::Str(s) => f.write_str(&repr_str(s)),
            Value::List(items) => write!(f, "[{}]", repr_items(items)),
            Value::Tuple(items) if items.len() == 1 => write!(f, "({},)", items[0]),
            Value::Tuple(items) => write!(f, "({})", repr_items(items)),
            Value::Function(func) => write!(f, "<function {}>", func.name),
            Value::Builtin(name) => write!(f, "<built-in function {name}>"),
            Value::ContextManager(cm) => write!(f, "<context manager {}>", cm.label),
            Value::Exception(e) => write!(f, "{}({})", e.kind, repr_str(&e.message)),
        }
    }
}
