//! Program-tree node types.
//!
//! Every node carries a [`Span`]. Recursive expression types are boxed.
//! Nodes print back to source text through `Display`, which is what
//! diagnostics quote when they show a student or solution fragment.

use crate::Span;
use std::fmt;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A complete program.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub body: Block,
    pub span: Span,
}

/// An indented suite of statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    FunctionDef(FunctionDef),
    With(WithStmt),
    If(IfStmt),
    Return(ReturnStmt),
    Raise(RaiseStmt),
    Assign(AssignStmt),
    Expr(ExprStmt),
    Pass(Span),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::FunctionDef(s) => s.span,
            Stmt::With(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Raise(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::Expr(s) => s.span,
            Stmt::Pass(span) => *span,
        }
    }
}

/// `def name(params): body`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Ident,
    pub params: Params,
    pub body: Block,
    pub span: Span,
}

/// A parameter list shared by `def` and `lambda`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Params {
    pub positional: Vec<Param>,
    /// `*args`
    pub vararg: Option<Param>,
    /// `**kwargs`
    pub kwarg: Option<Param>,
}

impl Params {
    /// All bound names, in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.positional
            .iter()
            .chain(self.vararg.iter())
            .chain(self.kwarg.iter())
            .map(|p| p.name.name.clone())
            .collect()
    }
}

/// `name` or `name=default`
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub default: Option<Expr>,
    pub span: Span,
}

/// `with item, item: body`
#[derive(Debug, Clone, PartialEq)]
pub struct WithStmt {
    pub items: Vec<WithItem>,
    pub body: Block,
    pub span: Span,
}

impl WithStmt {
    /// Names bound by all `as` targets, in order.
    pub fn bound_names(&self) -> Vec<String> {
        self.items.iter().flat_map(WithItem::bound_names).collect()
    }
}

/// `context_expr [as target]`
#[derive(Debug, Clone, PartialEq)]
pub struct WithItem {
    pub context: Expr,
    pub target: Option<Target>,
    pub span: Span,
}

impl WithItem {
    pub fn bound_names(&self) -> Vec<String> {
        self.target.as_ref().map(Target::names).unwrap_or_default()
    }
}

/// Assignment or `as` target.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Name(Ident),
    Tuple(Vec<Ident>, Span),
}

impl Target {
    pub fn names(&self) -> Vec<String> {
        match self {
            Target::Name(id) => vec![id.name.clone()],
            Target::Tuple(ids, _) => ids.iter().map(|id| id.name.clone()).collect(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Target::Name(id) => id.span,
            Target::Tuple(_, span) => *span,
        }
    }
}

/// `if test: body [elif ...] [else: orelse]`; `elif` nests another `If`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub test: Expr,
    pub body: Block,
    pub orelse: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaiseStmt {
    pub exc: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub target: Target,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    NoneLit,
    Name(String),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call(Call),
    Attribute {
        value: Box<Expr>,
        attr: Ident,
    },
    Lambda(Box<Lambda>),
    /// `body if test else orelse`
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
}

/// `func(args, name=value)`
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub func: Box<Expr>,
    pub args: Vec<Expr>,
    pub keywords: Vec<Keyword>,
}

impl Call {
    /// The dotted name of the callee, when it is a plain name or attribute chain.
    pub fn callee_name(&self) -> Option<String> {
        fn dotted(expr: &Expr) -> Option<String> {
            match &expr.kind {
                ExprKind::Name(name) => Some(name.clone()),
                ExprKind::Attribute { value, attr } => {
                    Some(format!("{}.{}", dotted(value)?, attr.name))
                }
                _ => None,
            }
        }
        dotted(&self.func)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub name: Ident,
    pub value: Expr,
    pub span: Span,
}

/// `lambda params: body`
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub params: Params,
    pub body: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    And,
    Or,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Less => "<",
            BinOp::Greater => ">",
            BinOp::LessEq => "<=",
            BinOp::GreaterEq => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq
            | BinOp::NotEq
            | BinOp::Less
            | BinOp::Greater
            | BinOp::LessEq
            | BinOp::GreaterEq => 4,
            BinOp::Add | BinOp::Sub => 5,
            BinOp::Mul | BinOp::Div | BinOp::Mod => 6,
            BinOp::Pow => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

// ══════════════════════════════════════════════════════════════════════════════
// Node
// ══════════════════════════════════════════════════════════════════════════════

/// Any node that can be the focus of a traversal step.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Module(Module),
    Block(Block),
    Stmt(Stmt),
    Expr(Expr),
    WithItem(WithItem),
    Param(Param),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Module(m) => m.span,
            Node::Block(b) => b.span,
            Node::Stmt(s) => s.span(),
            Node::Expr(e) => e.span,
            Node::WithItem(i) => i.span,
            Node::Param(p) => p.span,
        }
    }

    /// Short node-kind label, e.g. `function_def` or `call`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Module(_) => "module",
            Node::Block(_) => "block",
            Node::Stmt(stmt) => match stmt {
                Stmt::FunctionDef(_) => "function_def",
                Stmt::With(_) => "with",
                Stmt::If(_) => "if",
                Stmt::Return(_) => "return",
                Stmt::Raise(_) => "raise",
                Stmt::Assign(_) => "assign",
                Stmt::Expr(_) => "expr_stmt",
                Stmt::Pass(_) => "pass",
            },
            Node::Expr(expr) => match &expr.kind {
                ExprKind::Call(_) => "call",
                ExprKind::Lambda(_) => "lambda",
                ExprKind::Name(_) => "name",
                _ => "expr",
            },
            Node::WithItem(_) => "with_item",
            Node::Param(_) => "param",
        }
    }

    /// The statements directly contained in this node, if it has a suite.
    pub fn statements(&self) -> &[Stmt] {
        match self {
            Node::Module(m) => &m.body.stmts,
            Node::Block(b) => &b.stmts,
            Node::Stmt(Stmt::FunctionDef(def)) => &def.body.stmts,
            Node::Stmt(Stmt::With(with)) => &with.body.stmts,
            Node::Stmt(Stmt::If(stmt)) => &stmt.body.stmts,
            _ => &[],
        }
    }

    pub fn as_function_def(&self) -> Option<&FunctionDef> {
        match self {
            Node::Stmt(Stmt::FunctionDef(def)) => Some(def),
            _ => None,
        }
    }

    pub fn as_lambda(&self) -> Option<&Lambda> {
        match self {
            Node::Expr(Expr {
                kind: ExprKind::Lambda(lambda),
                ..
            }) => Some(lambda.as_ref()),
            _ => None,
        }
    }
}

impl From<Stmt> for Node {
    fn from(stmt: Stmt) -> Self {
        Node::Stmt(stmt)
    }
}

impl From<Expr> for Node {
    fn from(expr: Expr) -> Self {
        Node::Expr(expr)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Source rendering
// ══════════════════════════════════════════════════════════════════════════════

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_block(f: &mut fmt::Formatter<'_>, block: &Block, indent: usize) -> fmt::Result {
    for stmt in &block.stmts {
        write_stmt(f, stmt, indent)?;
    }
    Ok(())
}

fn write_stmt(f: &mut fmt::Formatter<'_>, stmt: &Stmt, indent: usize) -> fmt::Result {
    let pad = "    ".repeat(indent);
    match stmt {
        Stmt::FunctionDef(def) => {
            writeln!(f, "{pad}def {}({}):", def.name.name, def.params)?;
            write_block(f, &def.body, indent + 1)
        }
        Stmt::With(with) => {
            write!(f, "{pad}with ")?;
            write_joined(f, &with.items)?;
            writeln!(f, ":")?;
            write_block(f, &with.body, indent + 1)
        }
        Stmt::If(stmt) => {
            writeln!(f, "{pad}if {}:", stmt.test)?;
            write_block(f, &stmt.body, indent + 1)?;
            if let Some(orelse) = &stmt.orelse {
                writeln!(f, "{pad}else:")?;
                write_block(f, orelse, indent + 1)?;
            }
            Ok(())
        }
        Stmt::Return(ret) => match &ret.value {
            Some(value) => writeln!(f, "{pad}return {value}"),
            None => writeln!(f, "{pad}return"),
        },
        Stmt::Raise(raise) => match &raise.exc {
            Some(exc) => writeln!(f, "{pad}raise {exc}"),
            None => writeln!(f, "{pad}raise"),
        },
        Stmt::Assign(assign) => writeln!(f, "{pad}{} = {}", assign.target, assign.value),
        Stmt::Expr(stmt) => writeln!(f, "{pad}{}", stmt.expr),
        Stmt::Pass(_) => writeln!(f, "{pad}pass"),
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_block(f, &self.body, 0)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_block(f, self, 0)
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_stmt(f, self, 0)
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.positional.iter().map(|p| p.to_string()).collect();
        if let Some(vararg) = &self.vararg {
            parts.push(format!("*{}", vararg.name.name));
        }
        if let Some(kwarg) = &self.kwarg {
            parts.push(format!("**{}", kwarg.name.name));
        }
        f.write_str(&parts.join(", "))
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.default {
            Some(default) => write!(f, "{}={}", self.name.name, default),
            None => f.write_str(&self.name.name),
        }
    }
}

impl fmt::Display for WithItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.context)?;
        if let Some(target) = &self.target {
            write!(f, " as {target}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Name(id) => f.write_str(&id.name),
            Target::Tuple(ids, _) => {
                let names: Vec<&str> = ids.iter().map(|id| id.name.as_str()).collect();
                write!(f, "({})", names.join(", "))
            }
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name.name, self.value)
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.func.kind {
            ExprKind::Lambda(_) => write!(f, "({})", self.func)?,
            _ => write!(f, "{}", self.func)?,
        }
        write!(f, "({})", self.arguments())
    }
}

impl Call {
    /// The argument list as source text, without the parentheses.
    pub fn arguments(&self) -> String {
        self.args
            .iter()
            .map(|a| a.to_string())
            .chain(self.keywords.iter().map(|k| k.to_string()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Render `expr`, parenthesized when it binds looser than `min`.
fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, min: u8) -> fmt::Result {
    let precedence = match &expr.kind {
        ExprKind::Binary { op, .. } => op.precedence(),
        ExprKind::Lambda(_) | ExprKind::IfExp { .. } => 0,
        ExprKind::Unary {
            op: UnaryOp::Not, ..
        } => 3,
        _ => u8::MAX,
    };
    if precedence < min {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Int(n) => write!(f, "{n}"),
            ExprKind::Float(n) => write!(f, "{n:?}"),
            ExprKind::Str(s) => write!(f, "{s:?}"),
            ExprKind::Bool(true) => f.write_str("True"),
            ExprKind::Bool(false) => f.write_str("False"),
            ExprKind::NoneLit => f.write_str("None"),
            ExprKind::Name(name) => f.write_str(name),
            ExprKind::List(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
            ExprKind::Tuple(items) => {
                f.write_str("(")?;
                write_joined(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            ExprKind::Binary { left, op, right } => {
                let (lhs, rhs) = match op {
                    BinOp::Pow => (op.precedence() + 1, op.precedence()),
                    _ => (op.precedence(), op.precedence() + 1),
                };
                write_operand(f, left, lhs)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right, rhs)
            }
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand,
            } => {
                f.write_str("-")?;
                write_operand(f, operand, 7)
            }
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                f.write_str("not ")?;
                write_operand(f, operand, 3)
            }
            ExprKind::Call(call) => write!(f, "{call}"),
            ExprKind::Attribute { value, attr } => write!(f, "{value}.{}", attr.name),
            ExprKind::Lambda(lambda) => {
                if lambda.params.names().is_empty() {
                    write!(f, "lambda: {}", lambda.body)
                } else {
                    write!(f, "lambda {}: {}", lambda.params, lambda.body)
                }
            }
            ExprKind::IfExp { test, body, orelse } => {
                write!(f, "{body} if {test} else {orelse}")
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Module(m) => write!(f, "{}", m.to_string().trim_end()),
            Node::Block(b) => write!(f, "{}", b.to_string().trim_end()),
            Node::Stmt(s) => write!(f, "{}", s.to_string().trim_end()),
            Node::Expr(e) => write!(f, "{e}"),
            Node::WithItem(i) => write!(f, "{i}"),
            Node::Param(p) => write!(f, "{p}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp() -> Span {
        Span::point(1, 1)
    }

    fn name(n: &str) -> Expr {
        Expr::new(ExprKind::Name(n.into()), sp())
    }

    fn int(n: i64) -> Expr {
        Expr::new(ExprKind::Int(n), sp())
    }

    #[test]
    fn test_render_call_with_keywords() {
        let call = Expr::new(
            ExprKind::Call(Call {
                func: Box::new(name("my_power")),
                args: vec![int(3)],
                keywords: vec![Keyword {
                    name: Ident::new("base", sp()),
                    value: int(2),
                    span: sp(),
                }],
            }),
            sp(),
        );
        assert_eq!(call.to_string(), "my_power(3, base=2)");
    }

    #[test]
    fn test_render_function_def() {
        let def = Stmt::FunctionDef(FunctionDef {
            name: Ident::new("square", sp()),
            params: Params {
                positional: vec![Param {
                    name: Ident::new("x", sp()),
                    default: None,
                    span: sp(),
                }],
                vararg: None,
                kwarg: None,
            },
            body: Block {
                stmts: vec![Stmt::Return(ReturnStmt {
                    value: Some(Expr::new(
                        ExprKind::Binary {
                            left: Box::new(name("x")),
                            op: BinOp::Mul,
                            right: Box::new(name("x")),
                        },
                        sp(),
                    )),
                    span: sp(),
                })],
                span: sp(),
            },
            span: sp(),
        });
        assert_eq!(
            Node::Stmt(def).to_string(),
            "def square(x):\n    return x * x"
        );
    }

    #[test]
    fn test_render_literals() {
        assert_eq!(Expr::new(ExprKind::Float(2.0), sp()).to_string(), "2.0");
        assert_eq!(Expr::new(ExprKind::Str("hi".into()), sp()).to_string(), "\"hi\"");
        assert_eq!(
            Expr::new(ExprKind::Tuple(vec![int(1)]), sp()).to_string(),
            "(1,)"
        );
    }

    #[test]
    fn test_callee_name_dotted() {
        let call = Call {
            func: Box::new(Expr::new(
                ExprKind::Attribute {
                    value: Box::new(name("np")),
                    attr: Ident::new("mean", sp()),
                },
                sp(),
            )),
            args: vec![],
            keywords: vec![],
        };
        assert_eq!(call.callee_name().as_deref(), Some("np.mean"));
    }
}
