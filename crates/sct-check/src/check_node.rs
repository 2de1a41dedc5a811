//! Node indexing: zoom into the n-th occurrence of a kind of node.

use crate::check_part::{lookup, Messages, PartIndex};
use crate::error::{AuthoringError, CheckResult};
use crate::session::Session;
use crate::state::{Extracted, LineageEntry, State};
use crate::template::{render, Bindings};
use sct_types::ast::*;
use sct_types::parts::{parts_of, Part, PartKey, PartsMap};
use serde_json::Value as Json;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

const MISSING_NODE: &str = "The system wants to check the {{typestr}} but hasn't found it.";
const EXPAND_NODE: &str = "Check the {{typestr}}.";

/// An ordered family of nodes found under a state's student or solution
/// tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSequence {
    /// Statements directly in the current suite.
    Statements,
    /// Function definitions, keyed by name. Nested definitions are not
    /// collected.
    FunctionDefs,
    LambdaFunctions,
    Withs,
    /// Calls, keyed by callee name, each holding every occurrence in
    /// source order.
    FunctionCalls,
}

impl NodeSequence {
    pub fn name(self) -> &'static str {
        match self {
            NodeSequence::Statements => "statements",
            NodeSequence::FunctionDefs => "function_defs",
            NodeSequence::LambdaFunctions => "lambda_functions",
            NodeSequence::Withs => "withs",
            NodeSequence::FunctionCalls => "function_calls",
        }
    }
}

impl FromStr for NodeSequence {
    type Err = AuthoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "statements" => Ok(NodeSequence::Statements),
            "function_defs" => Ok(NodeSequence::FunctionDefs),
            "lambda_functions" => Ok(NodeSequence::LambdaFunctions),
            "withs" => Ok(NodeSequence::Withs),
            "function_calls" => Ok(NodeSequence::FunctionCalls),
            other => Err(AuthoringError::UnknownSequence(other.to_string())),
        }
    }
}

impl fmt::Display for NodeSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Collection
// ══════════════════════════════════════════════════════════════════════════════

/// Nodes found while walking a tree.
#[derive(Default)]
struct Found {
    function_defs: Vec<(String, Node)>,
    lambdas: Vec<Node>,
    withs: Vec<Node>,
    calls: Vec<(String, Node)>,
    in_def: bool,
    in_lambda: bool,
}

impl Found {
    fn of(node: &Node) -> Self {
        let mut found = Found::default();
        match node {
            Node::Module(_) | Node::Block(_) => found.stmts(node.statements()),
            Node::Stmt(Stmt::FunctionDef(def)) => {
                found.params(&def.params);
                found.stmts(&def.body.stmts);
            }
            Node::Stmt(Stmt::With(with)) => {
                for item in &with.items {
                    found.expr(&item.context);
                }
                found.stmts(&with.body.stmts);
            }
            Node::Stmt(stmt) => found.stmt(stmt),
            Node::Expr(expr) => match &expr.kind {
                ExprKind::Lambda(lambda) => {
                    found.params(&lambda.params);
                    found.expr(&lambda.body);
                }
                _ => found.expr(expr),
            },
            Node::WithItem(item) => found.expr(&item.context),
            Node::Param(param) => {
                if let Some(default) = &param.default {
                    found.expr(default);
                }
            }
        }
        found
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::FunctionDef(def) => {
                if !self.in_def {
                    self.function_defs
                        .push((def.name.name.clone(), Node::Stmt(stmt.clone())));
                }
                self.params(&def.params);
                let outer = std::mem::replace(&mut self.in_def, true);
                self.stmts(&def.body.stmts);
                self.in_def = outer;
            }
            Stmt::With(with) => {
                self.withs.push(Node::Stmt(stmt.clone()));
                for item in &with.items {
                    self.expr(&item.context);
                }
                self.stmts(&with.body.stmts);
            }
            Stmt::If(stmt) => {
                self.expr(&stmt.test);
                self.stmts(&stmt.body.stmts);
                if let Some(orelse) = &stmt.orelse {
                    self.stmts(&orelse.stmts);
                }
            }
            Stmt::Return(ReturnStmt { value: Some(e), .. })
            | Stmt::Raise(RaiseStmt { exc: Some(e), .. }) => self.expr(e),
            Stmt::Assign(assign) => self.expr(&assign.value),
            Stmt::Expr(stmt) => self.expr(&stmt.expr),
            Stmt::Return(_) | Stmt::Raise(_) | Stmt::Pass(_) => {}
        }
    }

    fn params(&mut self, params: &Params) {
        let all = params
            .positional
            .iter()
            .chain(params.vararg.iter())
            .chain(params.kwarg.iter());
        for default in all.filter_map(|p| p.default.as_ref()) {
            self.expr(default);
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::NoneLit
            | ExprKind::Name(_) => {}
            ExprKind::List(items) | ExprKind::Tuple(items) => {
                for item in items {
                    self.expr(item);
                }
            }
            ExprKind::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            ExprKind::Unary { operand, .. } => self.expr(operand),
            ExprKind::Call(call) => {
                if let Some(name) = call.callee_name() {
                    self.calls.push((name, Node::Expr(expr.clone())));
                }
                self.expr(&call.func);
                for arg in &call.args {
                    self.expr(arg);
                }
                for keyword in &call.keywords {
                    self.expr(&keyword.value);
                }
            }
            ExprKind::Attribute { value, .. } => self.expr(value),
            ExprKind::Lambda(lambda) => {
                if !self.in_lambda {
                    self.lambdas.push(Node::Expr(expr.clone()));
                }
                self.params(&lambda.params);
                let outer = std::mem::replace(&mut self.in_lambda, true);
                self.expr(&lambda.body);
                self.in_lambda = outer;
            }
            ExprKind::IfExp { test, body, orelse } => {
                self.expr(body);
                self.expr(test);
                self.expr(orelse);
            }
        }
    }
}

/// An indexed node, blaming itself.
fn element(node: Node) -> Part {
    Part::Named(parts_of(&node).highlight(node))
}

/// The addressable sequence `seq` under `node`.
pub(crate) fn sequence(node: &Node, seq: NodeSequence) -> Part {
    match seq {
        NodeSequence::Statements => {
            let stmts = node.statements().iter().cloned().map(Node::Stmt);
            Part::Ordered(stmts.map(element).collect())
        }
        NodeSequence::FunctionDefs => {
            let mut map = PartsMap::default();
            for (name, def) in Found::of(node).function_defs {
                map.entries.insert(PartKey::Name(name), element(def));
            }
            Part::Named(map)
        }
        NodeSequence::LambdaFunctions => {
            Part::Ordered(Found::of(node).lambdas.into_iter().map(element).collect())
        }
        NodeSequence::Withs => Part::Ordered(Found::of(node).withs.into_iter().map(element).collect()),
        NodeSequence::FunctionCalls => {
            let mut map = PartsMap::default();
            for (name, call) in Found::of(node).calls {
                let entry = map
                    .entries
                    .entry(PartKey::Name(name))
                    .or_insert_with(|| Part::Ordered(Vec::new()));
                if let Part::Ordered(calls) = entry {
                    calls.push(element(call));
                }
            }
            Part::Named(map)
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Indexing
// ══════════════════════════════════════════════════════════════════════════════

impl State {
    /// Zoom into element `index` of `seq` on both sides.
    ///
    /// `typestr` describes the node and may use `{{ordinal}}`, `{{index}}`
    /// and `{{name}}`.
    pub fn check_node(
        &self,
        session: &mut Session,
        seq: NodeSequence,
        index: impl Into<PartIndex>,
        typestr: &str,
        messages: &Messages,
    ) -> CheckResult<State> {
        let index = index.into();
        let mut bindings = Bindings::new();
        bindings.insert("ordinal".to_string(), Json::String(index.ordinal()));
        bindings.insert("index".to_string(), index.to_json());
        bindings.insert("name".to_string(), Json::String(seq.name().to_string()));
        let typestr = render(typestr, &bindings)?;
        bindings.insert("typestr".to_string(), Json::String(typestr));

        let described = || format!("{seq}{:?}", index.keys());
        let solution_seq = sequence(&self.solution, seq);
        let solution = lookup(&solution_seq, index.keys())
            .ok()
            .and_then(Extracted::from_part)
            .ok_or_else(|| AuthoringError::MissingSolutionPart(described()))?;

        let student_seq = sequence(&self.student, seq);
        let student = match lookup(&student_seq, index.keys())
            .ok()
            .and_then(Extracted::from_part)
        {
            Some(student) => student,
            None => {
                debug!(node = %described(), "student node missing");
                let message = self.build_message(messages.missing_or(MISSING_NODE), &bindings)?;
                return Err(session.fail(self.feedback(message)));
            }
        };

        debug!(node = %described(), "indexed node");
        let entry = LineageEntry::new(messages.expand_or(EXPAND_NODE), bindings);
        Ok(self.to_child(student, solution, entry))
    }

    /// Zoom into the definition of the function called `name`.
    pub fn check_function_def(
        &self,
        session: &mut Session,
        name: &str,
        messages: &Messages,
    ) -> CheckResult<State> {
        let messages = Messages {
            missing: Some(messages.missing_or("Did you define `{{index}}()`?").to_string()),
            expand: messages.expand.clone(),
        };
        self.check_node(
            session,
            NodeSequence::FunctionDefs,
            name,
            "definition of `{{index}}()`",
            &messages,
        )
    }

    /// Zoom into the `index`-th lambda function.
    pub fn check_lambda_function(
        &self,
        session: &mut Session,
        index: usize,
        messages: &Messages,
    ) -> CheckResult<State> {
        let messages = Messages {
            missing: Some(messages.missing_or("Did you define the {{typestr}}?").to_string()),
            expand: messages.expand.clone(),
        };
        self.check_node(
            session,
            NodeSequence::LambdaFunctions,
            index,
            "{{ordinal}} lambda function",
            &messages,
        )
    }

    /// Zoom into the `index`-th `with` statement.
    pub fn check_with(
        &self,
        session: &mut Session,
        index: usize,
        messages: &Messages,
    ) -> CheckResult<State> {
        self.check_node(
            session,
            NodeSequence::Withs,
            index,
            "{{ordinal}} `with` statement",
            messages,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sct_types::Span;

    fn name(n: &str) -> Expr {
        Expr::new(ExprKind::Name(n.into()), Span::point(1, 1))
    }

    fn call(f: &str, args: Vec<Expr>) -> Expr {
        Expr::new(
            ExprKind::Call(Call {
                func: Box::new(name(f)),
                args,
                keywords: Vec::new(),
            }),
            Span::point(1, 1),
        )
    }

    fn expr_stmt(expr: Expr) -> Stmt {
        Stmt::Expr(ExprStmt {
            expr,
            span: Span::point(1, 1),
        })
    }

    #[test]
    fn test_sequence_names_round_trip() {
        for seq in [
            NodeSequence::Statements,
            NodeSequence::FunctionDefs,
            NodeSequence::LambdaFunctions,
            NodeSequence::Withs,
            NodeSequence::FunctionCalls,
        ] {
            assert_eq!(seq.name().parse::<NodeSequence>(), Ok(seq));
        }
        assert_eq!(
            "loops".parse::<NodeSequence>(),
            Err(AuthoringError::UnknownSequence("loops".into()))
        );
    }

    #[test]
    fn test_calls_grouped_by_callee_in_source_order() {
        let block = Node::Block(Block {
            stmts: vec![
                expr_stmt(call("print", vec![call("len", vec![name("a")])])),
                expr_stmt(call("print", vec![name("b")])),
            ],
            span: Span::point(1, 1),
        });
        let calls = sequence(&block, NodeSequence::FunctionCalls);
        let prints = calls.get(&"print".into()).expect("print calls");
        assert_eq!(prints.len(), 2);
        let second = prints.get(&PartKey::Index(1)).and_then(Part::node).expect("node");
        assert_eq!(second.to_string(), "print(b)");
        assert_eq!(calls.get(&"len".into()).map(Part::len), Some(1));
    }
}
