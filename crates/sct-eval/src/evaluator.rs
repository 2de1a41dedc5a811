//! Core expression and statement evaluator.

use crate::env::Environment;
use crate::error::{EvalError, EvalResult};
use sct_types::ast::*;
use sct_types::process::{ContextError, Evaluation, ExecutionEnvironment, RaisedError};
use sct_types::value::{ContextManager, Function, FunctionBody, Value};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::debug;

/// Default step budget per `run` / `evaluate` call.
pub const DEFAULT_STEP_LIMIT: u64 = 100_000;

/// Maximum nesting of user-function calls.
const MAX_CALL_DEPTH: usize = 64;

/// Names bound to builtin functions.
pub const BUILTINS: &[&str] = &[
    "print",
    "len",
    "str",
    "int",
    "abs",
    "ValueError",
    "TypeError",
    "Exception",
    "resource",
];

/// One `enter_context` call: the managers entered, in order, and the
/// bindings their targets shadowed.
#[derive(Debug, Default)]
struct ContextBatch {
    managers: Vec<Rc<ContextManager>>,
    shadowed: Vec<(String, Option<Value>)>,
}

/// The tree-walking interpreter: one isolated runtime.
pub struct Interpreter {
    env: Environment,
    /// Output written by `print` during the current call.
    stdout: String,
    steps: u64,
    step_limit: u64,
    contexts: Vec<ContextBatch>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_step_limit(DEFAULT_STEP_LIMIT)
    }

    pub fn with_step_limit(step_limit: u64) -> Self {
        Self {
            env: Environment::new(),
            stdout: String::new(),
            steps: 0,
            step_limit,
            contexts: Vec::new(),
        }
    }

    /// A fresh interpreter that has already run `module`.
    pub fn from_module(module: &Module) -> Result<Self, RaisedError> {
        let mut interp = Self::new();
        match interp.run(module).error {
            Some(error) => Err(error),
            None => Ok(interp),
        }
    }

    /// Inject a global binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.env.define(name, value);
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.env.globals().get(name)
    }

    fn tick(&mut self) -> EvalResult<()> {
        self.steps += 1;
        if self.steps > self.step_limit {
            Err(EvalError::StepLimitExceeded)
        } else {
            Ok(())
        }
    }

    fn reset(&mut self) {
        self.stdout.clear();
        self.steps = 0;
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    pub fn exec_block(&mut self, block: &Block) -> EvalResult<()> {
        for stmt in &block.stmts {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    pub fn exec_stmt(&mut self, stmt: &Stmt) -> EvalResult<()> {
        self.tick()?;
        match stmt {
            Stmt::FunctionDef(def) => {
                let defaults = self.eval_defaults(&def.params)?;
                let function = Function {
                    name: def.name.name.clone(),
                    params: def.params.clone(),
                    defaults,
                    body: FunctionBody::Block(def.body.clone()),
                    captured: self.env.capture(),
                };
                self.env
                    .define(&def.name.name, Value::Function(Rc::new(function)));
                Ok(())
            }
            Stmt::With(with) => self.exec_with(with),
            Stmt::If(stmt) => {
                if self.eval_expr(&stmt.test)?.is_truthy() {
                    self.exec_block(&stmt.body)
                } else if let Some(orelse) = &stmt.orelse {
                    self.exec_block(orelse)
                } else {
                    Ok(())
                }
            }
            Stmt::Return(ret) => {
                let value = match &ret.value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::None,
                };
                Err(EvalError::Return(value))
            }
            Stmt::Raise(raise) => Err(self.exec_raise(raise)?),
            Stmt::Assign(assign) => {
                let value = self.eval_expr(&assign.value)?;
                self.assign(&assign.target, value)
            }
            Stmt::Expr(stmt) => self.eval_expr(&stmt.expr).map(|_| ()),
            Stmt::Pass(_) => Ok(()),
        }
    }

    /// The error a `raise` statement produces.
    fn exec_raise(&mut self, raise: &RaiseStmt) -> EvalResult<EvalError> {
        let Some(exc) = &raise.exc else {
            return Ok(EvalError::raise(
                "RuntimeError",
                "No active exception to reraise",
            ));
        };
        Ok(match self.eval_expr(exc)? {
            Value::Exception(error) => EvalError::Raised(error),
            Value::Builtin(kind) if is_exception_class(kind) => EvalError::raise(kind, ""),
            _ => EvalError::raise("TypeError", "exceptions must derive from BaseException"),
        })
    }

    fn assign(&mut self, target: &Target, value: Value) -> EvalResult<()> {
        match target {
            Target::Name(id) => {
                self.env.define(&id.name, value);
                Ok(())
            }
            Target::Tuple(ids, _) => {
                let items = unpack(&value, ids.len())
                    .map_err(|message| EvalError::raise("ValueError", message))?;
                for (id, item) in ids.iter().zip(items) {
                    self.env.define(&id.name, item);
                }
                Ok(())
            }
        }
    }

    fn exec_with(&mut self, with: &WithStmt) -> EvalResult<()> {
        let batch = self.enter_items(&with.items).map_err(|err| match err {
            ContextError::Raised(error) => EvalError::Raised(error),
            ContextError::NotAContextManager(type_name) => EvalError::raise(
                "TypeError",
                format!("'{type_name}' object does not support the context manager protocol"),
            ),
            ContextError::TargetMismatch(message) => EvalError::raise("ValueError", message),
        })?;
        let body = self.exec_block(&with.body);
        let exit = self.exit_batch(batch);
        body?;
        exit.map_err(EvalError::Raised)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Managed-resource contexts
    // ══════════════════════════════════════════════════════════════════════

    /// Enter every item in order. On failure the items already entered are
    /// exited again and their bindings restored.
    fn enter_items(&mut self, items: &[WithItem]) -> Result<ContextBatch, ContextError> {
        let mut batch = ContextBatch::default();
        for item in items {
            if let Err(err) = self.enter_item(item, &mut batch) {
                let _ = self.exit_batch(batch);
                return Err(err);
            }
        }
        Ok(batch)
    }

    fn enter_item(&mut self, item: &WithItem, batch: &mut ContextBatch) -> Result<(), ContextError> {
        let value = self
            .eval_expr(&item.context)
            .map_err(|err| ContextError::Raised(err.into_raised()))?;
        let manager = match value {
            Value::ContextManager(manager) => manager,
            other => {
                return Err(ContextError::NotAContextManager(
                    other.type_name().to_string(),
                ))
            }
        };
        let bindings = match &item.target {
            None => vec![],
            Some(Target::Name(id)) => vec![(id.name.clone(), manager.value.clone())],
            Some(Target::Tuple(ids, _)) => {
                let items =
                    unpack(&manager.value, ids.len()).map_err(ContextError::TargetMismatch)?;
                ids.iter().map(|id| id.name.clone()).zip(items).collect()
            }
        };
        debug!(context = %manager.label, "entered context");
        batch.managers.push(manager);
        for (name, value) in bindings {
            let previous = self.env.local(&name).cloned();
            batch.shadowed.push((name.clone(), previous));
            self.env.define(&name, value);
        }
        Ok(())
    }

    /// Exit a batch's managers in reverse order and restore what their
    /// targets shadowed. Reports the first exit failure.
    fn exit_batch(&mut self, batch: ContextBatch) -> Result<(), RaisedError> {
        let mut first_error = None;
        for manager in batch.managers.iter().rev() {
            debug!(context = %manager.label, "exiting context");
            if let Some(error) = &manager.exit_error {
                first_error.get_or_insert_with(|| error.clone());
            }
        }
        for (name, previous) in batch.shadowed.into_iter().rev() {
            match previous {
                Some(value) => self.env.define(&name, value),
                None => {
                    self.env.undefine(&name);
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    pub fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        self.tick()?;
        match &expr.kind {
            ExprKind::Int(n) => Ok(Value::Int(*n)),
            ExprKind::Float(n) => Ok(Value::Float(*n)),
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::NoneLit => Ok(Value::None),
            ExprKind::Name(name) => self.eval_name(name),
            ExprKind::List(items) => Ok(Value::List(self.eval_all(items)?)),
            ExprKind::Tuple(items) => Ok(Value::Tuple(self.eval_all(items)?)),
            ExprKind::Binary { left, op, right } => self.eval_binary(left, *op, right),
            ExprKind::Unary { op, operand } => {
                let value = self.eval_expr(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Neg => match value {
                        Value::Int(n) => n.checked_neg().map(Value::Int).ok_or_else(overflow),
                        Value::Float(n) => Ok(Value::Float(-n)),
                        Value::Bool(b) => Ok(Value::Int(-(b as i64))),
                        other => Err(EvalError::raise(
                            "TypeError",
                            format!("bad operand type for unary -: '{}'", other.type_name()),
                        )),
                    },
                }
            }
            ExprKind::Call(call) => self.eval_call(call),
            ExprKind::Attribute { value, attr } => {
                let value = self.eval_expr(value)?;
                Err(EvalError::raise(
                    "AttributeError",
                    format!(
                        "'{}' object has no attribute '{}'",
                        value.type_name(),
                        attr.name
                    ),
                ))
            }
            ExprKind::Lambda(lambda) => {
                let defaults = self.eval_defaults(&lambda.params)?;
                Ok(Value::Function(Rc::new(Function {
                    name: "<lambda>".to_string(),
                    params: lambda.params.clone(),
                    defaults,
                    body: FunctionBody::Expr((*lambda.body).clone()),
                    captured: self.env.capture(),
                })))
            }
            ExprKind::IfExp { test, body, orelse } => {
                if self.eval_expr(test)?.is_truthy() {
                    self.eval_expr(body)
                } else {
                    self.eval_expr(orelse)
                }
            }
        }
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> EvalResult<Vec<Value>> {
        exprs.iter().map(|e| self.eval_expr(e)).collect()
    }

    fn eval_defaults(&mut self, params: &Params) -> EvalResult<Vec<Option<Value>>> {
        params
            .positional
            .iter()
            .map(|p| p.default.as_ref().map(|d| self.eval_expr(d)).transpose())
            .collect()
    }

    fn eval_name(&self, name: &str) -> EvalResult<Value> {
        if let Some(value) = self.env.get(name) {
            return Ok(value.clone());
        }
        match BUILTINS.iter().find(|b| **b == name) {
            Some(builtin) => Ok(Value::Builtin(*builtin)),
            None => Err(EvalError::raise(
                "NameError",
                format!("name '{name}' is not defined"),
            )),
        }
    }

    // ── Operators ────────────────────────────────────────────────────────

    fn eval_binary(&mut self, left: &Expr, op: BinOp, right: &Expr) -> EvalResult<Value> {
        let lv = self.eval_expr(left)?;
        match op {
            BinOp::And if !lv.is_truthy() => return Ok(lv),
            BinOp::Or if lv.is_truthy() => return Ok(lv),
            BinOp::And | BinOp::Or => return self.eval_expr(right),
            _ => {}
        }
        let rv = self.eval_expr(right)?;
        match op {
            BinOp::Eq => Ok(Value::Bool(lv == rv)),
            BinOp::NotEq => Ok(Value::Bool(lv != rv)),
            BinOp::Less | BinOp::Greater | BinOp::LessEq | BinOp::GreaterEq => {
                compare(&lv, op, &rv)
            }
            _ => arithmetic(&lv, op, &rv),
        }
    }

    // ── Calls ────────────────────────────────────────────────────────────

    fn eval_call(&mut self, call: &Call) -> EvalResult<Value> {
        let func = self.eval_expr(&call.func)?;
        let args = self.eval_all(&call.args)?;
        let mut kwargs = Vec::with_capacity(call.keywords.len());
        for keyword in &call.keywords {
            kwargs.push((keyword.name.name.clone(), self.eval_expr(&keyword.value)?));
        }
        match func {
            Value::Function(function) => self.call_function(&function, args, kwargs),
            Value::Builtin(name) => self.call_builtin(name, args, kwargs),
            other => Err(EvalError::raise(
                "TypeError",
                format!("'{}' object is not callable", other.type_name()),
            )),
        }
    }

    fn call_function(
        &mut self,
        function: &Function,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> EvalResult<Value> {
        if self.env.depth() >= MAX_CALL_DEPTH {
            return Err(EvalError::raise(
                "RecursionError",
                "maximum recursion depth exceeded",
            ));
        }
        let mut frame = function.captured.clone();
        frame.extend(bind_arguments(function, args, kwargs)?);
        self.env.enter_frame(frame);
        let result = match &function.body {
            FunctionBody::Block(block) => match self.exec_block(block) {
                Ok(()) => Ok(Value::None),
                Err(EvalError::Return(value)) => Ok(value),
                Err(err) => Err(err),
            },
            FunctionBody::Expr(expr) => self.eval_expr(expr),
        };
        self.env.leave_frame();
        result
    }

    fn call_builtin(
        &mut self,
        name: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> EvalResult<Value> {
        if name == "print" {
            return self.builtin_print(args, kwargs);
        }
        if let Some((key, _)) = kwargs.first() {
            return Err(EvalError::raise(
                "TypeError",
                format!("{name}() got an unexpected keyword argument '{key}'"),
            ));
        }
        if is_exception_class(name) {
            let message = args.first().map(Value::to_str).unwrap_or_default();
            return Ok(Value::Exception(RaisedError::new(name, message)));
        }
        let [arg] = <[Value; 1]>::try_from(args).map_err(|args| {
            EvalError::raise(
                "TypeError",
                format!("{name}() takes exactly one argument ({} given)", args.len()),
            )
        })?;
        match name {
            "len" => match &arg {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::List(items) | Value::Tuple(items) => Ok(Value::Int(items.len() as i64)),
                other => Err(EvalError::raise(
                    "TypeError",
                    format!("object of type '{}' has no len()", other.type_name()),
                )),
            },
            "str" => Ok(Value::Str(arg.to_str())),
            "int" => to_int(&arg),
            "abs" => match arg {
                Value::Int(n) => n.checked_abs().map(Value::Int).ok_or_else(overflow),
                Value::Float(n) => Ok(Value::Float(n.abs())),
                Value::Bool(b) => Ok(Value::Int(b as i64)),
                other => Err(EvalError::raise(
                    "TypeError",
                    format!("bad operand type for abs(): '{}'", other.type_name()),
                )),
            },
            "resource" => {
                let label = arg.to_string();
                Ok(Value::ContextManager(Rc::new(ContextManager::new(
                    label, arg,
                ))))
            }
            _ => Err(EvalError::raise(
                "NameError",
                format!("name '{name}' is not defined"),
            )),
        }
    }

    fn builtin_print(&mut self, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> EvalResult<Value> {
        let mut sep = " ".to_string();
        let mut end = "\n".to_string();
        for (key, value) in kwargs {
            let slot = match key.as_str() {
                "sep" => &mut sep,
                "end" => &mut end,
                _ => {
                    return Err(EvalError::raise(
                        "TypeError",
                        format!("'{key}' is an invalid keyword argument for print()"),
                    ))
                }
            };
            match value {
                Value::Str(s) => *slot = s,
                Value::None => {}
                other => {
                    return Err(EvalError::raise(
                        "TypeError",
                        format!("{key} must be None or a string, not {}", other.type_name()),
                    ))
                }
            }
        }
        let text = args
            .iter()
            .map(Value::to_str)
            .collect::<Vec<_>>()
            .join(&sep);
        self.stdout.push_str(&text);
        self.stdout.push_str(&end);
        Ok(Value::None)
    }

    fn evaluation(&mut self, result: EvalResult<Option<Value>>) -> Evaluation {
        let stdout = std::mem::take(&mut self.stdout);
        match result {
            Ok(value) => Evaluation {
                value,
                stdout,
                error: None,
            },
            Err(err) => Evaluation {
                value: None,
                stdout,
                error: Some(err.into_raised()),
            },
        }
    }
}

impl ExecutionEnvironment for Interpreter {
    fn run(&mut self, module: &Module) -> Evaluation {
        self.reset();
        let result = self.exec_block(&module.body).map(|()| None);
        self.evaluation(result)
    }

    fn evaluate(&mut self, expr: &Expr) -> Evaluation {
        self.reset();
        let result = self.eval_expr(expr).map(Some);
        let evaluation = self.evaluation(result);
        debug!(expr = %expr, outcome = %evaluation, "evaluated");
        evaluation
    }

    fn enter_context(&mut self, items: &[WithItem]) -> Result<Vec<String>, ContextError> {
        self.reset();
        let batch = self.enter_items(items)?;
        let names = batch.shadowed.iter().map(|(name, _)| name.clone()).collect();
        self.contexts.push(batch);
        Ok(names)
    }

    fn exit_context(&mut self) -> Result<(), RaisedError> {
        match self.contexts.pop() {
            Some(batch) => self.exit_batch(batch),
            None => Err(RaisedError::new("RuntimeError", "no context to exit")),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════

fn is_exception_class(name: &str) -> bool {
    matches!(name, "ValueError" | "TypeError" | "Exception")
}

fn overflow() -> EvalError {
    EvalError::raise("OverflowError", "integer overflow")
}

/// Bind call arguments to a function's parameters.
///
/// Surplus positionals go to `*args` as a tuple; unknown keywords go to
/// `**kwargs` as a list of `(name, value)` tuples.
fn bind_arguments(
    function: &Function,
    args: Vec<Value>,
    kwargs: Vec<(String, Value)>,
) -> EvalResult<BTreeMap<String, Value>> {
    let params = &function.params;
    let name = &function.name;
    let mut bound: BTreeMap<String, Value> = BTreeMap::new();
    let mut args = args.into_iter();

    for param in &params.positional {
        match args.next() {
            Some(value) => {
                bound.insert(param.name.name.clone(), value);
            }
            None => break,
        }
    }
    let surplus: Vec<Value> = args.collect();
    match &params.vararg {
        Some(vararg) => {
            bound.insert(vararg.name.name.clone(), Value::Tuple(surplus));
        }
        None if !surplus.is_empty() => {
            let expected = params.positional.len();
            return Err(EvalError::raise(
                "TypeError",
                format!(
                    "{name}() takes {expected} positional argument{} but {} were given",
                    if expected == 1 { "" } else { "s" },
                    expected + surplus.len()
                ),
            ));
        }
        None => {}
    }

    let mut extra = Vec::new();
    for (key, value) in kwargs {
        let is_param = params.positional.iter().any(|p| p.name.name == key);
        if !is_param {
            extra.push(Value::Tuple(vec![Value::Str(key), value]));
        } else if bound.contains_key(&key) {
            return Err(EvalError::raise(
                "TypeError",
                format!("{name}() got multiple values for argument '{key}'"),
            ));
        } else {
            bound.insert(key, value);
        }
    }
    match &params.kwarg {
        Some(kwarg) => {
            bound.insert(kwarg.name.name.clone(), Value::List(extra));
        }
        None => {
            if let Some(Value::Tuple(pair)) = extra.first() {
                return Err(EvalError::raise(
                    "TypeError",
                    format!(
                        "{name}() got an unexpected keyword argument '{}'",
                        pair[0].to_str()
                    ),
                ));
            }
        }
    }

    let mut missing = Vec::new();
    for (param, default) in params.positional.iter().zip(&function.defaults) {
        if bound.contains_key(&param.name.name) {
            continue;
        }
        match default {
            Some(value) => {
                bound.insert(param.name.name.clone(), value.clone());
            }
            None => missing.push(format!("'{}'", param.name.name)),
        }
    }
    if !missing.is_empty() {
        return Err(EvalError::raise(
            "TypeError",
            format!(
                "{name}() missing {} required positional argument{}: {}",
                missing.len(),
                if missing.len() == 1 { "" } else { "s" },
                missing.join(" and ")
            ),
        ));
    }
    Ok(bound)
}

/// Split a sequence into exactly `n` values.
fn unpack(value: &Value, n: usize) -> Result<Vec<Value>, String> {
    let items = match value {
        Value::List(items) | Value::Tuple(items) => items,
        other => {
            return Err(format!(
                "cannot unpack non-iterable {} object",
                other.type_name()
            ))
        }
    };
    if items.len() > n {
        Err(format!("too many values to unpack (expected {n})"))
    } else if items.len() < n {
        Err(format!(
            "not enough values to unpack (expected {n}, got {})",
            items.len()
        ))
    } else {
        Ok(items.clone())
    }
}

fn to_int(value: &Value) -> EvalResult<Value> {
    match value {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::Float(n) if n.is_finite() => Ok(Value::Int(n.trunc() as i64)),
        Value::Str(s) => s.trim().replace('_', "").parse().map(Value::Int).map_err(|_| {
            EvalError::raise(
                "ValueError",
                format!("invalid literal for int() with base 10: {value}"),
            )
        }),
        other => Err(EvalError::raise(
            "TypeError",
            format!(
                "int() argument must be a string or a number, not '{}'",
                other.type_name()
            ),
        )),
    }
}

fn unsupported(lv: &Value, op: BinOp, rv: &Value) -> EvalError {
    EvalError::raise(
        "TypeError",
        format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            lv.type_name(),
            rv.type_name()
        ),
    )
}

fn compare(lv: &Value, op: BinOp, rv: &Value) -> EvalResult<Value> {
    let ordering = match (lv, rv) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => match (lv.as_f64(), rv.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => {
                return Err(EvalError::raise(
                    "TypeError",
                    format!(
                        "'{}' not supported between instances of '{}' and '{}'",
                        op.symbol(),
                        lv.type_name(),
                        rv.type_name()
                    ),
                ))
            }
        },
    };
    let result = match ordering {
        None => false,
        Some(ordering) => match op {
            BinOp::Less => ordering.is_lt(),
            BinOp::Greater => ordering.is_gt(),
            BinOp::LessEq => ordering.is_le(),
            _ => ordering.is_ge(),
        },
    };
    Ok(Value::Bool(result))
}

/// Longest string (in bytes) or list a repetition may build.
const MAX_REPEAT_LEN: usize = 1 << 24;

/// How many copies `seq * times` makes of a sequence of length `len`.
/// Negative counts make none.
fn repeat_count(len: usize, times: i64) -> EvalResult<usize> {
    let times = usize::try_from(times).unwrap_or(0);
    let total = len.checked_mul(times).ok_or_else(|| {
        EvalError::raise(
            "OverflowError",
            "cannot fit repeated sequence into an index-sized integer",
        )
    })?;
    if total > MAX_REPEAT_LEN {
        return Err(EvalError::raise(
            "MemoryError",
            format!("repeated sequence of length {total} exceeds {MAX_REPEAT_LEN}"),
        ));
    }
    Ok(times)
}

fn repeat(items: &[Value], times: i64) -> EvalResult<Vec<Value>> {
    let times = repeat_count(items.len(), times)?;
    Ok(items
        .iter()
        .cloned()
        .cycle()
        .take(items.len() * times)
        .collect())
}

fn int_operands(lv: &Value, rv: &Value) -> Option<(i64, i64)> {
    let as_int = |v: &Value| match v {
        Value::Int(n) => Some(*n),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    };
    Some((as_int(lv)?, as_int(rv)?))
}

fn arithmetic(lv: &Value, op: BinOp, rv: &Value) -> EvalResult<Value> {
    // Sequence operators first.
    match (lv, op, rv) {
        (Value::Str(a), BinOp::Add, Value::Str(b)) => return Ok(Value::Str(format!("{a}{b}"))),
        (Value::List(a), BinOp::Add, Value::List(b)) => {
            return Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        (Value::Tuple(a), BinOp::Add, Value::Tuple(b)) => {
            return Ok(Value::Tuple(a.iter().chain(b).cloned().collect()))
        }
        (Value::Str(s), BinOp::Mul, Value::Int(n)) | (Value::Int(n), BinOp::Mul, Value::Str(s)) => {
            return Ok(Value::Str(s.repeat(repeat_count(s.len(), *n)?)))
        }
        (Value::List(items), BinOp::Mul, Value::Int(n))
        | (Value::Int(n), BinOp::Mul, Value::List(items)) => {
            return Ok(Value::List(repeat(items, *n)?))
        }
        _ => {}
    }

    if let Some((a, b)) = int_operands(lv, rv) {
        return match op {
            BinOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
            BinOp::Sub => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
            BinOp::Mul => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
            BinOp::Div if b == 0 => Err(EvalError::raise("ZeroDivisionError", "division by zero")),
            BinOp::Div => Ok(Value::Float(a as f64 / b as f64)),
            BinOp::Mod if b == 0 => Err(EvalError::raise(
                "ZeroDivisionError",
                "integer modulo by zero",
            )),
            BinOp::Mod => {
                let r = a.wrapping_rem(b);
                Ok(Value::Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r }))
            }
            BinOp::Pow if b < 0 => Ok(Value::Float((a as f64).powf(b as f64))),
            BinOp::Pow => u32::try_from(b)
                .ok()
                .and_then(|e| a.checked_pow(e))
                .map(Value::Int)
                .ok_or_else(overflow),
            _ => Err(unsupported(lv, op, rv)),
        };
    }

    let (Some(a), Some(b)) = (lv.as_f64(), rv.as_f64()) else {
        return Err(unsupported(lv, op, rv));
    };
    match op {
        BinOp::Add => Ok(Value::Float(a + b)),
        BinOp::Sub => Ok(Value::Float(a - b)),
        BinOp::Mul => Ok(Value::Float(a * b)),
        BinOp::Div | BinOp::Mod if b == 0.0 => Err(EvalError::raise(
            "ZeroDivisionError",
            "float division by zero",
        )),
        BinOp::Div => Ok(Value::Float(a / b)),
        BinOp::Mod => Ok(Value::Float(a - b * (a / b).floor())),
        BinOp::Pow => Ok(Value::Float(a.powf(b))),
        _ => Err(unsupported(lv, op, rv)),
    }
}
