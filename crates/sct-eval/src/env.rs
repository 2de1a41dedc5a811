//! Variable environment: globals plus a stack of call frames.

use sct_types::value::Value;
use std::collections::BTreeMap;

/// The locals of one function call.
#[derive(Debug, Clone, Default)]
struct Frame {
    bindings: BTreeMap<String, Value>,
}

/// Scoped variable environment.
///
/// Lookups search the innermost call frame, then the globals. A function's
/// frame starts from the bindings it captured where it was defined, so
/// closures see their defining scope without sharing it.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    globals: BTreeMap<String, Value>,
    frames: Vec<Frame>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a call frame seeded with `bindings`.
    pub fn enter_frame(&mut self, bindings: BTreeMap<String, Value>) {
        self.frames.push(Frame { bindings });
    }

    pub fn leave_frame(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn current(&mut self) -> &mut BTreeMap<String, Value> {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.bindings,
            None => &mut self.globals,
        }
    }

    /// Bind `name` in the innermost scope.
    pub fn define(&mut self, name: &str, value: Value) {
        self.current().insert(name.to_string(), value);
    }

    /// Remove `name` from the innermost scope, returning its old value.
    pub fn undefine(&mut self, name: &str) -> Option<Value> {
        self.current().remove(name)
    }

    /// The value `name` has in the innermost scope, ignoring outer ones.
    pub fn local(&self, name: &str) -> Option<&Value> {
        match self.frames.last() {
            Some(frame) => frame.bindings.get(name),
            None => self.globals.get(name),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames
            .last()
            .and_then(|frame| frame.bindings.get(name))
            .or_else(|| self.globals.get(name))
    }

    /// What a function defined right now closes over: the innermost frame's
    /// bindings. Empty at top level, where globals are looked up live.
    pub fn capture(&self) -> BTreeMap<String, Value> {
        self.frames
            .last()
            .map(|frame| frame.bindings.clone())
            .unwrap_or_default()
    }

    pub fn globals(&self) -> &BTreeMap<String, Value> {
        &self.globals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_shadows_globals() {
        let mut env = Environment::new();
        env.define("x", Value::Int(1));
        env.enter_frame(BTreeMap::from([("x".to_string(), Value::Int(2))]));
        assert_eq!(env.get("x"), Some(&Value::Int(2)));
        env.leave_frame();
        assert_eq!(env.get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_define_targets_innermost_scope() {
        let mut env = Environment::new();
        env.enter_frame(BTreeMap::new());
        env.define("y", Value::Int(3));
        assert!(env.globals().get("y").is_none());
        assert_eq!(env.capture().get("y"), Some(&Value::Int(3)));
        env.leave_frame();
        assert!(env.get("y").is_none());
    }

    #[test]
    fn test_undefine_restores_absence() {
        let mut env = Environment::new();
        env.define("z", Value::None);
        assert_eq!(env.undefine("z"), Some(Value::None));
        assert!(env.local("z").is_none());
    }
}
