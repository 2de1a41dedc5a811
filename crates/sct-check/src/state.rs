//! The traversal context.
//!
//! A [`State`] pairs a position in the student program with the matching
//! position in the solution program. Every traversal step builds a new
//! child state; states are never mutated once built.

use crate::error::{AuthoringError, CheckResult};
use crate::feedback::Feedback;
use crate::template::{render, Bindings, TemplateError};
use sct_types::ast::Node;
use sct_types::parts::{parts_of, Part, PartsMap};
use serde_json::Value as Json;

/// A pending message template and the bindings it renders with.
#[derive(Debug, Clone, PartialEq)]
pub struct LineageEntry {
    pub template: String,
    pub bindings: Bindings,
}

impl LineageEntry {
    pub fn new(template: impl Into<String>, bindings: Bindings) -> Self {
        Self {
            template: template.into(),
            bindings,
        }
    }
}

/// Position in both programs plus everything needed to explain it.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub student: Node,
    pub solution: Node,
    pub student_parts: PartsMap,
    pub solution_parts: PartsMap,
    /// Names bound at this position in the student program.
    pub student_context: Vec<String>,
    pub solution_context: Vec<String>,
    /// Overrides the default highlight (the student node itself).
    pub(crate) highlight: Option<Node>,
    pub highlighting_disabled: bool,
    /// How a call was described, set by `check_call`.
    pub(crate) argstr: Option<String>,
    lineage: Vec<LineageEntry>,
}

/// One side of an extracted part.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Extracted<'a> {
    pub node: &'a Node,
    pub map: Option<&'a PartsMap>,
}

impl<'a> Extracted<'a> {
    /// `None` when the part does not stand for a single node.
    pub fn from_part(part: &'a Part) -> Option<Self> {
        match part {
            Part::Bare(node) => Some(Self { node, map: None }),
            Part::Named(map) => map.node.as_ref().map(|node| Self {
                node,
                map: Some(map),
            }),
            Part::Ordered(_) => None,
        }
    }

    /// The mapping a child state navigates by. A mapping with no entries
    /// of its own falls back to the node's parts, keeping its metadata.
    fn parts(&self) -> PartsMap {
        match self.map {
            Some(map) if !map.entries.is_empty() => map.clone(),
            Some(map) => PartsMap {
                target_vars: map.target_vars.clone(),
                highlight: map.highlight.clone(),
                ..parts_of(self.node)
            },
            None => parts_of(self.node),
        }
    }
}

impl State {
    pub(crate) fn root(student: Node, solution: Node, highlighting_disabled: bool) -> Self {
        Self {
            student_parts: parts_of(&student),
            solution_parts: parts_of(&solution),
            student,
            solution,
            student_context: Vec::new(),
            solution_context: Vec::new(),
            highlight: None,
            highlighting_disabled,
            argstr: None,
            lineage: Vec::new(),
        }
    }

    /// The student node diagnostics at this state blame.
    pub fn highlight(&self) -> &Node {
        self.highlight.as_ref().unwrap_or(&self.student)
    }

    pub fn lineage(&self) -> &[LineageEntry] {
        &self.lineage
    }

    /// Render the lineage followed by `tail`, joined by single spaces.
    /// Templates that render empty are left out.
    pub fn build_message(&self, tail: &str, bindings: &Bindings) -> Result<String, TemplateError> {
        let mut parts = Vec::with_capacity(self.lineage.len() + 1);
        for entry in &self.lineage {
            parts.push(render(&entry.template, &entry.bindings)?);
        }
        parts.push(render(tail, bindings)?);
        parts.retain(|p| !p.is_empty());
        Ok(parts.join(" "))
    }

    /// Feedback blaming this state's highlight.
    pub fn feedback(&self, message: impl Into<String>) -> Feedback {
        Feedback::new(message, Some(self.highlight()), self.highlighting_disabled)
    }

    /// Feedback blaming `node`.
    pub fn feedback_at(&self, message: impl Into<String>, node: &Node) -> Feedback {
        Feedback::new(message, Some(node), self.highlighting_disabled)
    }

    /// Build the child state for an extracted part pair.
    ///
    /// When both sides are mappings the child takes their bound names and
    /// the student side's highlight; bare nodes inherit the parent's bound
    /// names. `stu_part` and `sol_part` are added to the entry's bindings.
    pub(crate) fn to_child(
        &self,
        student: Extracted<'_>,
        solution: Extracted<'_>,
        mut entry: LineageEntry,
    ) -> State {
        entry.bindings.insert(
            "stu_part".to_string(),
            Json::String(student.node.to_string()),
        );
        entry.bindings.insert(
            "sol_part".to_string(),
            Json::String(solution.node.to_string()),
        );
        let mut lineage = self.lineage.clone();
        lineage.push(entry);

        let (student_context, solution_context, highlight) = match (student.map, solution.map) {
            (Some(stu), Some(sol)) => (
                stu.target_vars.clone().unwrap_or_default(),
                sol.target_vars.clone().unwrap_or_default(),
                stu.highlight.clone(),
            ),
            _ => (
                self.student_context.clone(),
                self.solution_context.clone(),
                None,
            ),
        };

        State {
            student: student.node.clone(),
            solution: solution.node.clone(),
            student_parts: student.parts(),
            solution_parts: solution.parts(),
            student_context,
            solution_context,
            highlight,
            highlighting_disabled: self.highlighting_disabled,
            argstr: None,
            lineage,
        }
    }

    /// Child state at two synthesized nodes, e.g. the calls built by
    /// `check_call`, blaming `highlight`.
    pub(crate) fn synthesized_child(
        &self,
        student: Node,
        solution: Node,
        highlight: Node,
        entry: LineageEntry,
    ) -> State {
        let mut child = self.to_child(
            Extracted {
                node: &student,
                map: None,
            },
            Extracted {
                node: &solution,
                map: None,
            },
            entry,
        );
        child.highlight = Some(highlight);
        child
    }

    /// `found`, or an authoring error naming the check that needed it.
    pub(crate) fn require_position<T>(
        &self,
        check: &'static str,
        expected: &'static str,
        found: Option<T>,
    ) -> CheckResult<T> {
        found.ok_or_else(|| AuthoringError::WrongState { check, expected }.into())
    }
}
