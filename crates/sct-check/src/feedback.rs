//! A single check outcome: rendered text plus the student location to blame.

use sct_types::ast::Node;
use sct_types::Span;
use serde::Serialize;
use std::fmt;

/// The student code a diagnostic points at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlight {
    /// Node kind, e.g. `function_def`.
    pub kind: String,
    #[serde(flatten)]
    pub span: Span,
    /// The node rendered back to source.
    pub text: String,
}

impl Highlight {
    pub fn of(node: &Node) -> Self {
        Self {
            kind: node.kind_name().to_string(),
            span: node.span(),
            text: node.to_string(),
        }
    }
}

/// Immutable diagnostic fed to the reporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
}

impl Feedback {
    /// Feedback blaming `node`, or nothing when highlighting is disabled.
    pub fn new(message: impl Into<String>, node: Option<&Node>, highlighting_disabled: bool) -> Self {
        Self {
            message: message.into(),
            highlight: node
                .filter(|_| !highlighting_disabled)
                .map(Highlight::of),
        }
    }

    /// Feedback without a location.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            highlight: None,
        }
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.highlight {
            Some(highlight) => write!(f, "{}: {}", highlight.span, self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sct_types::ast::{Expr, ExprKind};

    fn name_node() -> Node {
        Node::Expr(Expr::new(ExprKind::Name("x".into()), Span::new(2, 5, 2, 5)))
    }

    #[test]
    fn test_highlight_records_location() {
        let fb = Feedback::new("wrong", Some(&name_node()), false);
        let highlight = fb.highlight.as_ref().expect("highlight");
        assert_eq!(highlight.kind, "name");
        assert_eq!(highlight.text, "x");
        assert_eq!(fb.to_string(), "2:5: wrong");
    }

    #[test]
    fn test_highlighting_disabled() {
        let fb = Feedback::new("wrong", Some(&name_node()), true);
        assert_eq!(fb.highlight, None);
        assert_eq!(fb.to_string(), "wrong");
    }

    #[test]
    fn test_serializes_span_inline() {
        let fb = Feedback::new("wrong", Some(&name_node()), false);
        let json = serde_json::to_value(&fb).expect("serialize");
        assert_eq!(json["highlight"]["line"], 2);
        assert_eq!(json["highlight"]["column"], 5);
        assert_eq!(json["message"], "wrong");
    }
}
