//! Parts mappings: the named and ordered decomposition of a node.
//!
//! [`parts_of`] is the single place that knows which sub-structures a node
//! exposes (`args`, `body`, `with_items`, ...). Traversal code only ever
//! navigates through these mappings, never through the AST directly.

use crate::ast::*;
use std::collections::BTreeMap;
use std::fmt;

/// Key into a parts mapping: a position or a name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PartKey {
    Index(usize),
    Name(String),
}

impl From<usize> for PartKey {
    fn from(index: usize) -> Self {
        PartKey::Index(index)
    }
}

impl From<&str> for PartKey {
    fn from(name: &str) -> Self {
        PartKey::Name(name.to_string())
    }
}

impl From<String> for PartKey {
    fn from(name: String) -> Self {
        PartKey::Name(name)
    }
}

impl fmt::Display for PartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartKey::Index(i) => write!(f, "{i}"),
            PartKey::Name(name) => f.write_str(name),
        }
    }
}

/// A sub-structure of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// A plain tree node.
    Bare(Node),
    /// A positional sequence of parts.
    Ordered(Vec<Part>),
    /// A mapping with metadata describing the node it stands for.
    Named(PartsMap),
}

impl Part {
    /// Look up one step deeper. `Bare` parts have no children.
    pub fn get(&self, key: &PartKey) -> Option<&Part> {
        match (self, key) {
            (Part::Ordered(items), PartKey::Index(i)) => items.get(*i),
            (Part::Named(map), key) => map.entries.get(key),
            _ => None,
        }
    }

    /// Follow a path of keys.
    pub fn get_path<'a>(&'a self, path: &[PartKey]) -> Option<&'a Part> {
        path.iter().try_fold(self, |part, key| part.get(key))
    }

    /// The tree node this part stands for, if any.
    pub fn node(&self) -> Option<&Node> {
        match self {
            Part::Bare(node) => Some(node),
            Part::Named(map) => map.node.as_ref(),
            Part::Ordered(_) => None,
        }
    }

    /// Number of addressable children.
    pub fn len(&self) -> usize {
        match self {
            Part::Bare(_) => 0,
            Part::Ordered(items) => items.len(),
            Part::Named(map) => map.entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Named parts plus the metadata used when the mapping becomes a child state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartsMap {
    /// The node this mapping describes.
    pub node: Option<Node>,
    /// Names bound when entering this part (parameters, `as` targets).
    pub target_vars: Option<Vec<String>>,
    /// A more specific node to blame in diagnostics.
    pub highlight: Option<Node>,
    pub entries: BTreeMap<PartKey, Part>,
}

impl PartsMap {
    pub fn with_node(node: Node) -> Self {
        Self {
            node: Some(node),
            ..Self::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<&Part> {
        self.entries.get(&PartKey::Name(name.to_string()))
    }

    fn insert(&mut self, key: impl Into<PartKey>, part: Part) {
        self.entries.insert(key.into(), part);
    }

    pub fn target_vars(mut self, names: Vec<String>) -> Self {
        self.target_vars = Some(names);
        self
    }

    pub fn highlight(mut self, node: Node) -> Self {
        self.highlight = Some(node);
        self
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// parts_of
// ══════════════════════════════════════════════════════════════════════════════

/// Decompose a node into its named parts.
///
/// The returned map's `node` is the node itself. Nodes without
/// addressable sub-structure get an empty mapping.
pub fn parts_of(node: &Node) -> PartsMap {
    let mut map = PartsMap::with_node(node.clone());
    match node {
        Node::Module(module) => {
            map.insert("body", block_part(&module.body, None));
        }
        Node::Block(_) | Node::Param(_) => {}
        Node::Stmt(stmt) => stmt_parts(stmt, &mut map),
        Node::Expr(expr) => expr_parts(expr, &mut map),
        Node::WithItem(item) => {
            map.insert("context", Part::Bare(Node::Expr(item.context.clone())));
        }
    }
    map
}

fn stmt_parts(stmt: &Stmt, map: &mut PartsMap) {
    match stmt {
        Stmt::FunctionDef(def) => {
            params_parts(&def.params, map);
            map.insert("body", block_part(&def.body, Some(def.params.names())));
        }
        Stmt::With(with) => {
            let items = with
                .items
                .iter()
                .map(|item| Part::Bare(Node::WithItem(item.clone())))
                .collect();
            map.insert("with_items", Part::Ordered(items));
            let contexts = with
                .items
                .iter()
                .map(|item| {
                    Part::Named(
                        PartsMap::with_node(Node::Expr(item.context.clone()))
                            .target_vars(item.bound_names())
                            .highlight(Node::WithItem(item.clone())),
                    )
                })
                .collect();
            map.insert("context", Part::Ordered(contexts));
            map.insert("body", block_part(&with.body, Some(with.bound_names())));
        }
        Stmt::If(stmt) => {
            map.insert("test", Part::Bare(Node::Expr(stmt.test.clone())));
            map.insert("body", block_part(&stmt.body, None));
            if let Some(orelse) = &stmt.orelse {
                map.insert("orelse", block_part(orelse, None));
            }
        }
        Stmt::Return(ReturnStmt {
            value: Some(value), ..
        }) => {
            map.insert("value", Part::Bare(Node::Expr(value.clone())));
        }
        Stmt::Raise(RaiseStmt { exc: Some(exc), .. }) => {
            map.insert("exc", Part::Bare(Node::Expr(exc.clone())));
        }
        Stmt::Assign(assign) => {
            map.insert("value", Part::Bare(Node::Expr(assign.value.clone())));
        }
        Stmt::Expr(stmt) => {
            map.insert("value", Part::Bare(Node::Expr(stmt.expr.clone())));
        }
        Stmt::Return(_) | Stmt::Raise(_) | Stmt::Pass(_) => {}
    }
}

fn expr_parts(expr: &Expr, map: &mut PartsMap) {
    match &expr.kind {
        ExprKind::Lambda(lambda) => {
            params_parts(&lambda.params, map);
            map.insert(
                "body",
                Part::Named(
                    PartsMap::with_node(Node::Expr((*lambda.body).clone()))
                        .target_vars(lambda.params.names()),
                ),
            );
        }
        ExprKind::Call(call) => {
            map.insert("func", Part::Bare(Node::Expr((*call.func).clone())));
            let mut args = PartsMap::default();
            for (i, arg) in call.args.iter().enumerate() {
                args.insert(i, Part::Bare(Node::Expr(arg.clone())));
            }
            for keyword in &call.keywords {
                args.insert(
                    keyword.name.name.as_str(),
                    Part::Bare(Node::Expr(keyword.value.clone())),
                );
            }
            map.insert("args", Part::Named(args));
        }
        _ => {}
    }
}

fn block_part(block: &Block, target_vars: Option<Vec<String>>) -> Part {
    let mut map = PartsMap::with_node(Node::Block(block.clone()));
    map.target_vars = target_vars;
    Part::Named(map)
}

fn param_part(param: &Param) -> Part {
    let mut map =
        PartsMap::with_node(Node::Param(param.clone())).highlight(Node::Param(param.clone()));
    if let Some(default) = &param.default {
        map.insert("default", Part::Bare(Node::Expr(default.clone())));
    }
    Part::Named(map)
}

fn params_parts(params: &Params, map: &mut PartsMap) {
    let mut args = PartsMap::default();
    for (i, param) in params.positional.iter().enumerate() {
        args.insert(i, param_part(param));
        args.insert(param.name.name.as_str(), param_part(param));
    }
    map.insert("args", Part::Named(args));
    if let Some(vararg) = &params.vararg {
        map.insert("*args", param_part(vararg));
    }
    if let Some(kwarg) = &params.kwarg {
        map.insert("**kwargs", param_part(kwarg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Span;

    fn sp() -> Span {
        Span::point(1, 1)
    }

    fn param(name: &str, default: Option<i64>) -> Param {
        Param {
            name: Ident::new(name, sp()),
            default: default.map(|d| Expr::new(ExprKind::Int(d), sp())),
            span: sp(),
        }
    }

    fn function_def() -> Node {
        Node::Stmt(Stmt::FunctionDef(FunctionDef {
            name: Ident::new("shout", sp()),
            params: Params {
                positional: vec![param("word", None), param("times", Some(2))],
                vararg: Some(param("rest", None)),
                kwarg: None,
            },
            body: Block {
                stmts: vec![Stmt::Pass(sp())],
                span: sp(),
            },
            span: sp(),
        }))
    }

    #[test]
    fn test_function_def_args_by_position_and_name() {
        let parts = parts_of(&function_def());
        let args = parts.get("args").unwrap();
        let by_pos = args.get(&PartKey::Index(1)).unwrap();
        let by_name = args.get(&"times".into()).unwrap();
        assert_eq!(by_pos, by_name);
        assert!(by_pos.get(&"default".into()).is_some());
        assert!(args
            .get(&PartKey::Index(0))
            .unwrap()
            .get(&"default".into())
            .is_none());
        assert!(parts.get("*args").is_some());
        assert!(parts.get("**kwargs").is_none());
    }

    #[test]
    fn test_function_body_binds_params() {
        let parts = parts_of(&function_def());
        match parts.get("body") {
            Some(Part::Named(body)) => {
                assert_eq!(
                    body.target_vars,
                    Some(vec!["word".to_string(), "times".into(), "rest".into()])
                );
                assert!(matches!(body.node, Some(Node::Block(_))));
            }
            other => panic!("unexpected body part: {other:?}"),
        }
    }

    #[test]
    fn test_get_path_through_nested_parts() {
        let parts = Part::Named(parts_of(&function_def()));
        let path = [
            PartKey::from("args"),
            PartKey::from("times"),
            PartKey::from("default"),
        ];
        let default = parts.get_path(&path).unwrap();
        assert_eq!(default.node().unwrap().to_string(), "2");
        assert!(parts.get_path(&["args".into(), 5usize.into()]).is_none());
    }

    #[test]
    fn test_ordered_parts_have_no_node() {
        let ordered = Part::Ordered(vec![Part::Bare(Node::Param(param("a", None)))]);
        assert!(ordered.node().is_none());
        assert_eq!(ordered.len(), 1);
        assert!(ordered.get(&"a".into()).is_none());
    }
}
