//! AST node variants and structural traversal.
//!
//! Nodes are a single tagged enum (`NodeKind`) wrapped in one `Node` struct
//! carrying position and the fields the checker decorates in place
//! (`node_type`, `node_ident`), rather than a base class with virtual
//! dispatch — every pass is an exhaustive `match` over `NodeKind`.

use std::fmt;

use crate::ident::IdentId;
use crate::pos::Pos;
use crate::types::{BaseType, TypeDesc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
}

impl BinOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
            Self::BitAnd => "&",
            Self::BitOr => "|",
        }
    }

    /// Is this a comparison operator (result is always BOOL when applicable)?
    pub const fn is_comparison(self) -> bool {
        matches!(self, Self::Eq | Self::Ne | Self::Lt | Self::Gt | Self::Le | Self::Ge)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl LiteralValue {
    pub const fn base_type(&self) -> BaseType {
        match self {
            Self::Bool(_) => BaseType::Bool,
            Self::Int(_) => BaseType::Int,
            Self::Float(_) => BaseType::Float,
            Self::Str(_) => BaseType::Str,
        }
    }
}

/// Classify literal source text the way the original value-inference does:
/// BOOL keywords are checked before numeric syntax so `true`/`false` are
/// never misread as an identifier-like integer literal.
pub fn classify_literal(text: &str) -> LiteralValue {
    match text {
        "true" => LiteralValue::Bool(true),
        "false" => LiteralValue::Bool(false),
        _ if text.starts_with('"') && text.ends_with('"') && text.len() >= 2 => {
            LiteralValue::Str(text[1..text.len() - 1].to_owned())
        }
        _ if text.contains('.') => {
            LiteralValue::Float(text.parse().unwrap_or(0.0))
        }
        _ => LiteralValue::Int(text.parse().unwrap_or(0)),
    }
}

#[derive(Debug)]
pub enum NodeKind {
    Literal { text: String, value: LiteralValue },
    Ident { name: String },
    TypeRef { name: String },
    BinOp { op: BinOp, lhs: Box<Node>, rhs: Box<Node> },
    Call { callee: Box<Node>, args: Vec<Node> },
    TypeConvert { expr: Box<Node>, target_type: TypeDesc },
    Assign { target: Box<Node>, value: Box<Node> },
    VarsDecl { type_node: Box<Node>, items: Vec<Node> },
    Param { type_node: Box<Node>, name: String },
    Func { return_type: Box<Node>, name: String, params: Vec<Node>, body: Box<Node> },
    Return { value: Box<Node> },
    If { cond: Box<Node>, then_branch: Box<Node>, else_branch: Option<Box<Node>> },
    While { cond: Box<Node>, body: Box<Node> },
    For { init: Box<Node>, cond: Option<Box<Node>>, step: Box<Node>, body: Box<Node> },
    StmtList { statements: Vec<Node>, program: bool },
    /// Placeholder: parsed but given no checker/codegen semantics (open
    /// question upstream — see DESIGN.md).
    MapType { key: Box<Node>, value: Box<Node> },
    MapDeclaration { type_node: Box<Node>, name: String },
    MapAccess { target: Box<Node>, key: Box<Node> },
}

#[derive(Debug)]
pub struct Node {
    pub pos: Pos,
    pub node_type: Option<TypeDesc>,
    pub node_ident: Option<IdentId>,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(pos: Pos, kind: NodeKind) -> Self {
        Self { pos, node_type: None, node_ident: None, kind }
    }

    pub fn children(&self) -> Vec<&Node> {
        match &self.kind {
            NodeKind::Literal { .. } | NodeKind::Ident { .. } | NodeKind::TypeRef { .. } => vec![],
            NodeKind::BinOp { lhs, rhs, .. } => vec![lhs, rhs],
            NodeKind::Call { callee, args } => {
                let mut v = vec![callee.as_ref()];
                v.extend(args.iter());
                v
            }
            NodeKind::TypeConvert { expr, .. } => vec![expr],
            NodeKind::Assign { target, value } => vec![target, value],
            NodeKind::VarsDecl { type_node, items } => {
                let mut v = vec![type_node.as_ref()];
                v.extend(items.iter());
                v
            }
            NodeKind::Param { type_node, .. } => vec![type_node],
            NodeKind::Func { return_type, params, body, .. } => {
                let mut v = vec![return_type.as_ref()];
                v.extend(params.iter());
                v.push(body);
                v
            }
            NodeKind::Return { value } => vec![value.as_ref()],
            NodeKind::If { cond, then_branch, else_branch } => {
                let mut v = vec![cond.as_ref(), then_branch.as_ref()];
                v.extend(else_branch.as_deref());
                v
            }
            NodeKind::While { cond, body } => vec![cond, body],
            NodeKind::For { init, cond, step, body } => {
                let mut v = vec![init.as_ref()];
                v.extend(cond.as_deref());
                v.push(step);
                v.push(body);
                v
            }
            NodeKind::StmtList { statements, .. } => statements.iter().collect(),
            NodeKind::MapType { key, value } => vec![key, value],
            NodeKind::MapDeclaration { type_node, .. } => vec![type_node],
            NodeKind::MapAccess { target, key } => vec![target, key],
        }
    }

    /// A short label for this node, used by the tree printer — analogous to
    /// each Python node's `__str__`.
    pub fn label(&self) -> String {
        match &self.kind {
            NodeKind::Literal { text, .. } => text.clone(),
            NodeKind::Ident { name } => name.clone(),
            NodeKind::TypeRef { name } => name.clone(),
            NodeKind::BinOp { op, .. } => op.symbol().to_owned(),
            NodeKind::Call { .. } => "call".to_owned(),
            NodeKind::TypeConvert { target_type, .. } => format!("convert({target_type})"),
            NodeKind::Assign { .. } => "=".to_owned(),
            NodeKind::VarsDecl { .. } => "vars".to_owned(),
            NodeKind::Param { name, .. } => format!("param {name}"),
            NodeKind::Func { name, .. } => format!("func {name}"),
            NodeKind::Return { .. } => "return".to_owned(),
            NodeKind::If { .. } => "if".to_owned(),
            NodeKind::While { .. } => "while".to_owned(),
            NodeKind::For { .. } => "for".to_owned(),
            NodeKind::StmtList { .. } => "stmt_list".to_owned(),
            NodeKind::MapType { .. } => "map_type".to_owned(),
            NodeKind::MapDeclaration { name, .. } => format!("map {name}"),
            NodeKind::MapAccess { .. } => "map_access".to_owned(),
        }
    }

    /// A human-readable tree, using the same box-drawing characters as the
    /// original AST printer (`├`, `└`, `│`).
    pub fn tree(&self) -> String {
        let mut out = String::new();
        write_tree(self, "", true, &mut out);
        out
    }
}

fn write_tree(node: &Node, prefix: &str, is_last: bool, out: &mut String) {
    let connector = if prefix.is_empty() { "" } else if is_last { "└──" } else { "├──" };
    out.push_str(prefix);
    out.push_str(connector);
    out.push_str(&node.label());
    out.push('\n');

    let child_prefix = if prefix.is_empty() {
        String::new()
    } else if is_last {
        format!("{prefix}    ")
    } else {
        format!("{prefix}│   ")
    };
    let children = node.children();
    let count = children.len();
    for (i, child) in children.into_iter().enumerate() {
        write_tree(child, &child_prefix, i + 1 == count, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_precedes_int_in_classification() {
        assert_eq!(classify_literal("true"), LiteralValue::Bool(true));
        assert_eq!(classify_literal("42"), LiteralValue::Int(42));
        assert_eq!(classify_literal("3.5"), LiteralValue::Float(3.5));
        assert_eq!(classify_literal("\"hi\""), LiteralValue::Str("hi".to_owned()));
    }

    #[test]
    fn tree_lists_children_in_order() {
        let pos = Pos::new(1, 1);
        let lhs = Node::new(pos, NodeKind::Literal { text: "1".into(), value: LiteralValue::Int(1) });
        let rhs = Node::new(pos, NodeKind::Literal { text: "2".into(), value: LiteralValue::Int(2) });
        let add = Node::new(pos, NodeKind::BinOp { op: BinOp::Add, lhs: Box::new(lhs), rhs: Box::new(rhs) });
        assert_eq!(add.children().len(), 2);
        assert!(add.tree().contains('+'));
    }
}
