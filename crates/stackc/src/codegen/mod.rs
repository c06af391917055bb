//! Shared code-generation base: a line buffer with late-bound labels, and
//! `find_vars_decls` for gathering a function's own local declarations.
//!
//! A forward-patch builder: labels are allocated up front and referenced
//! before their index is known, then a final render pass resolves every
//! reference to the label definition's position in the emitted line stream.

pub mod jbc;
pub mod sil;

use std::collections::HashMap;

use crate::ast::{Node, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(u32);

enum LineEntry {
    Text(String),
    LabelDef(LabelId),
    LabelRef { prefix: String, label: LabelId, suffix: String },
}

/// A backend's output stream: plain lines plus label definitions/references
/// whose numeric index is resolved in one final pass over the buffer.
#[derive(Default)]
pub struct CodeBuffer {
    lines: Vec<LineEntry>,
    next_label: u32,
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_label(&mut self) -> LabelId {
        let id = LabelId(self.next_label);
        self.next_label += 1;
        id
    }

    pub fn line(&mut self, text: impl Into<String>) {
        self.lines.push(LineEntry::Text(text.into()));
    }

    pub fn label_def(&mut self, label: LabelId) {
        self.lines.push(LineEntry::LabelDef(label));
    }

    pub fn line_with_label(&mut self, prefix: impl Into<String>, label: LabelId, suffix: impl Into<String>) {
        self.lines.push(LineEntry::LabelRef { prefix: prefix.into(), label, suffix: suffix.into() });
    }

    /// Assigns ascending indices to label-definition lines in emission
    /// order, then renders every line, substituting each reference with
    /// `label_name(assigned_index)`.
    pub fn render(&self, label_name: impl Fn(u32) -> String) -> Vec<String> {
        let mut indices: HashMap<LabelId, u32> = HashMap::new();
        let mut next = 0u32;
        for entry in &self.lines {
            if let LineEntry::LabelDef(label) = entry {
                indices.insert(*label, next);
                next += 1;
            }
        }
        self.lines
            .iter()
            .map(|entry| match entry {
                LineEntry::Text(s) => s.clone(),
                LineEntry::LabelDef(label) => format!("{}:", label_name(indices[label])),
                LineEntry::LabelRef { prefix, label, suffix } => {
                    format!("{prefix}{}{suffix}", label_name(indices[label]))
                }
            })
            .collect()
    }
}

/// `VarsDecl` nodes reachable from `root` without crossing into a nested
/// `Func` — so a function body gathers only its own locals.
pub fn find_vars_decls(root: &Node) -> Vec<&Node> {
    let mut out = Vec::new();
    collect_vars_decls(root, &mut out);
    out
}

fn collect_vars_decls<'a>(node: &'a Node, out: &mut Vec<&'a Node>) {
    match &node.kind {
        NodeKind::VarsDecl { .. } => out.push(node),
        NodeKind::StmtList { statements, .. } => {
            for stmt in statements {
                collect_vars_decls(stmt, out);
            }
        }
        NodeKind::If { then_branch, else_branch, .. } => {
            collect_vars_decls(then_branch, out);
            if let Some(else_b) = else_branch {
                collect_vars_decls(else_b, out);
            }
        }
        NodeKind::While { body, .. } => collect_vars_decls(body, out),
        NodeKind::For { init, body, .. } => {
            collect_vars_decls(init, out);
            collect_vars_decls(body, out);
        }
        NodeKind::Func { .. } => {}
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_indices_assigned_in_emission_order() {
        let mut buf = CodeBuffer::new();
        let l0 = buf.new_label();
        let l1 = buf.new_label();
        buf.line_with_label("brfalse ", l1, "");
        buf.label_def(l0);
        buf.line("nop");
        buf.label_def(l1);
        let rendered = buf.render(|i| format!("L{i}"));
        assert_eq!(rendered, vec!["brfalse L1", "L0:", "nop", "L1:"]);
    }

    #[test]
    fn find_vars_decls_skips_nested_functions() {
        let ast = crate::parser::parse("int x; int f() { int y; } int z;").unwrap();
        let decls = find_vars_decls(&ast);
        assert_eq!(decls.len(), 2);
    }
}
