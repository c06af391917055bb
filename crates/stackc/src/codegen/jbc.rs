//! JVM-style textual assembly emitter.
//!
//! Addresses locals/params by byte offset (not ordinal index), packs slot
//! sizes for `double`, and materializes a `boolean` from a JVM comparison
//! instruction via a two-label compare-then-materialize idiom.

use std::fmt::Write as _;

use crate::ast::{BinOp, LiteralValue, Node, NodeKind};
use crate::error::CodegenError;
use crate::ident::{IdentArena, IdentId, ScopeKind};
use crate::types::{BaseType, TypeDesc};

use super::{find_vars_decls, CodeBuffer};

fn jbc_type(base: Option<BaseType>) -> &'static str {
    match base {
        Some(BaseType::Void) | None => "void",
        Some(BaseType::Int) => "int",
        Some(BaseType::Float) => "double",
        Some(BaseType::Bool) => "boolean",
        Some(BaseType::Str) => "java.lang.String",
    }
}

/// `double` occupies two local-variable slots; everything else occupies one.
fn slot_size(base: Option<BaseType>) -> u32 {
    if base == Some(BaseType::Float) { 2 } else { 1 }
}

/// Load/store instruction prefix: `i` for int/bool, `d` for float, `a` for
/// string (reference types use the `a`-family opcodes).
fn prefix(base: Option<BaseType>) -> char {
    match base {
        Some(BaseType::Float) => 'd',
        Some(BaseType::Str) => 'a',
        _ => 'i',
    }
}

fn return_instr(base: Option<BaseType>) -> &'static str {
    match base {
        Some(BaseType::Void) | None => "return",
        Some(BaseType::Int | BaseType::Bool) => "ireturn",
        Some(BaseType::Float) => "dreturn",
        Some(BaseType::Str) => "areturn",
    }
}

fn default_push(base: Option<BaseType>) -> Option<String> {
    match base {
        Some(BaseType::Int | BaseType::Bool) => Some("iconst_0".to_owned()),
        Some(BaseType::Float) => Some("ldc2_w 0.0D".to_owned()),
        Some(BaseType::Str) => Some("ldc \"\"".to_owned()),
        _ => None,
    }
}

fn body_ends_in_return(body: &Node) -> bool {
    match &body.kind {
        NodeKind::StmtList { statements, .. } => {
            matches!(statements.last().map(|s| &s.kind), Some(NodeKind::Return { .. }))
        }
        NodeKind::Return { .. } => true,
        _ => false,
    }
}

/// Sanitizes a file stem into a valid class name: any character outside
/// `[A-Za-z0-9_]` becomes `_`, and a leading digit gets an `_` prefix so the
/// result always starts with an identifier character.
pub fn sanitize_class_name(stem: &str) -> String {
    let mut out: String =
        stem.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }).collect();
    if out.is_empty() {
        out.push('_');
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

fn local_ident_of(item: &Node) -> Option<IdentId> {
    match &item.kind {
        NodeKind::Ident { .. } => item.node_ident,
        NodeKind::Assign { target, .. } => target.node_ident,
        _ => None,
    }
}

/// Assigns byte offsets to `params` (in declaration order) and then to every
/// `LOCAL` var reachable from `body` without crossing into a nested `Func`.
fn assign_offsets(params: &[Node], body: &Node, idents: &mut IdentArena) {
    let mut offset = 0u32;
    for p in params {
        if let Some(id) = p.node_ident {
            let size = slot_size(idents.get(id).type_desc.base_type());
            idents.get_mut(id).jbc_offset = offset;
            offset += size;
        }
    }
    for decl in find_vars_decls(body) {
        let NodeKind::VarsDecl { items, .. } = &decl.kind else { continue };
        for item in items {
            if let Some(id) = local_ident_of(item) {
                let desc = idents.get(id);
                if desc.scope_kind == ScopeKind::Local {
                    let size = slot_size(desc.type_desc.base_type());
                    idents.get_mut(id).jbc_offset = offset;
                    offset += size;
                }
            }
        }
    }
}

pub fn generate(program: &Node, idents: &mut IdentArena, class_name: &str) -> Result<String, CodegenError> {
    let NodeKind::StmtList { statements, program: true } = &program.kind else {
        return Err(CodegenError { message: "JBC generation expects a program root".into() });
    };

    let mut out = String::new();
    writeln!(out, "version 6;").unwrap();
    writeln!(out, "public class {class_name} extends java.lang.Object {{").unwrap();

    for (_, desc) in idents.iter() {
        if desc.built_in || desc.type_desc.is_func() {
            continue;
        }
        if matches!(desc.scope_kind, ScopeKind::Global | ScopeKind::GlobalLocal) {
            writeln!(out, "  public static {} _gv{};", jbc_type(desc.type_desc.base_type()), desc.index).unwrap();
        }
    }

    let mut top_level = Vec::new();
    for stmt in statements {
        if matches!(stmt.kind, NodeKind::Func { .. }) {
            out.push_str(&emit_func(stmt, idents, class_name)?);
        } else {
            top_level.push(stmt);
        }
    }
    out.push_str(&emit_main(&top_level, idents, class_name)?);

    out.push_str("}\n");
    Ok(out)
}

fn emit_func(node: &Node, idents: &mut IdentArena, class_name: &str) -> Result<String, CodegenError> {
    let NodeKind::Func { return_type, name, params, body } = &node.kind else {
        unreachable!("emit_func only called on Func nodes")
    };
    assign_offsets(params, body, idents);
    let ret_base = return_type.node_type.as_ref().and_then(TypeDesc::base_type);

    let param_list: Vec<String> = params
        .iter()
        .map(|p| {
            let NodeKind::Param { name, .. } = &p.kind else { unreachable!("Func params are always Param nodes") };
            format!("{} {name}", jbc_type(p.node_type.as_ref().and_then(TypeDesc::base_type)))
        })
        .collect();

    let idents_ref: &IdentArena = idents;
    let mut emitter = Emitter { idents: idents_ref, class_name, buf: CodeBuffer::new() };
    emitter.emit_stmt(body)?;
    let rendered = emitter.buf.render(|i| format!("L{i}"));

    let mut out = String::new();
    writeln!(out, "  public static {} {name}({}) {{", jbc_type(ret_base), param_list.join(", ")).unwrap();
    for line in rendered {
        writeln!(out, "    {line}").unwrap();
    }
    if !body_ends_in_return(body) {
        if let Some(push) = default_push(ret_base) {
            writeln!(out, "    {push}").unwrap();
        }
        writeln!(out, "    {}", return_instr(ret_base)).unwrap();
    }
    writeln!(out, "  }}").unwrap();
    Ok(out)
}

fn emit_main(top_level: &[&Node], idents: &IdentArena, class_name: &str) -> Result<String, CodegenError> {
    let mut emitter = Emitter { idents, class_name, buf: CodeBuffer::new() };
    for stmt in top_level {
        emitter.emit_stmt(stmt)?;
    }

    let mut out = String::new();
    writeln!(out, "  public static void main(java.lang.String[]) {{").unwrap();
    for line in emitter.buf.render(|i| format!("L{i}")) {
        writeln!(out, "    {line}").unwrap();
    }
    writeln!(out, "    return").unwrap();
    writeln!(out, "  }}").unwrap();
    Ok(out)
}

fn comparison_suffix(op: BinOp) -> &'static str {
    match op {
        BinOp::Eq => "eq",
        BinOp::Ne => "ne",
        BinOp::Lt => "lt",
        BinOp::Gt => "gt",
        BinOp::Le => "le",
        BinOp::Ge => "ge",
        _ => unreachable!("comparison_suffix only called for comparison operators"),
    }
}

struct Emitter<'a> {
    idents: &'a IdentArena,
    class_name: &'a str,
    buf: CodeBuffer,
}

impl Emitter<'_> {
    fn emit_load(&mut self, id: IdentId) {
        let desc = self.idents.get(id);
        match desc.scope_kind {
            ScopeKind::Local | ScopeKind::Param => {
                self.buf.line(format!("{}load {}", prefix(desc.type_desc.base_type()), desc.jbc_offset));
            }
            ScopeKind::Global | ScopeKind::GlobalLocal => {
                self.buf.line(format!(
                    "getstatic {}#{} _gv{}",
                    self.class_name,
                    jbc_type(desc.type_desc.base_type()),
                    desc.index
                ));
            }
        }
    }

    fn emit_store(&mut self, target: &Node) {
        let id = target.node_ident.expect("assignment target is always a resolved Ident");
        let desc = self.idents.get(id);
        match desc.scope_kind {
            ScopeKind::Local | ScopeKind::Param => {
                self.buf.line(format!("{}store {}", prefix(desc.type_desc.base_type()), desc.jbc_offset));
            }
            ScopeKind::Global | ScopeKind::GlobalLocal => {
                self.buf.line(format!(
                    "putstatic {}#{} _gv{}",
                    self.class_name,
                    jbc_type(desc.type_desc.base_type()),
                    desc.index
                ));
            }
        }
    }

    /// Two-label 0/1 materialization following a single-operand conditional
    /// branch (`if<cc>`), used once an operand pair has already been reduced
    /// to one int comparand (via `dcmpg` or `compareTo`).
    fn emit_materialize_single(&mut self, cc: &str) {
        let nonzero = self.buf.new_label();
        let end = self.buf.new_label();
        self.buf.line_with_label(format!("if{cc} "), nonzero, "");
        self.buf.line("iconst_0");
        self.buf.line_with_label("goto ", end, "");
        self.buf.label_def(nonzero);
        self.buf.line("iconst_1");
        self.buf.label_def(end);
    }

    /// Same materialization, but via the two-operand `if_icmp<cc>` family —
    /// used directly for `int`, which needs no separate compare instruction.
    fn emit_materialize_icmp(&mut self, cc: &str) {
        let taken = self.buf.new_label();
        let end = self.buf.new_label();
        self.buf.line_with_label(format!("if_icmp{cc} "), taken, "");
        self.buf.line("iconst_0");
        self.buf.line_with_label("goto ", end, "");
        self.buf.label_def(taken);
        self.buf.line("iconst_1");
        self.buf.label_def(end);
    }

    fn emit_comparison(&mut self, op: BinOp, base: BaseType) {
        let cc = comparison_suffix(op);
        match base {
            BaseType::Str => {
                self.buf.line("invokevirtual java.lang.String#int compareTo(java.lang.String)");
                self.emit_materialize_single(cc);
            }
            BaseType::Float => {
                self.buf.line("dcmpg");
                self.emit_materialize_single(cc);
            }
            _ => self.emit_materialize_icmp(cc),
        }
    }

    fn emit_binop(&mut self, op: BinOp, base: BaseType) {
        use BinOp::{Add, And, BitAnd, BitOr, Div, Eq, Ge, Gt, Le, Lt, Mod, Mul, Ne, Or, Sub};

        if base == BaseType::Str && op == Add {
            self.buf.line(format!(
                "invokestatic Runtime#{0} concat({0}, {0})",
                jbc_type(Some(BaseType::Str))
            ));
            return;
        }

        match op {
            Add => self.buf.line(format!("{}add", prefix(Some(base)))),
            Sub => self.buf.line(format!("{}sub", prefix(Some(base)))),
            Mul => self.buf.line(format!("{}mul", prefix(Some(base)))),
            Div => self.buf.line(format!("{}div", prefix(Some(base)))),
            Mod => self.buf.line(format!("{}rem", prefix(Some(base)))),
            And | BitAnd => self.buf.line("iand"),
            Or | BitOr => self.buf.line("ior"),
            Eq | Ne | Lt | Gt | Le | Ge => self.emit_comparison(op, base),
        }
    }

    fn emit_expr(&mut self, node: &Node) -> Result<(), CodegenError> {
        match &node.kind {
            NodeKind::Literal { value, .. } => match value {
                LiteralValue::Int(n) => self.buf.line(format!("ldc {n}")),
                LiteralValue::Float(v) => self.buf.line(format!("ldc2_w {v}D")),
                LiteralValue::Bool(b) => self.buf.line(if *b { "iconst_1" } else { "iconst_0" }),
                LiteralValue::Str(s) => self.buf.line(format!("ldc \"{s}\"")),
            },
            NodeKind::Ident { .. } => {
                let id = node.node_ident.expect("Ident nodes are resolved by the checker");
                self.emit_load(id);
            }
            NodeKind::BinOp { op, lhs, rhs } => {
                self.emit_expr(lhs)?;
                self.emit_expr(rhs)?;
                let base = lhs.node_type.as_ref().and_then(TypeDesc::base_type).expect("operand checked");
                self.emit_binop(*op, base);
            }
            NodeKind::Call { callee, args } => {
                for arg in args {
                    self.emit_expr(arg)?;
                }
                let NodeKind::Ident { name } = &callee.kind else { unreachable!("call callees are always Ident") };
                let id = callee.node_ident.expect("callee is resolved by the checker");
                let desc = self.idents.get(id);
                let ret_ty = desc.type_desc.return_type().cloned().unwrap_or(TypeDesc::VOID);
                let class = if desc.built_in { "Runtime" } else { self.class_name };
                let params: Vec<&'static str> =
                    desc.type_desc.params().iter().map(|p| jbc_type(p.base_type())).collect();
                self.buf.line(format!(
                    "invokestatic {class}#{} {name}({})",
                    jbc_type(ret_ty.base_type()),
                    params.join(", ")
                ));
            }
            NodeKind::TypeConvert { expr, target_type } => {
                self.emit_expr(expr)?;
                let from = expr.node_type.as_ref().and_then(TypeDesc::base_type).expect("operand checked");
                let to = target_type.base_type().expect("conversion targets are simple types");
                match (from, to) {
                    (BaseType::Int, BaseType::Float) => self.buf.line("i2d"),
                    (BaseType::Int, BaseType::Bool) => {
                        let zero = self.buf.new_label();
                        let end = self.buf.new_label();
                        self.buf.line_with_label("ifeq ", zero, "");
                        self.buf.line("iconst_1");
                        self.buf.line_with_label("goto ", end, "");
                        self.buf.label_def(zero);
                        self.buf.line("iconst_0");
                        self.buf.label_def(end);
                    }
                    _ => {
                        self.buf.line(format!(
                            "invokestatic Runtime#{} convert({})",
                            jbc_type(Some(to)),
                            jbc_type(Some(from))
                        ));
                    }
                }
            }
            other => unreachable!("{other:?} is not an expression node"),
        }
        Ok(())
    }

    fn emit_stmt(&mut self, node: &Node) -> Result<(), CodegenError> {
        match &node.kind {
            NodeKind::VarsDecl { items, .. } => {
                for item in items {
                    if let NodeKind::Assign { target, value } = &item.kind {
                        self.emit_expr(value)?;
                        self.emit_store(target);
                    }
                }
            }
            NodeKind::Assign { target, value } => {
                self.emit_expr(value)?;
                self.emit_store(target);
            }
            NodeKind::If { cond, then_branch, else_branch } => {
                self.emit_expr(cond)?;
                let else_label = self.buf.new_label();
                self.buf.line_with_label("ifeq ", else_label, "");
                self.emit_stmt(then_branch)?;
                if let Some(else_b) = else_branch {
                    let end_label = self.buf.new_label();
                    self.buf.line_with_label("goto ", end_label, "");
                    self.buf.label_def(else_label);
                    self.emit_stmt(else_b)?;
                    self.buf.label_def(end_label);
                } else {
                    self.buf.label_def(else_label);
                }
            }
            NodeKind::While { cond, body } => {
                let start = self.buf.new_label();
                let end = self.buf.new_label();
                self.buf.label_def(start);
                self.emit_expr(cond)?;
                self.buf.line_with_label("ifeq ", end, "");
                self.emit_stmt(body)?;
                self.buf.line_with_label("goto ", start, "");
                self.buf.label_def(end);
            }
            NodeKind::For { init, cond, step, body } => {
                self.emit_stmt(init)?;
                let start = self.buf.new_label();
                let end = self.buf.new_label();
                self.buf.label_def(start);
                let cond_node = cond.as_deref().expect("checker fills in a default `true` condition");
                self.emit_expr(cond_node)?;
                self.buf.line_with_label("ifeq ", end, "");
                self.emit_stmt(body)?;
                self.emit_stmt(step)?;
                self.buf.line_with_label("goto ", start, "");
                self.buf.label_def(end);
            }
            NodeKind::Return { value } => {
                self.emit_expr(value)?;
                let base = value.node_type.as_ref().and_then(TypeDesc::base_type);
                self.buf.line(return_instr(base));
            }
            NodeKind::StmtList { statements, .. } => {
                for stmt in statements {
                    self.emit_stmt(stmt)?;
                }
            }
            NodeKind::Func { .. } => {
                unreachable!("nested function declarations are rejected by the checker")
            }
            _ => {
                self.emit_expr(node)?;
                if !matches!(node.node_type.as_ref().and_then(TypeDesc::base_type), Some(BaseType::Void) | None) {
                    self.buf.line("pop");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::check_program;
    use crate::parser::parse;

    fn compile(src: &str) -> String {
        let mut ast = parse(src).unwrap();
        let mut checked = check_program(&mut ast).unwrap();
        generate(&ast, &mut checked.idents, "foo").unwrap()
    }

    #[test]
    fn class_name_sanitization_handles_leading_digit_and_punctuation() {
        assert_eq!(sanitize_class_name("foo"), "foo");
        assert_eq!(sanitize_class_name("9lives"), "_9lives");
        assert_eq!(sanitize_class_name("my-file.src"), "my_file_src");
    }

    #[test]
    fn int_function_uses_iload_iadd_offsets() {
        let jbc = compile("int square(int x) { return x * x; }");
        assert!(jbc.contains("public static int square(int x)"));
        assert!(jbc.contains("iload 0"));
        assert!(jbc.contains("imul"));
        assert!(jbc.contains("ireturn"));
    }

    #[test]
    fn global_store_uses_putstatic_with_class_prefix() {
        let jbc = compile("int x; x = 1 + 2;");
        assert!(jbc.contains("putstatic foo#int _gv0"));
    }

    #[test]
    fn double_local_consumes_two_slots() {
        let jbc = compile("int f(float a, int b) { int c; c = b; return c; }");
        assert!(jbc.contains("iload 2"));
    }

    #[test]
    fn missing_return_injects_default_and_ireturn() {
        let jbc = compile("int g() { }");
        assert!(jbc.contains("iconst_0"));
        assert!(jbc.contains("ireturn"));
    }

    #[test]
    fn builtin_calls_target_runtime_class() {
        let jbc = compile("print(to_int(\"3\"));");
        assert!(jbc.contains("invokestatic Runtime#int to_int(java.lang.String)"));
        assert!(jbc.contains("invokestatic Runtime#void print(java.lang.String)"));
    }
}
