//! CLR-style textual assembly emitter.
//!
//! Each operator is one non-fallthrough `match` arm, so `!=` always emits
//! compare-then-invert and `==` always emits compare alone.

use std::fmt::Write as _;

use crate::ast::{BinOp, LiteralValue, Node, NodeKind};
use crate::error::CodegenError;
use crate::ident::{IdentArena, IdentId, ScopeKind};
use crate::types::{BaseType, TypeDesc};

use super::{find_vars_decls, CodeBuffer};

fn sil_type(base: Option<BaseType>) -> &'static str {
    match base {
        Some(BaseType::Void) | None => "void",
        Some(BaseType::Int) => "int32",
        Some(BaseType::Float) => "float64",
        Some(BaseType::Bool) => "bool",
        Some(BaseType::Str) => "string",
    }
}

fn default_push(base: Option<BaseType>) -> Option<String> {
    match base {
        Some(BaseType::Int | BaseType::Bool) => Some("ldc.i4 0".to_owned()),
        Some(BaseType::Float) => Some("ldc.r8 0".to_owned()),
        Some(BaseType::Str) => Some("ldstr \"\"".to_owned()),
        _ => None,
    }
}

/// Does `body`'s statement list end in a `Return`? Only the last top-level
/// statement is checked, not full control-flow reachability.
fn body_ends_in_return(body: &Node) -> bool {
    match &body.kind {
        NodeKind::StmtList { statements, .. } => {
            matches!(statements.last().map(|s| &s.kind), Some(NodeKind::Return { .. }))
        }
        NodeKind::Return { .. } => true,
        _ => false,
    }
}

pub fn generate(program: &Node, idents: &IdentArena) -> Result<String, CodegenError> {
    let NodeKind::StmtList { statements, program: true } = &program.kind else {
        return Err(CodegenError { message: "SIL generation expects a program root".into() });
    };

    let mut out = String::new();
    writeln!(out, ".assembly program {{ }}").unwrap();
    writeln!(out, ".class public Program {{").unwrap();

    for (_, desc) in idents.iter() {
        if desc.built_in || desc.type_desc.is_func() {
            continue;
        }
        if matches!(desc.scope_kind, ScopeKind::Global | ScopeKind::GlobalLocal) {
            writeln!(out, "  .field public static {} _gv{}", sil_type(desc.type_desc.base_type()), desc.index).unwrap();
        }
    }

    let mut top_level = Vec::new();
    for stmt in statements {
        if matches!(stmt.kind, NodeKind::Func { .. }) {
            out.push_str(&emit_func(stmt, idents)?);
        } else {
            top_level.push(stmt);
        }
    }
    out.push_str(&emit_main(&top_level, idents)?);

    out.push_str("}\n");
    Ok(out)
}

fn emit_func(node: &Node, idents: &IdentArena) -> Result<String, CodegenError> {
    let NodeKind::Func { return_type, name, params, body } = &node.kind else {
        unreachable!("emit_func only called on Func nodes")
    };
    let ret_base = return_type.node_type.as_ref().and_then(TypeDesc::base_type);

    let param_list: Vec<String> = params
        .iter()
        .map(|p| {
            let NodeKind::Param { name, .. } = &p.kind else { unreachable!("Func params are always Param nodes") };
            format!("{} {name}", sil_type(p.node_type.as_ref().and_then(TypeDesc::base_type)))
        })
        .collect();

    let mut emitter = Emitter { idents, buf: CodeBuffer::new() };
    emitter.emit_stmt(body)?;

    let mut locals: Vec<(u32, BaseType)> = Vec::new();
    for decl in find_vars_decls(body) {
        let NodeKind::VarsDecl { items, .. } = &decl.kind else { continue };
        for item in items {
            let ident_id = local_ident_of(item);
            if let Some(id) = ident_id {
                let desc = idents.get(id);
                if desc.scope_kind == ScopeKind::Local {
                    locals.push((desc.index, desc.type_desc.base_type().expect("locals are simple-typed")));
                }
            }
        }
    }
    locals.sort_by_key(|(index, _)| *index);

    let mut out = String::new();
    writeln!(out, "  .method public static {} {name}({}) cil managed {{", sil_type(ret_base), param_list.join(", "))
        .unwrap();
    if !locals.is_empty() {
        let decls: Vec<String> = locals.iter().map(|(i, t)| format!("{} V_{i}", sil_type(Some(*t)))).collect();
        writeln!(out, "    .locals init ({})", decls.join(", ")).unwrap();
    }
    for line in emitter.buf.render(|i| format!("IL_{i}")) {
        writeln!(out, "    {line}").unwrap();
    }
    if !body_ends_in_return(body) {
        if let Some(push) = default_push(ret_base) {
            writeln!(out, "    {push}").unwrap();
        }
        writeln!(out, "    ret").unwrap();
    }
    writeln!(out, "  }}").unwrap();
    Ok(out)
}

fn emit_main(top_level: &[&Node], idents: &IdentArena) -> Result<String, CodegenError> {
    let mut emitter = Emitter { idents, buf: CodeBuffer::new() };
    for stmt in top_level {
        emitter.emit_stmt(stmt)?;
    }

    let mut out = String::new();
    writeln!(out, "  .method public static void Main() {{").unwrap();
    writeln!(out, "    .entrypoint").unwrap();
    for line in emitter.buf.render(|i| format!("IL_{i}")) {
        writeln!(out, "    {line}").unwrap();
    }
    writeln!(out, "    ret").unwrap();
    writeln!(out, "  }}").unwrap();
    Ok(out)
}

/// The declared ident of a `VarsDecl` item, whether it's a bare `Ident` or
/// an `Assign` whose target is one.
fn local_ident_of(item: &Node) -> Option<IdentId> {
    match &item.kind {
        NodeKind::Ident { .. } => item.node_ident,
        NodeKind::Assign { target, .. } => target.node_ident,
        _ => None,
    }
}

struct Emitter<'a> {
    idents: &'a IdentArena,
    buf: CodeBuffer,
}

impl Emitter<'_> {
    fn emit_load(&mut self, id: IdentId) {
        let desc = self.idents.get(id);
        match desc.scope_kind {
            ScopeKind::Local => self.buf.line(format!("ldloc {}", desc.index)),
            ScopeKind::Param => self.buf.line(format!("ldarg {}", desc.index)),
            ScopeKind::Global | ScopeKind::GlobalLocal => {
                self.buf.line(format!("ldsfld {} Program::_gv{}", sil_type(desc.type_desc.base_type()), desc.index));
            }
        }
    }

    fn emit_store(&mut self, target: &Node) {
        let id = target.node_ident.expect("assignment target is always a resolved Ident");
        let desc = self.idents.get(id);
        match desc.scope_kind {
            ScopeKind::Local => self.buf.line(format!("stloc {}", desc.index)),
            ScopeKind::Param => self.buf.line(format!("starg {}", desc.index)),
            ScopeKind::Global | ScopeKind::GlobalLocal => {
                self.buf.line(format!("stsfld {} Program::_gv{}", sil_type(desc.type_desc.base_type()), desc.index));
            }
        }
    }

    fn emit_bool_invert(&mut self) {
        self.buf.line("ldc.i4 0");
        self.buf.line("ceq");
    }

    fn emit_ordering(&mut self, op: BinOp) {
        match op {
            BinOp::Lt => self.buf.line("clt"),
            BinOp::Gt => self.buf.line("cgt"),
            BinOp::Le => {
                self.buf.line("cgt");
                self.emit_bool_invert();
            }
            BinOp::Ge => {
                self.buf.line("clt");
                self.emit_bool_invert();
            }
            _ => unreachable!("emit_ordering only called for ordering operators"),
        }
    }

    fn emit_binop(&mut self, op: BinOp, base: BaseType) {
        use BinOp::{Add, And, BitAnd, BitOr, Div, Eq, Ge, Gt, Le, Lt, Mod, Mul, Ne, Or, Sub};

        if base == BaseType::Str {
            match op {
                Add => {
                    self.buf.line("call string class Runtime::concat(string, string)");
                    return;
                }
                Eq => {
                    self.buf.line("call bool class System.String::op_Equality(string, string)");
                    return;
                }
                Ne => {
                    self.buf.line("call bool class System.String::op_Inequality(string, string)");
                    return;
                }
                Lt | Gt | Le | Ge => {
                    self.buf.line("call int32 class Runtime::compare(string, string)");
                    self.buf.line("ldc.i4 0");
                    self.emit_ordering(op);
                    return;
                }
                _ => {}
            }
        }

        match op {
            Add => self.buf.line("add"),
            Sub => self.buf.line("sub"),
            Mul => self.buf.line("mul"),
            Div => self.buf.line("div"),
            Mod => self.buf.line("rem"),
            And | BitAnd => self.buf.line("and"),
            Or | BitOr => self.buf.line("or"),
            Eq => self.buf.line("ceq"),
            Ne => {
                self.buf.line("ceq");
                self.emit_bool_invert();
            }
            Lt | Gt | Le | Ge => self.emit_ordering(op),
        }
    }

    fn emit_expr(&mut self, node: &Node) -> Result<(), CodegenError> {
        match &node.kind {
            NodeKind::Literal { value, .. } => match value {
                LiteralValue::Int(n) => self.buf.line(format!("ldc.i4 {n}")),
                LiteralValue::Float(v) => self.buf.line(format!("ldc.r8 {v}")),
                LiteralValue::Bool(b) => self.buf.line(format!("ldc.i4 {}", u8::from(*b))),
                LiteralValue::Str(s) => self.buf.line(format!("ldstr \"{s}\"")),
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
                let class = if desc.built_in { "Runtime" } else { "Program" };
                let params: Vec<&'static str> =
                    desc.type_desc.params().iter().map(|p| sil_type(p.base_type())).collect();
                self.buf.line(format!(
                    "call {} class {class}::{name}({})",
                    sil_type(ret_ty.base_type()),
                    params.join(", ")
                ));
            }
            NodeKind::TypeConvert { expr, target_type } => {
                self.emit_expr(expr)?;
                let from = expr.node_type.as_ref().and_then(TypeDesc::base_type).expect("operand checked");
                let to = target_type.base_type().expect("conversion targets are simple types");
                match (from, to) {
                    (BaseType::Int, BaseType::Float) => self.buf.line("conv.r8"),
                    (BaseType::Int, BaseType::Bool) => {
                        self.buf.line("ldc.i4 0");
                        self.buf.line("ceq");
                        self.buf.line("ldc.i4 0");
                        self.buf.line("ceq");
                    }
                    _ => {
                        self.buf.line(format!(
                            "call {} class Runtime::convert({})",
                            sil_type(Some(to)),
                            sil_type(Some(from))
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
                self.buf.line_with_label("brfalse ", else_label, "");
                self.emit_stmt(then_branch)?;
                if let Some(else_b) = else_branch {
                    let end_label = self.buf.new_label();
                    self.buf.line_with_label("br ", end_label, "");
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
                self.buf.line_with_label("brfalse ", end, "");
                self.emit_stmt(body)?;
                self.buf.line_with_label("br ", start, "");
                self.buf.label_def(end);
            }
            NodeKind::For { init, cond, step, body } => {
                self.emit_stmt(init)?;
                let start = self.buf.new_label();
                let end = self.buf.new_label();
                self.buf.label_def(start);
                let cond_node = cond.as_deref().expect("checker fills in a default `true` condition");
                self.emit_expr(cond_node)?;
                self.buf.line_with_label("brfalse ", end, "");
                self.emit_stmt(body)?;
                self.emit_stmt(step)?;
                self.buf.line_with_label("br ", start, "");
                self.buf.label_def(end);
            }
            NodeKind::Return { value } => {
                self.emit_expr(value)?;
                self.buf.line("ret");
            }
            NodeKind::StmtList { statements, .. } => {
                for stmt in statements {
                    self.emit_stmt(stmt)?;
                }
            }
            NodeKind::Func { .. } => {
                unreachable!("nested function declarations are rejected by the checker")
            }
            // An expression used as a statement (in practice, a bare call):
            // a non-void result is left on the stack and must be discarded.
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
        let checked = check_program(&mut ast).unwrap();
        generate(&ast, &checked.idents).unwrap()
    }

    #[test]
    fn int_assignment_emits_arithmetic_and_static_store() {
        let sil = compile("int x; x = 1 + 2;");
        assert!(sil.contains("ldc.i4 1"));
        assert!(sil.contains("ldc.i4 2"));
        assert!(sil.contains("add"));
        assert!(sil.contains("stsfld int32 Program::_gv0"));
    }

    #[test]
    fn float_assignment_converts_int_literal() {
        let sil = compile("float y; y = 1;");
        assert!(sil.contains("ldc.i4 1"));
        assert!(sil.contains("conv.r8"));
        assert!(sil.contains("stsfld float64 Program::_gv0"));
    }

    #[test]
    fn bool_assignment_uses_double_ceq_idiom() {
        let sil = compile("bool b; b = 1;");
        let idx = sil.find("ldc.i4 1").unwrap();
        let rest = &sil[idx..];
        assert_eq!(rest.matches("ceq").count(), 2);
    }

    #[test]
    fn user_function_and_builtin_calls_target_distinct_classes() {
        let sil = compile("int f(int a) { return a * 2; } print(to_int(\"3\"));");
        assert!(sil.contains("class Runtime::to_int"));
        assert!(sil.contains("class Runtime::print"));
        assert!(sil.contains(".method public static int32 f(int32 a) cil managed"));
    }

    #[test]
    fn missing_return_injects_default_value() {
        let sil = compile("int g() { }");
        assert!(sil.contains("ldc.i4 0"));
        assert!(sil.contains("ret"));
    }

    #[test]
    fn not_equal_compares_then_inverts_distinctly_from_equal() {
        let sil = compile("bool r; r = 1 != 2;");
        assert!(sil.contains("ceq"));
        // the invert idiom appears (compare, then ldc.i4 0 / ceq)
        let ceq_count = sil.matches("ceq").count();
        assert!(ceq_count >= 2);
    }
}
