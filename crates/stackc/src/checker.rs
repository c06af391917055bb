//! Single-pass, depth-first semantic checker: name resolution, type
//! inference, implicit-conversion insertion. Mutates the AST in place
//! rather than building a parallel typed tree.

use crate::ast::{BinOp, LiteralValue, Node, NodeKind};
use crate::error::SemanticError;
use crate::ident::{IdentArena, IdentDesc, ScopeKind};
use crate::pos::Pos;
use crate::scope::{ScopeId, Scopes};
use crate::types::{binop_result, is_convertible, outgoing_conversions, TypeDesc};

/// `string read()`, `void print(string)`, `void println(string)`,
/// `int to_int(string)`, `float to_float(string)` — seeded into the root
/// scope and marked `built_in` before any user code is checked.
const BUILT_IN_SOURCE: &str = "\
string read() { }
void print(string p0) { }
void println(string p0) { }
int to_int(string p0) { }
float to_float(string p0) { }
";

pub struct CheckedProgram {
    pub scopes: Scopes,
    pub idents: IdentArena,
}

pub fn check_program(ast: &mut Node) -> Result<CheckedProgram, SemanticError> {
    let mut checker = SemanticChecker { scopes: Scopes::new(), idents: IdentArena::default() };
    checker.prepare_global_scope()?;
    let root = checker.scopes.root();
    checker.check_node(root, ast)?;
    Ok(CheckedProgram { scopes: checker.scopes, idents: checker.idents })
}

struct SemanticChecker {
    scopes: Scopes,
    idents: IdentArena,
}

impl SemanticChecker {
    fn prepare_global_scope(&mut self) -> Result<(), SemanticError> {
        let mut builtins = crate::parser::parse(BUILT_IN_SOURCE).map_err(|e| SemanticError {
            pos: e.pos,
            message: format!("built-in signature parse error: {}", e.message),
        })?;
        let root = self.scopes.root();
        self.check_node(root, &mut builtins)?;
        if let NodeKind::StmtList { statements, .. } = &builtins.kind {
            for stmt in statements {
                if let Some(id) = stmt.node_ident {
                    self.idents.get_mut(id).built_in = true;
                }
            }
        }
        self.scopes.reset_root_var_index();
        Ok(())
    }

    fn type_convert(&self, slot: &mut Node, target: &TypeDesc, pos: Pos) -> Result<(), SemanticError> {
        let Some(from) = slot.node_type.clone() else {
            return Err(SemanticError { pos, message: "expression type is not defined".into() });
        };
        if &from == target {
            return Ok(());
        }
        if from.is_simple() && target.is_simple() {
            if let (Some(fb), Some(tb)) = (from.base_type(), target.base_type()) {
                if is_convertible(fb, tb) {
                    wrap_convert(slot, target.clone());
                    return Ok(());
                }
            }
        }
        Err(SemanticError { pos, message: format!("type {from} is not convertible to {target}") })
    }

    fn check_node(&mut self, scope: ScopeId, node: &mut Node) -> Result<(), SemanticError> {
        let pos = node.pos;
        match &mut node.kind {
            NodeKind::Literal { value, .. } => {
                node.node_type = Some(TypeDesc::simple(value.base_type()));
            }

            NodeKind::Ident { name } => {
                let Some(id) = self.scopes.get_ident(scope, name) else {
                    return Err(SemanticError { pos, message: format!("identifier '{name}' not found") });
                };
                let desc = self.idents.get(id);
                node.node_type = Some(desc.type_desc.clone());
                node.node_ident = Some(id);
            }

            NodeKind::TypeRef { name } => {
                let Some(t) = TypeDesc::from_name(name) else {
                    return Err(SemanticError { pos, message: format!("unknown type '{name}'") });
                };
                node.node_type = Some(t);
            }

            NodeKind::BinOp { op, lhs, rhs } => {
                let op = *op;
                self.check_node(scope, lhs)?;
                self.check_node(scope, rhs)?;
                let lhs_type = lhs
                    .node_type
                    .clone()
                    .ok_or_else(|| SemanticError { pos, message: "expression type is not defined".into() })?;
                let rhs_type = rhs
                    .node_type
                    .clone()
                    .ok_or_else(|| SemanticError { pos, message: "expression type is not defined".into() })?;
                let (Some(lhs_base), Some(rhs_base)) = (lhs_type.base_type(), rhs_type.base_type()) else {
                    return Err(SemanticError {
                        pos,
                        message: format!("operator '{}' not applicable to ({lhs_type}, {rhs_type})", op.symbol()),
                    });
                };

                if let Some(result) = binop_result(op, lhs_base, rhs_base) {
                    node.node_type = Some(TypeDesc::simple(result));
                } else if let Some((widened, result)) =
                    outgoing_conversions(rhs_base).find_map(|t| binop_result(op, lhs_base, t).map(|r| (t, r)))
                {
                    wrap_convert(rhs, TypeDesc::simple(widened));
                    node.node_type = Some(TypeDesc::simple(result));
                } else if let Some((widened, result)) =
                    outgoing_conversions(lhs_base).find_map(|t| binop_result(op, t, rhs_base).map(|r| (t, r)))
                {
                    wrap_convert(lhs, TypeDesc::simple(widened));
                    node.node_type = Some(TypeDesc::simple(result));
                } else {
                    return Err(SemanticError {
                        pos,
                        message: format!("operator '{}' not applicable to ({lhs_base}, {rhs_base})", op.symbol()),
                    });
                }
            }

            NodeKind::Call { callee, args } => {
                self.check_node(scope, callee)?;
                let callee_type = callee
                    .node_type
                    .clone()
                    .ok_or_else(|| SemanticError { pos, message: "callee type is not defined".into() })?;
                if !callee_type.is_func() {
                    return Err(SemanticError { pos, message: "call target is not a function".into() });
                }
                for arg in args.iter_mut() {
                    self.check_node(scope, arg)?;
                }
                let params = callee_type.params().to_vec();
                if params.len() != args.len() {
                    return Err(SemanticError {
                        pos,
                        message: format!(
                            "call to '{}' expects {} argument(s), found {}",
                            callee_name(callee),
                            params.len(),
                            args.len()
                        ),
                    });
                }
                let mut mismatches = Vec::new();
                for (i, (arg, formal)) in args.iter_mut().zip(params.iter()).enumerate() {
                    if self.type_convert(arg, formal, arg.pos).is_err() {
                        let actual = arg.node_type.clone().map_or_else(|| "?".to_owned(), |t| t.to_string());
                        mismatches.push(format!("arg {i}: {actual} vs {formal}"));
                    }
                }
                if !mismatches.is_empty() {
                    return Err(SemanticError {
                        pos,
                        message: format!(
                            "actual argument types do not match formal parameter types and are not convertible ({})",
                            mismatches.join(", ")
                        ),
                    });
                }
                node.node_type = Some(callee_type.return_type().cloned().unwrap_or(TypeDesc::VOID));
            }

            NodeKind::TypeConvert { .. } => {
                // Synthetic node, already fully decorated at insertion time.
            }

            NodeKind::Assign { target, value } => {
                self.check_node(scope, target)?;
                self.check_node(scope, value)?;
                let target_type = target
                    .node_type
                    .clone()
                    .ok_or_else(|| SemanticError { pos, message: "assignment target type is not defined".into() })?;
                self.type_convert(value, &target_type, pos)?;
                node.node_type = Some(target_type);
            }

            NodeKind::VarsDecl { type_node, items } => {
                self.check_node(scope, type_node)?;
                let type_desc = type_node.node_type.clone().expect("type_node checked above");
                for item in items.iter_mut() {
                    let (name, decl_pos) = match &item.kind {
                        NodeKind::Ident { name } => (name.clone(), item.pos),
                        NodeKind::Assign { target, .. } => match &target.kind {
                            NodeKind::Ident { name } => (name.clone(), target.pos),
                            _ => unreachable!("vars decl item target is always an identifier"),
                        },
                        _ => unreachable!("vars decl item is always an identifier or assignment"),
                    };
                    let id = self
                        .scopes
                        .add_ident(scope, name, type_desc.clone(), false, None, &mut self.idents)
                        .map_err(|message| SemanticError { pos: decl_pos, message })?;
                    match &mut item.kind {
                        NodeKind::Ident { .. } => {
                            item.node_type = Some(type_desc.clone());
                            item.node_ident = Some(id);
                        }
                        NodeKind::Assign { target, value } => {
                            target.node_type = Some(type_desc.clone());
                            target.node_ident = Some(id);
                            self.check_node(scope, value)?;
                            self.type_convert(value, &type_desc, item.pos)?;
                            item.node_type = Some(type_desc.clone());
                        }
                        _ => unreachable!(),
                    }
                }
                node.node_type = Some(TypeDesc::VOID);
            }

            NodeKind::Param { type_node, name } => {
                self.check_node(scope, type_node)?;
                let type_desc = type_node.node_type.clone().expect("type_node checked above");
                let id = self
                    .scopes
                    .add_ident(scope, name.clone(), type_desc.clone(), false, Some(ScopeKind::Param), &mut self.idents)
                    .map_err(|message| SemanticError { pos, message })?;
                node.node_type = Some(type_desc);
                node.node_ident = Some(id);
            }

            NodeKind::Func { return_type, name, params, body } => {
                if self.scopes.curr_func(scope).is_some() {
                    return Err(SemanticError { pos, message: "nested function declarations are not allowed".into() });
                }
                self.check_node(scope, return_type)?;
                let ret_type = return_type.node_type.clone().expect("return_type checked above");

                let func_scope = self.scopes.new_child(scope);
                // Placeholder so `func_scope.func` is non-`None` while params are
                // checked (routes their `add_ident` calls to this scope's PARAM
                // counter); replaced below by the function's real ident once it
                // exists. Marked `built_in` so the backends' global-field emission
                // loops, which walk every entry in the shared arena, skip it.
                let marker = self.idents.insert(IdentDesc {
                    name: String::new(),
                    type_desc: TypeDesc::VOID,
                    scope_kind: ScopeKind::Global,
                    index: 0,
                    built_in: true,
                    jbc_offset: 0,
                });
                self.scopes.set_func(func_scope, marker);

                for param in params.iter_mut() {
                    self.check_node(func_scope, param)?;
                }
                let param_types: Vec<TypeDesc> =
                    params.iter().map(|p| p.node_type.clone().expect("param checked above")).collect();
                let func_type = TypeDesc::func(ret_type, param_types);

                let global_scope = self.scopes.curr_global(scope);
                let real_ident = self
                    .scopes
                    .add_ident(global_scope, name.clone(), func_type, false, None, &mut self.idents)
                    .map_err(|message| SemanticError { pos, message })?;
                self.scopes.set_func(func_scope, real_ident);
                node.node_ident = Some(real_ident);

                self.check_node(func_scope, body)?;
                node.node_type = Some(TypeDesc::VOID);
            }

            NodeKind::Return { value } => {
                let Some(func_id) = self.scopes.curr_func(scope) else {
                    return Err(SemanticError { pos, message: "return is only valid inside a function".into() });
                };
                let ret_type = self.idents.get(func_id).type_desc.return_type().cloned().unwrap_or(TypeDesc::VOID);
                let ret_scope = self.scopes.new_child(scope);
                self.check_node(ret_scope, value)?;
                self.type_convert(value, &ret_type, pos)?;
                node.node_type = Some(ret_type);
            }

            NodeKind::If { cond, then_branch, else_branch } => {
                self.check_node(scope, cond)?;
                self.type_convert(cond, &TypeDesc::BOOL, cond.pos)?;
                let then_scope = self.scopes.new_child(scope);
                self.check_node(then_scope, then_branch)?;
                if let Some(else_b) = else_branch {
                    let else_scope = self.scopes.new_child(scope);
                    self.check_node(else_scope, else_b)?;
                }
                node.node_type = Some(TypeDesc::VOID);
            }

            NodeKind::While { cond, body } => {
                self.check_node(scope, cond)?;
                self.type_convert(cond, &TypeDesc::BOOL, cond.pos)?;
                let body_scope = self.scopes.new_child(scope);
                self.check_node(body_scope, body)?;
                node.node_type = Some(TypeDesc::VOID);
            }

            NodeKind::For { init, cond, step, body } => {
                let for_scope = self.scopes.new_child(scope);
                self.check_node(for_scope, init)?;
                if cond.is_none() {
                    *cond = Some(Box::new(Node::new(pos, NodeKind::Literal { text: "true".into(), value: LiteralValue::Bool(true) })));
                }
                let cond_node = cond.as_mut().expect("just filled in above");
                self.check_node(for_scope, cond_node)?;
                let cond_pos = cond_node.pos;
                self.type_convert(cond_node, &TypeDesc::BOOL, cond_pos)?;
                self.check_node(for_scope, step)?;
                let body_scope = self.scopes.new_child(for_scope);
                self.check_node(body_scope, body)?;
                node.node_type = Some(TypeDesc::VOID);
            }

            NodeKind::StmtList { statements, program } => {
                let list_scope = if *program { scope } else { self.scopes.new_child(scope) };
                for stmt in statements.iter_mut() {
                    self.check_node(list_scope, stmt)?;
                }
                node.node_type = Some(TypeDesc::VOID);
            }

            NodeKind::MapType { .. } | NodeKind::MapDeclaration { .. } | NodeKind::MapAccess { .. } => {
                return Err(SemanticError {
                    pos,
                    message: "map types are not implemented (open question upstream)".into(),
                });
            }
        }
        Ok(())
    }
}

fn callee_name(node: &Node) -> &str {
    match &node.kind {
        NodeKind::Ident { name } => name,
        _ => "<expr>",
    }
}

/// Replaces `slot` in place with `TypeConvert(slot, target)` — the checker's
/// only structural AST mutation beyond setting `node_type`/`node_ident`.
fn wrap_convert(slot: &mut Node, target: TypeDesc) {
    let pos = slot.pos;
    let placeholder = Node::new(pos, NodeKind::Literal { text: String::new(), value: LiteralValue::Int(0) });
    let original = std::mem::replace(slot, placeholder);
    *slot = Node {
        pos,
        node_type: Some(target.clone()),
        node_ident: None,
        kind: NodeKind::TypeConvert { expr: Box::new(original), target_type: target },
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn check(src: &str) -> Result<(Node, CheckedProgram), SemanticError> {
        let mut ast = parse(src).unwrap();
        let checked = check_program(&mut ast)?;
        Ok((ast, checked))
    }

    #[test]
    fn int_arithmetic_assigns_cleanly() {
        let (ast, _) = check("int x; x = 1 + 2;").unwrap();
        let NodeKind::StmtList { statements, .. } = &ast.kind else { panic!() };
        assert_eq!(statements[1].node_type, Some(TypeDesc::INT));
    }

    #[test]
    fn float_var_assigned_int_literal_inserts_type_convert() {
        let (ast, _) = check("float y; y = 1;").unwrap();
        let NodeKind::StmtList { statements, .. } = &ast.kind else { panic!() };
        let NodeKind::Assign { value, .. } = &statements[1].kind else { panic!() };
        assert!(matches!(value.kind, NodeKind::TypeConvert { .. }));
    }

    #[test]
    fn bool_assigned_int_literal_converts() {
        let (ast, _) = check("bool b; b = 1;").unwrap();
        let NodeKind::StmtList { statements, .. } = &ast.kind else { panic!() };
        let NodeKind::Assign { value, .. } = &statements[1].kind else { panic!() };
        assert!(matches!(value.kind, NodeKind::TypeConvert { .. }));
    }

    #[test]
    fn undeclared_identifier_is_reported_with_position() {
        let err = check("x = y;").unwrap_err();
        assert!(err.message.contains("not found"));
    }

    #[test]
    fn builtin_and_user_function_calls_resolve() {
        let (_, checked) = check("int f(int a) { return a * 2; } print(to_int(\"3\"));").unwrap();
        let _ = checked;
    }

    #[test]
    fn missing_return_value_in_non_void_function_is_allowed_to_parse_and_check() {
        check("int g() { }").unwrap();
    }
}
