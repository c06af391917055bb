//! End-to-end orchestration: parse → semantic check → emit SIL → emit JBC.
//!
//! Returns a `Result` instead of printing and exiting directly —
//! `stackc-cli` does the printing/exit-code translation on top.

use crate::checker::{check_program, CheckedProgram};
use crate::codegen::{jbc, sil};
use crate::error::CompileError;
use crate::ident::ScopeKind;
use crate::parser::parse;

/// Which backend(s) a `compile()` call should run, per the CLI's
/// `--msil-only`/`--jbc-only` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backends {
    Both,
    SilOnly,
    JbcOnly,
}

pub struct CompileOutput {
    pub ast_tree: String,
    pub semantic_check: String,
    pub sil: Option<String>,
    pub jbc: Option<String>,
}

/// Runs the full pipeline over `src`. `class_name` is the already-sanitized
/// JBC class name (derived by the caller from the source file's stem via
/// [`jbc::sanitize_class_name`]); SIL's class name is always `Program`.
pub fn compile(src: &str, class_name: &str, backends: Backends) -> Result<CompileOutput, CompileError> {
    let mut ast = parse(src)?;
    let ast_tree = ast.tree();

    let mut checked = check_program(&mut ast)?;
    let semantic_check = summarize_globals(&checked);

    let sil = if backends == Backends::JbcOnly {
        None
    } else {
        Some(sil::generate(&ast, &checked.idents).map_err(CompileError::Sil)?)
    };
    let jbc = if backends == Backends::SilOnly {
        None
    } else {
        Some(jbc::generate(&ast, &mut checked.idents, class_name).map_err(CompileError::Jbc)?)
    };

    Ok(CompileOutput { ast_tree, semantic_check, sil, jbc })
}

/// A one-line-per-ident summary of every top-level (`GLOBAL`/`GLOBAL_LOCAL`)
/// declaration, used as the `semantic-check:` stdout block — confirms name
/// resolution and type inference succeeded without dumping the whole AST a
/// second time.
fn summarize_globals(checked: &CheckedProgram) -> String {
    let mut lines = Vec::new();
    for (_, desc) in checked.idents.iter() {
        if desc.built_in {
            continue;
        }
        if matches!(desc.scope_kind, ScopeKind::Global | ScopeKind::GlobalLocal) {
            lines.push(format!("{}: {}", desc.name, desc.type_desc));
        }
    }
    if lines.is_empty() { "(no top-level declarations)".to_owned() } else { lines.join("\n") }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_backends_run_by_default() {
        let out = compile("int x; x = 1;", "Program", Backends::Both).unwrap();
        assert!(out.sil.is_some());
        assert!(out.jbc.is_some());
    }

    #[test]
    fn msil_only_suppresses_jbc() {
        let out = compile("int x; x = 1;", "Program", Backends::SilOnly).unwrap();
        assert!(out.sil.is_some());
        assert!(out.jbc.is_none());
    }

    #[test]
    fn jbc_only_suppresses_sil() {
        let out = compile("int x; x = 1;", "Program", Backends::JbcOnly).unwrap();
        assert!(out.sil.is_none());
        assert!(out.jbc.is_some());
    }

    #[test]
    fn parse_error_maps_to_compile_error_variant() {
        let err = compile("int;", "Program", Backends::Both).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn semantic_error_maps_to_compile_error_variant() {
        let err = compile("x = y;", "Program", Backends::Both).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn summary_lists_global_declarations() {
        let out = compile("int x; float y;", "Program", Backends::Both).unwrap();
        assert!(out.semantic_check.contains("x: int"));
        assert!(out.semantic_check.contains("y: float"));
    }
}
