//! End-to-end compilation scenarios, run through the full
//! parse → check → emit SIL/JBC pipeline.

use pretty_assertions::assert_eq;
use stackc::pipeline::{compile, Backends};

/// 1. `int x; x = 1 + 2;` → SIL contains `ldc.i4 1`, `ldc.i4 2`, `add`,
/// `stsfld int32 Program::_gv0`.
#[test]
fn scenario_1_int_arithmetic_assignment() {
    let out = compile("int x; x = 1 + 2;", "Program", Backends::Both).unwrap();
    let sil = out.sil.unwrap();
    assert!(sil.contains("ldc.i4 1"));
    assert!(sil.contains("ldc.i4 2"));
    assert!(sil.contains("add"));
    assert!(sil.contains("stsfld int32 Program::_gv0"));
}

/// 2. `float y; y = 1;` → the checker wraps the literal in
/// `TypeConvert(…, FLOAT)`; SIL emits `ldc.i4 1`, `conv.r8`, `stsfld
/// float64`.
#[test]
fn scenario_2_int_literal_widened_to_float() {
    let out = compile("float y; y = 1;", "Program", Backends::Both).unwrap();
    let sil = out.sil.unwrap();
    assert!(sil.contains("ldc.i4 1"));
    assert!(sil.contains("conv.r8"));
    assert!(sil.contains("stsfld float64"));
}

/// 3. `int f(int a) { return a * 2; } print(to_int("3"));` — `print` and
/// `to_int` resolve to built-ins emitted as `class Runtime::…`; `f` to user
/// class; exit 0 (no error).
#[test]
fn scenario_3_builtins_and_user_functions_resolve() {
    let out = compile("int f(int a) { return a * 2; } print(to_int(\"3\"));", "Program", Backends::Both).unwrap();
    let sil = out.sil.unwrap();
    assert!(sil.contains("class Runtime::print"));
    assert!(sil.contains("class Runtime::to_int"));
    assert!(sil.contains(".method public static int32 f(int32 a) cil managed"));
}

/// 4. `bool b; b = 1;` → INT→BOOL conversion; SIL emits the double-`ceq`
/// idiom; JBC emits the `ifeq`-idiom.
#[test]
fn scenario_4_int_to_bool_conversion_idioms() {
    let out = compile("bool b; b = 1;", "Program", Backends::Both).unwrap();
    let sil = out.sil.unwrap();
    let jbc = out.jbc.unwrap();
    assert_eq!(sil.matches("ceq").count(), 2);
    assert!(jbc.contains("ifeq"));
}

/// 5. `x = y;` with `y` undeclared → exit code 2 with message "identifier y
/// not found" and the offending position.
#[test]
fn scenario_5_undeclared_identifier_is_semantic_error() {
    let err = compile("int x; x = y;", "Program", Backends::Both).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("'y' not found"));
}

/// 6. `int g() { }` (missing return in non-void) → generator injects
/// default `ldc.i4 0; ret` (SIL) and `iconst_0; ireturn` (JBC).
#[test]
fn scenario_6_missing_return_injects_default_value() {
    let out = compile("int g() { }", "Program", Backends::Both).unwrap();
    let sil = out.sil.unwrap();
    let jbc = out.jbc.unwrap();
    assert!(sil.contains("ldc.i4 0"));
    assert!(sil.contains("ret"));
    assert!(jbc.contains("iconst_0"));
    assert!(jbc.contains("ireturn"));
}

#[test]
fn while_loop_and_string_concat_compile_cleanly() {
    let src = r#"
        string s;
        s = "a";
        int i;
        i = 0;
        while (i < 3) {
            s = s + "b";
            i = i + 1;
        }
        println(s);
    "#;
    let out = compile(src, "Program", Backends::Both).unwrap();
    let sil = out.sil.unwrap();
    assert!(sil.contains("call string class Runtime::concat(string, string)"));
    assert!(sil.contains("class Runtime::println"));
}

#[test]
fn for_loop_with_no_condition_defaults_to_true() {
    let src = "for (int i = 0; ; i = i + 1) { if (i > 2) { return i; } }";
    // top-level `return` outside a function is rejected; this checks that an
    // absent `for` condition still parses and type-checks as `true`, by
    // wrapping it in a function instead.
    let src_in_fn = format!("int f() {{ {src} return 0; }}");
    let out = compile(&src_in_fn, "Program", Backends::Both).unwrap();
    assert!(out.sil.is_some());
}

#[test]
fn map_placeholder_is_rejected_as_open_question() {
    // The hand-written parser never produces Map* nodes (no `map` keyword),
    // so this exercises the ordinary "unknown type" path instead — the
    // placeholder variants themselves are unreachable from any program this
    // front end can parse.
    let err = compile("map x;", "Program", Backends::Both).unwrap_err();
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn argument_type_mismatch_is_folded_into_one_diagnostic() {
    let src = r#"int f(int a, int b) { return a; } f("x", "y");"#;
    let err = compile(src, "Program", Backends::Both).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    let message = err.to_string();
    assert!(message.contains("arg 0"));
    assert!(message.contains("arg 1"));
}

#[test]
fn jbc_class_name_is_derived_from_file_stem() {
    let out = compile("int x; x = 1;", "foo", Backends::JbcOnly).unwrap();
    let jbc = out.jbc.unwrap();
    assert!(jbc.contains("public class foo extends java.lang.Object"));
    assert!(jbc.contains("putstatic foo#int _gv0"));
}

#[test]
fn builtin_seeding_does_not_leak_a_bogus_void_field() {
    let out = compile("int x; x = 1;", "Program", Backends::Both).unwrap();
    let sil = out.sil.unwrap();
    let jbc = out.jbc.unwrap();
    assert!(!sil.contains("void _gv"));
    assert!(!jbc.contains("void _gv"));
}

#[test]
fn bare_return_without_a_value_is_a_parse_error() {
    let err = compile("int g() { return; }", "Program", Backends::Both).unwrap_err();
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn return_value_type_must_match_function_return_type() {
    let err = compile(r#"void f() { return "x"; }"#, "Program", Backends::Both).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn function_typed_operand_reports_operator_not_applicable() {
    let err = compile("int f() { return 1; } int y; y = f + 1;", "Program", Backends::Both).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("not applicable"));
}
