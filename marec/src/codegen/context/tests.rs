use inkwell::context::Context;

use crate::diagnostics::{CompileError, Diagnostic};
use crate::driver;

fn compile_ir(source: &str) -> String {
    let context = Context::create();
    let module = driver::compile(&context, source).expect("compile failed");
    module.print_to_string().to_string()
}

fn compile_err(source: &str) -> Diagnostic {
    let context = Context::create();
    let result = driver::compile(&context, source);
    match result {
        Ok(_) => panic!("expected compilation to fail"),
        Err(CompileError::Source(diagnostic)) => diagnostic,
        Err(other) => panic!("unexpected error kind: {other}"),
    }
}

// ============================================================
// Literals and promotion
// ============================================================

#[test]
fn test_constant_arithmetic_narrowest_width() {
    // 40 and 2 are both i8; the sum folds and is widened to the i32 parameter.
    let ir = compile_ir("fn main() -> void { __mare_printi32(40 + 2); }");
    assert!(ir.contains("call void @__mare_printi32(i32 42)"), "{ir}");
}

#[test]
fn test_integer_widening_is_signed() {
    let ir = compile_ir("fn f(i8 a, i32 b) -> i32 { a + b } fn main() -> void { }");
    assert!(ir.contains("sext i8"), "{ir}");
    assert!(ir.contains("add i32"), "{ir}");
}

#[test]
fn test_int_float_mix_converts_integer_side() {
    let ir = compile_ir("fn g(i32 a, double b) -> double { a + b } fn main() -> void { }");
    assert!(ir.contains("sitofp i32"), "{ir}");
    assert!(ir.contains("fadd double"), "{ir}");
}

#[test]
fn test_float_double_mix_widens_to_double() {
    let ir = compile_ir("fn h(float a, double b) -> double { a + b } fn main() -> void { }");
    assert!(ir.contains("fpext float"), "{ir}");
    assert!(ir.contains("fadd double"), "{ir}");
}

#[test]
fn test_comparison_stays_one_bit() {
    let ir = compile_ir("fn lt(i64 a, i64 b) -> i64 { if a < b then 1 else 0 } fn main() -> void { }");
    assert!(ir.contains("icmp slt i64"), "{ir}");
    // The predicate feeds the branch directly; no widening of the i1.
    assert!(!ir.contains("uitofp"), "{ir}");
}

#[test]
fn test_mismatched_pointer_arithmetic_rejected() {
    let err = compile_err(r#"fn f(string s, i64 n) -> i64 { s + n } fn main() -> void { }"#);
    assert_eq!(err.code.as_deref(), Some("E0205"));
}

// ============================================================
// if expressions
// ============================================================

#[test]
fn test_if_same_type_arms_phi() {
    let ir = compile_ir("fn pick(i32 c) -> double { if c then 1.0 else 2.0 } fn main() -> void { }");
    assert!(ir.contains("phi double"), "{ir}");
    assert!(ir.contains("icmp ne i32"), "{ir}");
}

#[test]
fn test_if_mixed_arms_use_common_type() {
    // 1 is i8 and 400 is i16; the phi must be i16 with a conversion on the
    // then-exit path.
    let ir = compile_ir("fn pick(i32 c) -> i64 { if c then 1 else 400 } fn main() -> void { }");
    assert!(ir.contains("phi i16"), "{ir}");
}

#[test]
fn test_float_condition_compares_against_zero() {
    let ir = compile_ir("fn fc(double c) -> double { if c then 1.0 else 2.0 } fn main() -> void { }");
    assert!(ir.contains("fcmp one double"), "{ir}");
}

// ============================================================
// Block termination hygiene
// ============================================================

#[test]
fn test_no_emission_after_return() {
    // The trailing call is never emitted, so the unknown callee is not
    // even resolved.
    let ir = compile_ir("fn f() -> i64 { return 1; no_such_function(); } fn main() -> void { }");
    assert!(!ir.contains("no_such_function"), "{ir}");
    assert!(ir.contains("ret i64 1"), "{ir}");
}

#[test]
fn test_void_return_inference() {
    let ir = compile_ir("fn main() { }");
    assert!(ir.contains("define void @main"), "{ir}");
    assert!(ir.contains("ret void"), "{ir}");
}

#[test]
fn test_return_value_promoted_to_declared_type() {
    let ir = compile_ir("fn one() -> i64 { return 1; } fn main() -> void { }");
    assert!(ir.contains("ret i64 1"), "{ir}");
}

#[test]
fn test_value_from_void_function_rejected() {
    let err = compile_err("fn v() -> void { return 1; } fn main() -> void { }");
    assert_eq!(err.code.as_deref(), Some("E0207"));
}

#[test]
fn test_bare_return_in_nonvoid_rejected() {
    let err = compile_err("fn f() -> i64 { return; } fn main() -> void { }");
    assert_eq!(err.code.as_deref(), Some("E0207"));
}

#[test]
fn test_nonvoid_body_must_yield_value() {
    let err = compile_err("fn f() -> i64 { __mare_printi64(1); } fn main() -> void { }");
    assert_eq!(err.code.as_deref(), Some("E0207"));
}

// ============================================================
// for loops
// ============================================================

#[test]
fn test_for_loop_structure() {
    let ir = compile_ir("fn main() -> void { for i = 0, i < 3, 1 in putchard(42.0); }");
    assert!(ir.contains("loop:"), "{ir}");
    assert!(ir.contains("afterloop:"), "{ir}");
    assert!(ir.contains("icmp slt i8"), "{ir}");
}

#[test]
fn test_for_yields_zero_of_induction_type() {
    let ir = compile_ir("fn z() -> i64 { for i = 0, i < 3 in putchard(1.0) } fn main() -> void { }");
    assert!(ir.contains("ret i64 0"), "{ir}");
}

#[test]
fn test_for_restores_shadowed_binding() {
    // The induction variable shadows the outer double; after the loop the
    // outer binding is visible again, so no int-to-float conversion of a
    // loop slot appears.
    let ir = compile_ir(
        "fn shadow() -> double { var i = 7.0; for i = 0, i < 3 in putchard(1.0); i } \
         fn main() -> void { }",
    );
    assert!(ir.contains("ret double"), "{ir}");
    assert!(!ir.contains("sitofp"), "{ir}");
}

// ============================================================
// Variables and assignment
// ============================================================

#[test]
fn test_var_slot_uses_initializer_type() {
    let ir = compile_ir("fn main() -> void { var x = 3.14; __mare_printd(x); }");
    assert!(ir.contains("alloca double"), "{ir}");
    assert!(ir.contains("call void @__mare_printd"), "{ir}");
}

#[test]
fn test_assignment_stores_and_yields_value() {
    let ir = compile_ir("fn main() -> void { var x = 1; x = 2; __mare_printi8(x); }");
    assert!(ir.contains("store i8 2"), "{ir}");
}

#[test]
fn test_assignment_to_unknown_variable() {
    let err = compile_err("fn bad() -> void { y = 1; }");
    assert!(err.message.contains("unknown variable name"), "{}", err.message);
    assert_eq!(err.code.as_deref(), Some("E0200"));
    assert_eq!(err.span.start_line, 1);
    assert_eq!(err.span.start_col, 20);
}

#[test]
fn test_assignment_to_non_variable() {
    let err = compile_err("fn bad() -> void { 1 = 2; }");
    assert_eq!(err.code.as_deref(), Some("E0203"));
}

// ============================================================
// Calls and the prototype registry
// ============================================================

#[test]
fn test_forward_call_through_extern() {
    let ir = compile_ir(
        "extern addone(i64 x) -> i64 \
         fn main() -> void { __mare_printi64(addone(1)); } \
         fn addone(i64 x) -> i64 { x + 1 }",
    );
    assert!(ir.contains("define i64 @addone"), "{ir}");
}

#[test]
fn test_recursive_call() {
    let ir = compile_ir(
        "fn fact(i64 n) -> i64 { if n < 2 then 1 else n * fact(n - 1); } \
         fn main() -> void { __mare_printi64(fact(10)); }",
    );
    assert!(ir.contains("call i64 @fact"), "{ir}");
}

#[test]
fn test_unknown_function() {
    let err = compile_err("fn main() -> void { no_such(); }");
    assert_eq!(err.code.as_deref(), Some("E0201"));
}

#[test]
fn test_argument_count_mismatch() {
    let err = compile_err("fn f(i64 a) -> i64 { a } fn main() -> void { __mare_printi64(f(1, 2)); }");
    assert_eq!(err.code.as_deref(), Some("E0202"));
}

#[test]
fn test_conflicting_signatures() {
    let err = compile_err("extern f(i64 x) -> i64 fn f(double x) -> double { x } fn main() -> void { }");
    assert_eq!(err.code.as_deref(), Some("E0209"));
}

#[test]
fn test_redefinition_rejected() {
    let err = compile_err("fn f() -> i64 { 1 } fn f() -> i64 { 2 } fn main() -> void { }");
    assert_eq!(err.code.as_deref(), Some("E0209"));
}

// ============================================================
// User-defined operators
// ============================================================

#[test]
fn test_user_binary_operator() {
    let ir = compile_ir(
        "fn binary | 5 (i32 a, i32 b) -> i32 { a + b } \
         fn main() -> void { __mare_printi32(2 | 3); }",
    );
    assert!(ir.contains("_mare_std_binary"), "{ir}");
}

#[test]
fn test_user_unary_operator() {
    let ir = compile_ir(
        "fn unary ! (i64 v) -> i64 { if v then 0 else 1 } \
         fn main() -> void { __mare_printi64(!5); }",
    );
    assert!(ir.contains("_mare_std_unary"), "{ir}");
}

#[test]
fn test_unknown_unary_operator() {
    let err = compile_err("fn main() -> void { __mare_printi64(!1); }");
    assert_eq!(err.code.as_deref(), Some("E0206"));
}

// ============================================================
// Strings
// ============================================================

#[test]
fn test_string_literal_private_constant() {
    let ir = compile_ir(r#"fn main() -> void { __mare_printstr("hi\n"); }"#);
    assert!(ir.contains("private"), "{ir}");
    assert!(ir.contains(".str"), "{ir}");
    assert!(ir.contains(r"hi\0A\00"), "{ir}");
}

// ============================================================
// Entry point requirement
// ============================================================

#[test]
fn test_missing_main() {
    let err = compile_err("fn not_main() -> void { }");
    assert_eq!(err.code.as_deref(), Some("E0300"));
}

#[test]
fn test_nonvoid_main_does_not_count() {
    let err = compile_err("fn main() -> i64 { 1 }");
    assert_eq!(err.code.as_deref(), Some("E0300"));
}
