//! Whole-program compilation tests.
//!
//! Each scenario compiles a complete Mare program in-process and checks
//! either the produced IR or the diagnostic. Object-file emission runs
//! against the host target through a temp directory.

use inkwell::context::Context;

use marec::diagnostics::CompileError;
use marec::driver;

fn compile_ir(source: &str) -> String {
    let context = Context::create();
    let module = driver::compile(&context, source).expect("compile failed");
    module.print_to_string().to_string()
}

fn compile_err(source: &str) -> marec::Diagnostic {
    let context = Context::create();
    let result = driver::compile(&context, source);
    match result {
        Ok(_) => panic!("expected compilation to fail"),
        Err(CompileError::Source(diagnostic)) => diagnostic,
        Err(other) => panic!("unexpected error kind: {other}"),
    }
}

#[test]
fn scenario_print_constant_arithmetic() {
    let ir = compile_ir("fn main() -> void { __mare_printi32(40 + 2); }");
    assert!(ir.contains("call void @__mare_printi32(i32 42)"), "{ir}");
    assert!(ir.contains("declare void @__mare_printi32(i32"), "{ir}");
}

#[test]
fn scenario_recursive_factorial() {
    let ir = compile_ir(
        "fn fact(i64 n) -> i64 { if n < 2 then 1 else n * fact(n - 1); } \
         fn main() -> void { __mare_printi64(fact(10)); }",
    );
    assert!(ir.contains("define i64 @fact"), "{ir}");
    assert!(ir.contains("icmp slt i64"), "{ir}");
    assert!(ir.contains("call i64 @fact"), "{ir}");
}

#[test]
fn scenario_counting_loop() {
    let ir = compile_ir("fn main() -> void { for i = 0, i < 3, 1 in __mare_printi32(i); }");
    assert!(ir.contains("loop:"), "{ir}");
    assert!(ir.contains("afterloop:"), "{ir}");
    // The i8 induction variable is widened to the i32 parameter.
    assert!(ir.contains("sext i8"), "{ir}");
}

#[test]
fn scenario_user_defined_operator() {
    let ir = compile_ir(
        "fn binary | 5 (i32 a, i32 b) -> i32 { a + b } \
         fn main() -> void { __mare_printi32(2 | 3); }",
    );
    assert!(ir.contains("_mare_std_binary"), "{ir}");
}

#[test]
fn scenario_main_without_arrow_is_void() {
    let ir = compile_ir("fn main() { }");
    assert!(ir.contains("define void @main"), "{ir}");
    assert!(ir.contains("ret void"), "{ir}");
}

#[test]
fn scenario_var_binding() {
    let ir = compile_ir("fn main() -> void { var x = 3.14; __mare_printd(x); }");
    assert!(ir.contains("alloca double"), "{ir}");
    assert!(ir.contains("call void @__mare_printd"), "{ir}");
}

#[test]
fn scenario_unknown_variable_is_located() {
    let err = compile_err("fn bad() -> void { y = 1; }");
    assert!(err.message.contains("unknown variable name"), "{}", err.message);
    assert_eq!((err.span.start_line, err.span.start_col), (1, 20));
}

#[test]
fn scenario_missing_main() {
    let err = compile_err(
        "fn helper(i64 x) -> i64 { x + 1 } \
         extern sinval(double x) -> double",
    );
    assert_eq!(err.code.as_deref(), Some("E0300"));
    assert!(err
        .suggestions
        .iter()
        .any(|s| s.contains("fn main() -> void")));
}

#[test]
fn scenario_string_escapes() {
    let ir = compile_ir(r#"fn main() -> void { __mare_printstr("a\tb\x21\n"); }"#);
    assert!(ir.contains(r"a\09b!\0A\00"), "{ir}");
}

#[test]
fn scenario_runtime_math_without_extern() {
    // Runtime intrinsics resolve from the seeded prototype registry.
    let ir = compile_ir("fn main() -> void { __mare_printd(__mare_sqrtd(2.0)); }");
    assert!(ir.contains("declare double @__mare_sqrtd(double"), "{ir}");
}

#[test]
fn scenario_user_extern_still_works() {
    let ir = compile_ir(
        "extern myfn(double x) -> double \
         fn main() -> void { __mare_printd(myfn(1.0)); }",
    );
    assert!(ir.contains("declare double @myfn(double"), "{ir}");
}

#[test]
fn scenario_top_level_expression_wrapped() {
    let ir = compile_ir("putchard(65.0); fn main() -> void { }");
    assert!(ir.contains("define void @__anon_expr"), "{ir}");
}

#[test]
fn emit_object_file_for_host() {
    let context = Context::create();
    let module = driver::compile(&context, "fn main() -> void { }").expect("compile failed");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("out.o");
    marec::codegen::emit_object(&module, &path).expect("object emission failed");

    let metadata = std::fs::metadata(&path).expect("object file missing");
    assert!(metadata.len() > 0);
}
