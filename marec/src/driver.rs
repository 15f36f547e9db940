//! The top-level driver loop.
//!
//! Parsing and emission are interleaved per top-level form, so a user
//! operator definition can reshape how the rest of the file parses. The
//! pipeline is a pull chain: cursor → tokens → AST → IR module.

use inkwell::context::Context;
use inkwell::module::Module;

use crate::ast::Ty;
use crate::codegen::CodegenContext;
use crate::diagnostics::{CompileError, Diagnostic, ErrorCode};
use crate::lexer::TokenKind;
use crate::parser::Parser;
use crate::span::Span;

/// Name of the LLVM module produced per compilation.
pub const MODULE_NAME: &str = "mare";

/// The entry point every program must define: `fn main() -> void`.
pub const ENTRY_POINT: &str = "main";

/// Compile one source file into an LLVM module.
///
/// Top-level forms are dispatched on the current token: `;` is skipped,
/// `fn` is a definition, `extern` a declaration, and anything else a
/// top-level expression wrapped in an anonymous void function. The program
/// must define `fn main() -> void`.
pub fn compile<'ctx>(context: &'ctx Context, source: &str) -> Result<Module<'ctx>, CompileError> {
    let module = context.create_module(MODULE_NAME);
    let builder = context.create_builder();
    let mut codegen = CodegenContext::new(context, &module, &builder);
    let mut parser = Parser::new(source);
    let mut found_main = false;

    loop {
        if parser.at_eof() {
            break;
        }
        if parser.at_op(';') {
            parser.bump();
            continue;
        }

        match parser.current_kind() {
            TokenKind::Fn => {
                let function = parser.parse_definition()?;
                if function.proto.name == ENTRY_POINT && function.proto.ret == Ty::Void {
                    found_main = true;
                }
                codegen.compile_function(&function, parser.precedences_mut())?;
            }
            TokenKind::Extern => {
                let proto = parser.parse_extern()?;
                codegen.compile_extern(proto)?;
            }
            _ => {
                let function = parser.parse_top_level_expr()?;
                codegen.compile_function(&function, parser.precedences_mut())?;
            }
        }
    }

    if !found_main {
        return Err(Diagnostic::error(
            "missing required `main` function entry point",
            Span::dummy(),
        )
        .with_error_code(ErrorCode::MissingMain)
        .into());
    }

    Ok(module)
}
