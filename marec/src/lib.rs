//! # Mare Compiler Library
//!
//! The compiler core for Mare, a small statically-typed, expression-oriented
//! language with user-definable unary and binary operators. Mare compiles
//! ahead of time to a native object file and links against a small C-ABI
//! runtime (`mare-runtime`) for printing and elementary math.
//!
//! ## Pipeline
//!
//! ```text
//! Source -> Lexer -> Parser -> AST -> Codegen (LLVM IR) -> Object file
//! ```
//!
//! Compilation is single-threaded and fatal-on-first-error: every stage
//! reports through [`diagnostics::Diagnostic`] and the first error aborts.
//!
//! ## Quick start
//!
//! ```no_run
//! use inkwell::context::Context;
//! use marec::driver;
//!
//! let source = "fn main() -> void { __mare_printi32(40 + 2); }";
//! let context = Context::create();
//! let module = driver::compile(&context, source).expect("compile failed");
//! println!("{}", module.print_to_string().to_string());
//! ```
//!
//! ## Module overview
//!
//! - [`span`] - source location tracking
//! - [`lexer`] - tokenisation and numeric literal classification
//! - [`ast`] - expression, prototype, and function nodes
//! - [`parser`] - recursive descent with precedence climbing
//! - [`diagnostics`] - fatal error reporting
//! - [`codegen`] - LLVM IR emission and object serialization
//! - [`driver`] - the top-level compile loop

pub mod ast;
pub mod codegen;
pub mod diagnostics;
pub mod driver;
pub mod lexer;
pub mod parser;
pub mod span;

// Re-export commonly used types.
pub use diagnostics::{CompileError, Diagnostic, DiagnosticEmitter, ErrorCode, Severity};
pub use lexer::{Lexer, NumberValue, Token, TokenKind};
pub use parser::Parser;
pub use span::Span;
