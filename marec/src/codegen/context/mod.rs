//! The code generation context.
//!
//! [`CodegenContext`] holds the LLVM context, module, and builder for one
//! compilation, plus the per-function symbol table of allocation slots and
//! the process-wide prototype registry. Every AST node lowers through
//! `compile_expr`, which returns the IR value the node produces, with
//! `None` for statements that yield nothing (a `return`, a void call).
//!
//! Mutable locals are emitted through stack slots (`alloca` in the entry
//! block) rather than SSA values; the mem2reg pass promotes them later.

use std::cell::Cell;
use std::collections::HashMap;

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::types::BasicTypeEnum;
use inkwell::values::{FunctionValue, PointerValue};

use crate::ast::{FnKind, Function, Prototype};
use crate::codegen::runtime;
use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::span::Span;

mod control;
mod expr;
mod types;

#[cfg(test)]
mod tests;

/// A stack slot backing one mutable local: the cell and its allocated type.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LocalSlot<'ctx> {
    pub ptr: PointerValue<'ctx>,
    pub ty: BasicTypeEnum<'ctx>,
}

/// Code generation state for one compilation.
pub struct CodegenContext<'ctx, 'a> {
    pub(crate) context: &'ctx Context,
    pub(crate) module: &'a Module<'ctx>,
    pub(crate) builder: &'a Builder<'ctx>,
    /// Symbol table of the function currently being emitted.
    pub(crate) named_values: HashMap<String, LocalSlot<'ctx>>,
    /// Prototype registry: resolves calls across forward declarations,
    /// definitions, and operator definitions. Seeded with the runtime ABI.
    pub(crate) function_protos: HashMap<String, Prototype>,
    pub(crate) current_fn: Option<FunctionValue<'ctx>>,
    /// The source location of the node currently being lowered. Distinct
    /// from the lex cursor, which has already advanced past it.
    cursor: Cell<Span>,
}

impl<'ctx, 'a> CodegenContext<'ctx, 'a> {
    pub fn new(context: &'ctx Context, module: &'a Module<'ctx>, builder: &'a Builder<'ctx>) -> Self {
        let function_protos = runtime::intrinsic_prototypes()
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();

        Self {
            context,
            module,
            builder,
            named_values: HashMap::new(),
            function_protos,
            current_fn: None,
            cursor: Cell::new(Span::dummy()),
        }
    }

    // ============================================================
    // Cursor and error helpers
    // ============================================================

    pub(crate) fn set_cursor(&self, span: Span) {
        self.cursor.set(span);
    }

    pub(crate) fn cursor(&self) -> Span {
        self.cursor.get()
    }

    /// Wrap a builder-level failure as a diagnostic at the codegen cursor.
    pub(crate) fn llvm_err(&self, err: impl std::fmt::Display) -> Diagnostic {
        Diagnostic::error(format!("llvm error: {err}"), self.cursor())
    }

    /// Whether the block the builder points at already has a terminator.
    pub(crate) fn block_terminated(&self) -> bool {
        self.builder
            .get_insert_block()
            .and_then(|block| block.get_terminator())
            .is_some()
    }

    // ============================================================
    // Function lookup and declaration
    // ============================================================

    /// Declare a prototype in the module with external linkage.
    fn declare_prototype(&self, proto: &Prototype) -> Result<FunctionValue<'ctx>, Diagnostic> {
        let fn_type = self.fn_type(proto)?;
        let function = self
            .module
            .add_function(&proto.name, fn_type, Some(Linkage::External));
        for (param, value) in proto.params.iter().zip(function.get_param_iter()) {
            value.set_name(&param.name);
        }
        Ok(function)
    }

    /// Find the module's function for `proto`, or declare it; reject a
    /// declaration whose signature conflicts with an earlier one.
    fn get_or_declare(&self, proto: &Prototype) -> Result<FunctionValue<'ctx>, Diagnostic> {
        match self.module.get_function(&proto.name) {
            Some(existing) => {
                if existing.get_type() != self.fn_type(proto)? {
                    return Err(Diagnostic::error(
                        format!("conflicting signature for `{}`", proto.name),
                        proto.span,
                    )
                    .with_error_code(ErrorCode::Redefinition));
                }
                Ok(existing)
            }
            None => self.declare_prototype(proto),
        }
    }

    /// Resolve a callee: the module first, then the prototype registry
    /// (emitting the declaration on demand), else `None`.
    pub(crate) fn get_function(
        &mut self,
        name: &str,
    ) -> Result<Option<FunctionValue<'ctx>>, Diagnostic> {
        if let Some(function) = self.module.get_function(name) {
            return Ok(Some(function));
        }
        if let Some(proto) = self.function_protos.get(name).cloned() {
            return Ok(Some(self.declare_prototype(&proto)?));
        }
        Ok(None)
    }

    /// Emit an `extern` prototype and record it in the registry.
    pub fn compile_extern(&mut self, proto: Prototype) -> Result<FunctionValue<'ctx>, Diagnostic> {
        self.set_cursor(proto.span);
        let function = self.get_or_declare(&proto)?;
        self.function_protos.insert(proto.name.clone(), proto);
        Ok(function)
    }

    /// Create an alloca in the entry block of the current function, so every
    /// slot dominates all uses regardless of where the local is introduced.
    pub(crate) fn create_entry_block_alloca(
        &self,
        ty: BasicTypeEnum<'ctx>,
        name: &str,
    ) -> Result<PointerValue<'ctx>, Diagnostic> {
        let function = self
            .current_fn
            .ok_or_else(|| Diagnostic::error("local outside of a function", self.cursor()))?;
        let entry = function
            .get_first_basic_block()
            .ok_or_else(|| self.llvm_err("function has no entry block"))?;

        let tmp_builder = self.context.create_builder();
        match entry.get_first_instruction() {
            Some(first) => tmp_builder.position_before(&first),
            None => tmp_builder.position_at_end(entry),
        }
        tmp_builder
            .build_alloca(ty, name)
            .map_err(|e| self.llvm_err(e))
    }

    // ============================================================
    // Function definition emission
    // ============================================================

    /// Emit a full function definition.
    ///
    /// The prototype is registered before the body is emitted so recursive
    /// calls resolve. A binary operator installs its precedence here and
    /// retracts it if the body fails to emit or the function does not
    /// verify; the partially built function is erased from the module.
    pub fn compile_function(
        &mut self,
        function: &Function,
        precedence: &mut HashMap<char, i32>,
    ) -> Result<FunctionValue<'ctx>, Diagnostic> {
        let proto = &function.proto;
        self.set_cursor(proto.span);
        self.function_protos.insert(proto.name.clone(), proto.clone());

        let fn_value = self.get_or_declare(proto)?;
        if fn_value.get_first_basic_block().is_some() {
            return Err(Diagnostic::error(
                format!("function `{}` cannot be redefined", proto.name),
                proto.span,
            )
            .with_error_code(ErrorCode::Redefinition));
        }

        if let FnKind::BinaryOp { op, precedence: prec } = proto.kind {
            precedence.insert(op, prec as i32);
        }

        let entry = self.context.append_basic_block(fn_value, "entry");
        self.builder.position_at_end(entry);
        self.current_fn = Some(fn_value);
        self.named_values.clear();

        let emitted = self.emit_function_body(function, fn_value);

        match emitted {
            Ok(()) if fn_value.verify(true) => Ok(fn_value),
            Ok(()) => {
                self.discard_function(fn_value, proto, precedence);
                Err(Diagnostic::error(
                    format!("generated invalid code for `{}`", proto.name),
                    function.span,
                )
                .with_error_code(ErrorCode::InvalidFunction))
            }
            Err(diagnostic) => {
                self.discard_function(fn_value, proto, precedence);
                Err(diagnostic)
            }
        }
    }

    fn emit_function_body(
        &mut self,
        function: &Function,
        fn_value: FunctionValue<'ctx>,
    ) -> Result<(), Diagnostic> {
        // One slot per parameter; the incoming value is stored into it.
        for (param, value) in function.proto.params.iter().zip(fn_value.get_param_iter()) {
            let ty = value.get_type();
            let slot = self
                .builder
                .build_alloca(ty, &param.name)
                .map_err(|e| self.llvm_err(e))?;
            self.builder
                .build_store(slot, value)
                .map_err(|e| self.llvm_err(e))?;
            self.named_values
                .insert(param.name.clone(), LocalSlot { ptr: slot, ty });
        }

        let body_value = self.compile_expr(&function.body)?;

        // The body may have ended with its own terminator (a return).
        if !self.block_terminated() {
            self.set_cursor(function.span);
            match fn_value.get_type().get_return_type() {
                None => {
                    self.builder
                        .build_return(None)
                        .map_err(|e| self.llvm_err(e))?;
                }
                Some(ret_ty) => {
                    let Some(value) = body_value else {
                        return Err(Diagnostic::error(
                            format!(
                                "non-void function `{}` does not end with a value",
                                function.proto.name
                            ),
                            function.span,
                        )
                        .with_error_code(ErrorCode::InvalidReturn));
                    };
                    let value = self.promote(value, ret_ty)?;
                    self.builder
                        .build_return(Some(&value))
                        .map_err(|e| self.llvm_err(e))?;
                }
            }
        }
        Ok(())
    }

    /// Erase a failed function and retract an operator's precedence.
    fn discard_function(
        &mut self,
        fn_value: FunctionValue<'ctx>,
        proto: &Prototype,
        precedence: &mut HashMap<char, i32>,
    ) {
        unsafe { fn_value.delete() };
        if let FnKind::BinaryOp { op, .. } = proto.kind {
            precedence.remove(&op);
        }
        self.current_fn = None;
    }
}
