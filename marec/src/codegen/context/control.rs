//! Control flow lowering: blocks, if expressions, for loops, locals, return.

use inkwell::basic_block::BasicBlock;
use inkwell::types::BasicTypeEnum;
use inkwell::values::{BasicValue, BasicValueEnum};

use crate::ast::Expr;
use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::span::Span;

use super::{CodegenContext, LocalSlot};

impl<'ctx, 'a> CodegenContext<'ctx, 'a> {
    /// Emit each sub-expression in order, keeping only the last value.
    /// Stops immediately once the current block is terminated, so nothing
    /// after a `return` is emitted.
    pub(crate) fn compile_block(
        &mut self,
        exprs: &[Expr],
    ) -> Result<Option<BasicValueEnum<'ctx>>, Diagnostic> {
        let mut last = None;
        for expr in exprs {
            last = self.compile_expr(expr)?;
            if self.block_terminated() {
                break;
            }
        }
        Ok(last)
    }

    /// Lower `if cond then a else b` to a conditional branch with a phi
    /// merge.
    ///
    /// Each arm's *exit* block is recorded after emission (nested
    /// constructs may have moved the builder), and arm values of different
    /// numeric types are converted on their exit paths so the phi sees one
    /// common type. An arm that terminated its block (a `return`)
    /// contributes no merge edge.
    pub(crate) fn compile_if(
        &mut self,
        cond: &Expr,
        then_expr: &Expr,
        else_expr: &Expr,
        span: Span,
    ) -> Result<Option<BasicValueEnum<'ctx>>, Diagnostic> {
        let fn_value = self
            .current_fn
            .ok_or_else(|| Diagnostic::error("`if` outside of a function", span))?;

        let cond_value = self.compile_value(cond, "`if` condition")?;
        let cond_bool = self.build_condition(cond_value, "ifcond", cond.span)?;

        let then_bb = self.context.append_basic_block(fn_value, "then");
        let else_bb = self.context.append_basic_block(fn_value, "else");
        let merge_bb = self.context.append_basic_block(fn_value, "ifcont");

        self.builder
            .build_conditional_branch(cond_bool, then_bb, else_bb)
            .map_err(|e| self.llvm_err(e))?;

        self.builder.position_at_end(then_bb);
        let then_value = self.compile_expr(then_expr)?;
        let then_exit = self.branch_to_merge(merge_bb)?;

        self.builder.position_at_end(else_bb);
        let else_value = self.compile_expr(else_expr)?;
        let else_exit = self.branch_to_merge(merge_bb)?;

        self.builder.position_at_end(merge_bb);

        let mut incoming: Vec<(BasicValueEnum<'ctx>, BasicBlock<'ctx>)> = Vec::new();
        let mut merge_edges = 0;
        for (value, exit) in [(then_value, then_exit), (else_value, else_exit)] {
            if let Some(exit_bb) = exit {
                merge_edges += 1;
                if let Some(value) = value {
                    incoming.push((value, exit_bb));
                }
            }
        }

        // A phi needs a value from every predecessor of the merge block.
        if incoming.is_empty() || incoming.len() != merge_edges {
            return Ok(None);
        }

        let mut phi_ty = incoming[0].0.get_type();
        if incoming.len() == 2 && incoming[1].0.get_type() != phi_ty {
            phi_ty = self
                .common_type(phi_ty, incoming[1].0.get_type(), span)
                .map_err(|_| {
                    Diagnostic::error("mismatched types in `if` expression", span)
                        .with_error_code(ErrorCode::MismatchedTypes)
                })?;
            for (value, exit_bb) in incoming.iter_mut() {
                if value.get_type() != phi_ty {
                    let terminator = exit_bb
                        .get_terminator()
                        .ok_or_else(|| self.llvm_err("merge edge without terminator"))?;
                    self.builder.position_before(&terminator);
                    *value = self.promote(*value, phi_ty)?;
                }
            }
            self.builder.position_at_end(merge_bb);
        }

        let phi = self
            .builder
            .build_phi(phi_ty, "iftmp")
            .map_err(|e| self.llvm_err(e))?;
        for (value, exit_bb) in &incoming {
            phi.add_incoming(&[(value as &dyn BasicValue, *exit_bb)]);
        }
        Ok(Some(phi.as_basic_value()))
    }

    /// Branch the current block to `merge_bb` unless it already terminated;
    /// returns the exit block that now feeds the merge, if any.
    fn branch_to_merge(
        &self,
        merge_bb: BasicBlock<'ctx>,
    ) -> Result<Option<BasicBlock<'ctx>>, Diagnostic> {
        if self.block_terminated() {
            return Ok(None);
        }
        let exit_bb = self
            .builder
            .get_insert_block()
            .ok_or_else(|| self.llvm_err("builder has no insert block"))?;
        self.builder
            .build_unconditional_branch(merge_bb)
            .map_err(|e| self.llvm_err(e))?;
        Ok(Some(exit_bb))
    }

    /// Lower a `for` loop:
    ///
    /// ```text
    ///   entry:  slot = alloca; store start
    ///           br loop
    ///   loop:   body (value ignored)
    ///           step; end
    ///           slot = load slot + step
    ///           br (end != 0), loop, afterloop
    ///   afterloop:
    /// ```
    ///
    /// The induction variable shadows any outer binding for the duration of
    /// the loop; the loop itself yields the zero value of its induction
    /// type.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn compile_for(
        &mut self,
        var: &str,
        start: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        body: &Expr,
        span: Span,
    ) -> Result<BasicValueEnum<'ctx>, Diagnostic> {
        let fn_value = self
            .current_fn
            .ok_or_else(|| Diagnostic::error("`for` outside of a function", span))?;

        let start_value = self.compile_value(start, "loop start value")?;
        let loop_ty = start_value.get_type();
        if !matches!(
            loop_ty,
            BasicTypeEnum::IntType(_) | BasicTypeEnum::FloatType(_)
        ) {
            return Err(
                Diagnostic::error("unsupported type for loop variable", start.span)
                    .with_error_code(ErrorCode::UnsupportedType),
            );
        }

        let slot_ptr = self.create_entry_block_alloca(loop_ty, var)?;
        self.builder
            .build_store(slot_ptr, start_value)
            .map_err(|e| self.llvm_err(e))?;

        let loop_bb = self.context.append_basic_block(fn_value, "loop");
        self.builder
            .build_unconditional_branch(loop_bb)
            .map_err(|e| self.llvm_err(e))?;
        self.builder.position_at_end(loop_bb);

        // Shadow any outer binding of the induction variable.
        let shadowed = self.named_values.insert(
            var.to_string(),
            LocalSlot {
                ptr: slot_ptr,
                ty: loop_ty,
            },
        );

        // The body is emitted for its side effects only.
        self.compile_expr(body)?;

        // A `return` in the body terminated the loop block; there is no
        // back edge on that path.
        if !self.block_terminated() {
            let step_value = match step {
                Some(step_expr) => {
                    let value = self.compile_value(step_expr, "loop step value")?;
                    self.promote(value, loop_ty)?
                }
                None => match loop_ty {
                    BasicTypeEnum::IntType(int_ty) => int_ty.const_int(1, true).into(),
                    _ => loop_ty.into_float_type().const_float(1.0).into(),
                },
            };

            let end_value = self.compile_value(end, "loop end condition")?;

            let current = self
                .builder
                .build_load(slot_ptr, var)
                .map_err(|e| self.llvm_err(e))?;
            let next: BasicValueEnum = match current {
                BasicValueEnum::IntValue(v) => self
                    .builder
                    .build_int_add(v, step_value.into_int_value(), "nextvar")
                    .map_err(|e| self.llvm_err(e))?
                    .into(),
                BasicValueEnum::FloatValue(v) => self
                    .builder
                    .build_float_add(v, step_value.into_float_value(), "nextvar")
                    .map_err(|e| self.llvm_err(e))?
                    .into(),
                _ => {
                    return Err(
                        Diagnostic::error("unsupported type for loop arithmetic", span)
                            .with_error_code(ErrorCode::UnsupportedType),
                    )
                }
            };
            self.builder
                .build_store(slot_ptr, next)
                .map_err(|e| self.llvm_err(e))?;

            let end_cond = self.build_condition(end_value, "loopcond", end.span)?;

            let after_bb = self.context.append_basic_block(fn_value, "afterloop");
            self.builder
                .build_conditional_branch(end_cond, loop_bb, after_bb)
                .map_err(|e| self.llvm_err(e))?;
            self.builder.position_at_end(after_bb);
        } else {
            let after_bb = self.context.append_basic_block(fn_value, "afterloop");
            self.builder.position_at_end(after_bb);
        }

        // Restore the shadowed binding.
        match shadowed {
            Some(old) => {
                self.named_values.insert(var.to_string(), old);
            }
            None => {
                self.named_values.remove(var);
            }
        }

        Ok(self.const_zero(loop_ty))
    }

    /// `var name = init`: an entry-block slot of the initializer's type.
    /// Installs or overwrites the binding; yields the initializer value.
    pub(crate) fn compile_var(
        &mut self,
        name: &str,
        init: Option<&Expr>,
    ) -> Result<BasicValueEnum<'ctx>, Diagnostic> {
        let init_value = match init {
            Some(init_expr) => self.compile_value(init_expr, "variable initializer")?,
            None => self.context.f64_type().const_float(0.0).into(),
        };

        let ty = init_value.get_type();
        let slot_ptr = self.create_entry_block_alloca(ty, name)?;
        self.builder
            .build_store(slot_ptr, init_value)
            .map_err(|e| self.llvm_err(e))?;
        self.named_values
            .insert(name.to_string(), LocalSlot { ptr: slot_ptr, ty });

        Ok(init_value)
    }

    /// `return [value]`: emits the terminator; the containing block is done.
    pub(crate) fn compile_return(
        &mut self,
        value: Option<&Expr>,
        span: Span,
    ) -> Result<Option<BasicValueEnum<'ctx>>, Diagnostic> {
        let fn_value = self
            .current_fn
            .ok_or_else(|| Diagnostic::error("`return` outside of a function", span))?;
        let ret_ty = fn_value.get_type().get_return_type();

        match (value, ret_ty) {
            (Some(value_expr), Some(ret_ty)) => {
                let value = self.compile_value(value_expr, "return value")?;
                let value = self.promote(value, ret_ty)?;
                self.builder
                    .build_return(Some(&value))
                    .map_err(|e| self.llvm_err(e))?;
            }
            (None, None) => {
                self.builder
                    .build_return(None)
                    .map_err(|e| self.llvm_err(e))?;
            }
            (Some(_), None) => {
                return Err(
                    Diagnostic::error("cannot return a value from a void function", span)
                        .with_error_code(ErrorCode::InvalidReturn),
                )
            }
            (None, Some(_)) => {
                return Err(Diagnostic::error(
                    "`return` without a value in a function returning non-void",
                    span,
                )
                .with_error_code(ErrorCode::InvalidReturn))
            }
        }
        Ok(None)
    }
}
