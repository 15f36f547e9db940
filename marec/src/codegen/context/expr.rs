//! Expression lowering: literals, variables, operators, and calls.

use inkwell::module::Linkage;
use inkwell::types::BasicTypeEnum;
use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, FunctionValue};
use inkwell::{FloatPredicate, IntPredicate};

use crate::ast::{Expr, ExprKind, BINARY_OP_PREFIX, UNARY_OP_PREFIX};
use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::lexer::NumberValue;
use crate::span::Span;

use super::CodegenContext;

impl<'ctx, 'a> CodegenContext<'ctx, 'a> {
    /// Lower one expression, returning the value it produces.
    ///
    /// `None` means the expression yields nothing: a void call, a `return`,
    /// or a block ending in one.
    pub(crate) fn compile_expr(
        &mut self,
        expr: &Expr,
    ) -> Result<Option<BasicValueEnum<'ctx>>, Diagnostic> {
        self.set_cursor(expr.span);
        match &expr.kind {
            ExprKind::Number(value) => Ok(Some(self.compile_number(value))),
            ExprKind::Str(bytes) => self.compile_string(bytes).map(Some),
            ExprKind::Variable(name) => self.compile_variable(name, expr.span).map(Some),
            ExprKind::Unary { op, operand } => self.compile_unary(*op, operand, expr.span),
            ExprKind::Binary { op, lhs, rhs } => self.compile_binary(*op, lhs, rhs, expr.span),
            ExprKind::Call { callee, args } => self.compile_call(callee, args, expr.span),
            ExprKind::If {
                cond,
                then_expr,
                else_expr,
            } => self.compile_if(cond, then_expr, else_expr, expr.span),
            ExprKind::For {
                var,
                start,
                end,
                step,
                body,
            } => self
                .compile_for(var, start, end, step.as_deref(), body, expr.span)
                .map(Some),
            ExprKind::Var { name, init } => self.compile_var(name, init.as_deref()).map(Some),
            ExprKind::Return(value) => self.compile_return(value.as_deref(), expr.span),
            ExprKind::Block(exprs) => self.compile_block(exprs),
        }
    }

    /// Emit an expression that must produce a value.
    pub(crate) fn compile_value(
        &mut self,
        expr: &Expr,
        what: &str,
    ) -> Result<BasicValueEnum<'ctx>, Diagnostic> {
        self.compile_expr(expr)?.ok_or_else(|| {
            Diagnostic::error(format!("{what} does not produce a value"), expr.span)
                .with_error_code(ErrorCode::MismatchedTypes)
        })
    }

    /// A constant of the literal's carried type.
    fn compile_number(&self, value: &NumberValue) -> BasicValueEnum<'ctx> {
        match *value {
            NumberValue::I8(v) => self.context.i8_type().const_int(v as u64, true).into(),
            NumberValue::I16(v) => self.context.i16_type().const_int(v as u64, true).into(),
            NumberValue::I32(v) => self.context.i32_type().const_int(v as u64, true).into(),
            NumberValue::I64(v) => self.context.i64_type().const_int(v as u64, true).into(),
            NumberValue::F32(v) => self.context.f32_type().const_float(v as f64).into(),
            NumberValue::F64(v) => self.context.f64_type().const_float(v).into(),
        }
    }

    /// Load a variable from its allocation slot.
    fn compile_variable(
        &mut self,
        name: &str,
        span: Span,
    ) -> Result<BasicValueEnum<'ctx>, Diagnostic> {
        let slot = *self.named_values.get(name).ok_or_else(|| {
            Diagnostic::error(format!("unknown variable name `{name}`"), span)
                .with_error_code(ErrorCode::UnknownVariable)
        })?;
        self.builder
            .build_load(slot.ptr, name)
            .map_err(|e| self.llvm_err(e))
    }

    /// Install a null-terminated private constant and yield a pointer to
    /// its first byte.
    fn compile_string(&mut self, bytes: &[u8]) -> Result<BasicValueEnum<'ctx>, Diagnostic> {
        let array = self.context.const_string(bytes, true);
        let global = self.module.add_global(array.get_type(), None, ".str");
        global.set_initializer(&array);
        global.set_constant(true);
        global.set_linkage(Linkage::Private);
        global.set_unnamed_addr(true);

        let zero = self.context.i32_type().const_zero();
        let ptr = unsafe {
            self.builder.build_gep(
                global.as_pointer_value(),
                &[zero, zero],
                "strptr",
            )
        }
        .map_err(|e| self.llvm_err(e))?;
        Ok(ptr.into())
    }

    /// Unary operators are always user-defined functions.
    fn compile_unary(
        &mut self,
        op: char,
        operand: &Expr,
        span: Span,
    ) -> Result<Option<BasicValueEnum<'ctx>>, Diagnostic> {
        let operand_value = self.compile_value(operand, "operand of unary operator")?;
        let name = format!("{UNARY_OP_PREFIX}{op}");
        let callee = self.get_function(&name)?.ok_or_else(|| {
            Diagnostic::error(format!("unknown unary operator `{op}`"), span)
                .with_error_code(ErrorCode::UnknownOperator)
        })?;
        self.build_promoted_call(callee, &[operand_value], "unop")
    }

    /// Binary operators: `=` is assignment, `+ - * / < >` are built in for
    /// numeric operands, anything else resolves through the registry.
    fn compile_binary(
        &mut self,
        op: char,
        lhs: &Expr,
        rhs: &Expr,
        span: Span,
    ) -> Result<Option<BasicValueEnum<'ctx>>, Diagnostic> {
        if op == '=' {
            return self.compile_assign(lhs, rhs).map(Some);
        }

        let mut left = self.compile_value(lhs, "left operand")?;
        let mut right = self.compile_value(rhs, "right operand")?;

        if left.get_type() != right.get_type() {
            let common = self.common_type(left.get_type(), right.get_type(), span)?;
            left = self.promote(left, common)?;
            right = self.promote(right, common)?;
        }

        match (left, right) {
            (BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) => {
                let value = match op {
                    '+' => self.builder.build_int_add(l, r, "addtmp"),
                    '-' => self.builder.build_int_sub(l, r, "subtmp"),
                    '*' => self.builder.build_int_mul(l, r, "multmp"),
                    '/' => self.builder.build_int_signed_div(l, r, "divtmp"),
                    '<' => self
                        .builder
                        .build_int_compare(IntPredicate::SLT, l, r, "cmptmp"),
                    '>' => self
                        .builder
                        .build_int_compare(IntPredicate::SGT, l, r, "cmptmp"),
                    _ => return self.compile_user_binary(op, left, right, span),
                };
                value
                    .map(|v| Some(v.into()))
                    .map_err(|e| self.llvm_err(e))
            }
            (BasicValueEnum::FloatValue(l), BasicValueEnum::FloatValue(r)) => match op {
                '+' | '-' | '*' | '/' => {
                    let value = match op {
                        '+' => self.builder.build_float_add(l, r, "addtmp"),
                        '-' => self.builder.build_float_sub(l, r, "subtmp"),
                        '*' => self.builder.build_float_mul(l, r, "multmp"),
                        _ => self.builder.build_float_div(l, r, "divtmp"),
                    };
                    value
                        .map(|v| Some(v.into()))
                        .map_err(|e| self.llvm_err(e))
                }
                '<' | '>' => {
                    let predicate = if op == '<' {
                        FloatPredicate::OLT
                    } else {
                        FloatPredicate::OGT
                    };
                    self.builder
                        .build_float_compare(predicate, l, r, "cmptmp")
                        .map(|v| Some(v.into()))
                        .map_err(|e| self.llvm_err(e))
                }
                _ => self.compile_user_binary(op, left, right, span),
            },
            _ => self.compile_user_binary(op, left, right, span),
        }
    }

    /// Resolve `op` through the prototype registry and call it.
    fn compile_user_binary(
        &mut self,
        op: char,
        left: BasicValueEnum<'ctx>,
        right: BasicValueEnum<'ctx>,
        span: Span,
    ) -> Result<Option<BasicValueEnum<'ctx>>, Diagnostic> {
        let name = format!("{BINARY_OP_PREFIX}{op}");
        let callee = self.get_function(&name)?.ok_or_else(|| {
            Diagnostic::error(format!("unknown binary operator `{op}`"), span)
                .with_error_code(ErrorCode::UnknownOperator)
        })?;
        self.build_promoted_call(callee, &[left, right], "binop")
    }

    /// Assignment: the destination must be a variable reference. The stored
    /// value (after promotion to the slot's type) is the expression's value.
    fn compile_assign(
        &mut self,
        lhs: &Expr,
        rhs: &Expr,
    ) -> Result<BasicValueEnum<'ctx>, Diagnostic> {
        let ExprKind::Variable(name) = &lhs.kind else {
            return Err(
                Diagnostic::error("destination of `=` must be a variable", lhs.span)
                    .with_error_code(ErrorCode::InvalidAssignmentTarget),
            );
        };

        let value = self.compile_value(rhs, "right-hand side of `=`")?;
        let slot = *self.named_values.get(name).ok_or_else(|| {
            Diagnostic::error(format!("unknown variable name `{name}`"), lhs.span)
                .with_error_code(ErrorCode::UnknownVariable)
        })?;

        let value = self.promote(value, slot.ty)?;
        self.builder
            .build_store(slot.ptr, value)
            .map_err(|e| self.llvm_err(e))?;
        Ok(value)
    }

    /// A direct call: resolve the callee, check the argument count, emit
    /// the arguments in source order.
    fn compile_call(
        &mut self,
        callee_name: &str,
        args: &[Expr],
        span: Span,
    ) -> Result<Option<BasicValueEnum<'ctx>>, Diagnostic> {
        let callee = self.get_function(callee_name)?.ok_or_else(|| {
            Diagnostic::error(format!("unknown function referenced: `{callee_name}`"), span)
                .with_error_code(ErrorCode::UnknownFunction)
        })?;

        if callee.count_params() as usize != args.len() {
            return Err(Diagnostic::error(
                format!(
                    "incorrect number of arguments passed to `{callee_name}`: expected {}, found {}",
                    callee.count_params(),
                    args.len()
                ),
                span,
            )
            .with_error_code(ErrorCode::ArgumentCountMismatch));
        }

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.compile_value(arg, "argument")?);
        }

        self.build_promoted_call(callee, &values, "calltmp")
    }

    /// Emit a call, promoting each argument to the declared parameter type.
    /// Void calls produce no named value.
    pub(crate) fn build_promoted_call(
        &mut self,
        callee: FunctionValue<'ctx>,
        args: &[BasicValueEnum<'ctx>],
        name: &str,
    ) -> Result<Option<BasicValueEnum<'ctx>>, Diagnostic> {
        let param_types = callee.get_type().get_param_types();

        let mut promoted: Vec<BasicMetadataValueEnum> = Vec::with_capacity(args.len());
        for (value, param_ty) in args.iter().zip(param_types) {
            let value = match BasicTypeEnum::try_from(param_ty) {
                Ok(basic_ty) => self.promote(*value, basic_ty)?,
                Err(_) => *value,
            };
            promoted.push(value.into());
        }

        let is_void = callee.get_type().get_return_type().is_none();
        let call = self
            .builder
            .build_call(callee, &promoted, if is_void { "" } else { name })
            .map_err(|e| self.llvm_err(e))?;
        Ok(call.try_as_basic_value().left())
    }
}
