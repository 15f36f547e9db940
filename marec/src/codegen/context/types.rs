//! Type lowering and numeric promotion.
//!
//! Source types map one-to-one onto LLVM primitives. Mixed-type numeric
//! operations promote both sides to a common type under the rank ordering
//! i8 < i16 < i32 < i64 < float < double; the conversions are signed.

use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType};
use inkwell::values::{BasicValueEnum, IntValue};
use inkwell::{AddressSpace, FloatPredicate, IntPredicate};

use crate::ast::{Prototype, Ty};
use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::span::Span;

use super::CodegenContext;

impl<'ctx, 'a> CodegenContext<'ctx, 'a> {
    /// Lower a source type to an LLVM value type. `void` has no value type.
    pub(crate) fn lower_basic_type(
        &self,
        ty: Ty,
        span: Span,
    ) -> Result<BasicTypeEnum<'ctx>, Diagnostic> {
        Ok(match ty {
            Ty::I8 => self.context.i8_type().into(),
            Ty::I16 => self.context.i16_type().into(),
            Ty::I32 => self.context.i32_type().into(),
            Ty::I64 => self.context.i64_type().into(),
            Ty::Float => self.context.f32_type().into(),
            Ty::Double => self.context.f64_type().into(),
            Ty::Str => self
                .context
                .i8_type()
                .ptr_type(AddressSpace::default())
                .into(),
            Ty::Void => {
                return Err(
                    Diagnostic::error("`void` is not usable as a value type", span)
                        .with_error_code(ErrorCode::UnsupportedType),
                )
            }
        })
    }

    /// Build the LLVM function type for a prototype.
    pub(crate) fn fn_type(&self, proto: &Prototype) -> Result<FunctionType<'ctx>, Diagnostic> {
        let params = proto
            .params
            .iter()
            .map(|p| self.lower_basic_type(p.ty, proto.span).map(Into::into))
            .collect::<Result<Vec<BasicMetadataTypeEnum>, Diagnostic>>()?;

        Ok(match proto.ret {
            Ty::Void => self.context.void_type().fn_type(&params, false),
            ret => self.lower_basic_type(ret, proto.span)?.fn_type(&params, false),
        })
    }

    /// Promotion rank: i8 < i16 < i32 < i64 < float < double.
    /// `None` for types outside the numeric hierarchy (pointers, i1).
    fn type_rank(&self, ty: BasicTypeEnum<'ctx>) -> Option<u32> {
        match ty {
            BasicTypeEnum::IntType(int_ty) => match int_ty.get_bit_width() {
                8 => Some(1),
                16 => Some(2),
                32 => Some(3),
                64 => Some(4),
                _ => None,
            },
            BasicTypeEnum::FloatType(float_ty) => {
                if float_ty == self.context.f32_type() {
                    Some(5)
                } else if float_ty == self.context.f64_type() {
                    Some(6)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// The higher-ranked of two numeric types.
    pub(crate) fn common_type(
        &self,
        t1: BasicTypeEnum<'ctx>,
        t2: BasicTypeEnum<'ctx>,
        span: Span,
    ) -> Result<BasicTypeEnum<'ctx>, Diagnostic> {
        if t1 == t2 {
            return Ok(t1);
        }
        let mismatch = || {
            Diagnostic::error("mismatched types in expression", span)
                .with_error_code(ErrorCode::MismatchedTypes)
        };
        let rank1 = self.type_rank(t1).ok_or_else(mismatch)?;
        let rank2 = self.type_rank(t2).ok_or_else(mismatch)?;
        Ok(if rank1 >= rank2 { t1 } else { t2 })
    }

    /// Emit the conversion taking `value` to type `to`: sign-extend or
    /// truncate between integer widths, signed int↔float conversions, and
    /// float extends/truncates.
    pub(crate) fn promote(
        &self,
        value: BasicValueEnum<'ctx>,
        to: BasicTypeEnum<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>, Diagnostic> {
        let from = value.get_type();
        if from == to {
            return Ok(value);
        }

        match (value, to) {
            (BasicValueEnum::IntValue(v), BasicTypeEnum::IntType(to_ty)) => {
                let from_bits = v.get_type().get_bit_width();
                let to_bits = to_ty.get_bit_width();
                let converted = if from_bits < to_bits {
                    self.builder.build_int_s_extend(v, to_ty, "sext")
                } else {
                    self.builder.build_int_truncate(v, to_ty, "trunc")
                };
                converted.map(Into::into).map_err(|e| self.llvm_err(e))
            }
            (BasicValueEnum::IntValue(v), BasicTypeEnum::FloatType(to_ty)) => self
                .builder
                .build_signed_int_to_float(v, to_ty, "sitofp")
                .map(Into::into)
                .map_err(|e| self.llvm_err(e)),
            (BasicValueEnum::FloatValue(v), BasicTypeEnum::FloatType(to_ty)) => {
                let widening =
                    self.type_rank(from).unwrap_or(0) < self.type_rank(to).unwrap_or(0);
                let converted = if widening {
                    self.builder.build_float_ext(v, to_ty, "fpext")
                } else {
                    self.builder.build_float_trunc(v, to_ty, "fptrunc")
                };
                converted.map(Into::into).map_err(|e| self.llvm_err(e))
            }
            (BasicValueEnum::FloatValue(v), BasicTypeEnum::IntType(to_ty)) => self
                .builder
                .build_float_to_signed_int(v, to_ty, "fptosi")
                .map(Into::into)
                .map_err(|e| self.llvm_err(e)),
            _ => Err(
                Diagnostic::error("unsupported type conversion", self.cursor())
                    .with_error_code(ErrorCode::UnsupportedType),
            ),
        }
    }

    /// Convert a value to an `i1` condition: integers compare ≠ 0, floats
    /// compare ordered-≠ 0.0, and an existing `i1` passes through.
    pub(crate) fn build_condition(
        &self,
        value: BasicValueEnum<'ctx>,
        name: &str,
        span: Span,
    ) -> Result<IntValue<'ctx>, Diagnostic> {
        match value {
            BasicValueEnum::IntValue(v) => {
                if v.get_type().get_bit_width() == 1 {
                    return Ok(v);
                }
                self.builder
                    .build_int_compare(IntPredicate::NE, v, v.get_type().const_zero(), name)
                    .map_err(|e| self.llvm_err(e))
            }
            BasicValueEnum::FloatValue(v) => self
                .builder
                .build_float_compare(FloatPredicate::ONE, v, v.get_type().const_zero(), name)
                .map_err(|e| self.llvm_err(e)),
            _ => Err(
                Diagnostic::error("unsupported type in condition", span)
                    .with_error_code(ErrorCode::UnsupportedConditionType),
            ),
        }
    }

    /// The zero value of a basic type.
    pub(crate) fn const_zero(&self, ty: BasicTypeEnum<'ctx>) -> BasicValueEnum<'ctx> {
        match ty {
            BasicTypeEnum::IntType(t) => t.const_zero().into(),
            BasicTypeEnum::FloatType(t) => t.const_zero().into(),
            BasicTypeEnum::PointerType(t) => t.const_null().into(),
            BasicTypeEnum::ArrayType(t) => t.const_zero().into(),
            BasicTypeEnum::StructType(t) => t.const_zero().into(),
            BasicTypeEnum::VectorType(t) => t.const_zero().into(),
        }
    }
}
