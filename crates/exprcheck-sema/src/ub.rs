// ub.rs
//
// Undefined-behavior classification for arithmetic, shift, cast and pointer
// operators. Every check looks at runtime operand values after conversion,
// and every check returns a classification; none of them fail.

use std::fmt;

use exprcheck_frontend::BinOp;
use serde::{Deserialize, Serialize};

use crate::types::{Target, Type};
use crate::value::Value;

/// Outcome of classifying one operation. `Ok` means no undefined behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UbStatus {
    #[default]
    Ok,
    DivisionByZero,
    DivisionByMinusOne,
    InvalidCast,
    InvalidShift,
    NullptrArithmetic,
    InvalidPtrDiff,
}

impl UbStatus {
    pub fn is_ok(self) -> bool {
        self == UbStatus::Ok
    }

    pub fn is_ub(self) -> bool {
        !self.is_ok()
    }

    /// `self` unless it is `Ok`, then `other`: the first finding wins.
    pub fn or(self, other: UbStatus) -> UbStatus {
        if self.is_ub() { self } else { other }
    }

    pub fn description(self) -> &'static str {
        match self {
            UbStatus::Ok => "no undefined behavior",
            UbStatus::DivisionByZero => "division by zero",
            UbStatus::DivisionByMinusOne => "signed division overflow (minimum value by -1)",
            UbStatus::InvalidCast => "floating value out of range of the destination type",
            UbStatus::InvalidShift => "shift amount negative or not less than the operand width",
            UbStatus::NullptrArithmetic => "arithmetic on a null pointer",
            UbStatus::InvalidPtrDiff => "pointer difference is not a multiple of the element size",
        }
    }
}

impl fmt::Display for UbStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Classifies operations for one target. Cheap to create; holds no state.
#[derive(Debug, Clone, Copy)]
pub struct UbClassifier<'t> {
    target: &'t Target,
}

impl<'t> UbClassifier<'t> {
    pub fn new(target: &'t Target) -> Self {
        Self { target }
    }

    /// Classifies `lhs op rhs` for operands that have already been
    /// converted: to their common type for arithmetic operators, each
    /// promoted on its own for shifts, unconverted for pointer arithmetic.
    pub fn classify_binary(&self, op: BinOp, lhs: &Value, rhs: &Value) -> UbStatus {
        let (lt, rt) = (lhs.ty(), rhs.ty());
        let status = match op {
            BinOp::Div | BinOp::Mod if lt.is_integral() && rt.is_integral() => {
                self.check_division(lhs, rhs)
            }
            BinOp::Shl | BinOp::Shr => self.check_shift(lt, rhs),
            BinOp::Plus if lt.is_pointer() && rt.is_integral() => {
                self.check_pointer_add(lhs, rhs)
            }
            BinOp::Plus if lt.is_integral() && rt.is_pointer() => {
                self.check_pointer_add(rhs, lhs)
            }
            BinOp::Minus if lt.is_pointer() && rt.is_pointer() => {
                self.check_pointer_diff(lhs, rhs)
            }
            BinOp::Minus if lt.is_pointer() && rt.is_integral() => {
                self.check_pointer_sub(lhs, rhs)
            }
            _ => UbStatus::Ok,
        };
        if status.is_ub() {
            tracing::debug!(%op, %lhs, %rhs, ?status, "undefined behavior");
        }
        status
    }

    /// Integer `/` and `%`: a zero divisor, or the signed minimum divided by
    /// -1. Floating operands never qualify.
    pub fn check_division(&self, lhs: &Value, rhs: &Value) -> UbStatus {
        let (Some(dividend), Some(divisor)) = (lhs.as_i128(), rhs.as_i128()) else {
            return UbStatus::Ok;
        };
        if divisor == 0 {
            return UbStatus::DivisionByZero;
        }
        if divisor == -1 && self.target.is_signed_type(lhs.ty()) {
            let min = self.target.int_range(lhs.ty()).map(|range| range.min);
            if min == Some(dividend) {
                return UbStatus::DivisionByMinusOne;
            }
        }
        UbStatus::Ok
    }

    /// `<<` and `>>`: the amount must be non-negative and below the width of
    /// the promoted left operand. The left operand's value is irrelevant.
    pub fn check_shift(&self, lhs_ty: &Type, amount: &Value) -> UbStatus {
        let Some(amount) = amount.as_i128() else {
            return UbStatus::Ok;
        };
        let width = i128::from(self.target.shift_width(lhs_ty));
        if amount < 0 || amount >= width {
            UbStatus::InvalidShift
        } else {
            UbStatus::Ok
        }
    }

    /// Floating to integer or enumeration: NaN and infinities are always
    /// invalid, finite values are truncated toward zero and must land in the
    /// destination range. Casts to `bool` and non-floating sources are
    /// always fine.
    pub fn check_cast(&self, value: &Value, dest: &Type) -> UbStatus {
        if !value.ty().is_floating() || dest.is_bool() {
            return UbStatus::Ok;
        }
        let Some(range) = self.target.int_range(dest) else {
            return UbStatus::Ok;
        };
        let v = value.as_f64();
        if !v.is_finite() {
            return UbStatus::InvalidCast;
        }
        // Both bounds are zero or powers of two, so they are exact doubles.
        let lower = range.min as f64;
        let upper_exclusive = (range.max + 1) as f64;
        let truncated = v.trunc();
        if truncated >= lower && truncated < upper_exclusive {
            UbStatus::Ok
        } else {
            UbStatus::InvalidCast
        }
    }

    /// `ptr + n` with a null `ptr` and a non-zero `n`.
    pub fn check_pointer_add(&self, ptr: &Value, offset: &Value) -> UbStatus {
        match (ptr.address(), offset.as_i128()) {
            (Some(0), Some(n)) if n != 0 => UbStatus::NullptrArithmetic,
            _ => UbStatus::Ok,
        }
    }

    /// `ptr - n` is not classified, null or not: it has not been seen to
    /// diverge from the reference debugger.
    pub fn check_pointer_sub(&self, _ptr: &Value, _offset: &Value) -> UbStatus {
        UbStatus::Ok
    }

    /// `p1 - p2`: a negative byte distance that is not a multiple of the
    /// element size. Misaligned pointers a whole number of elements apart
    /// and positive non-multiple distances are tolerated, matching the
    /// reference debugger.
    pub fn check_pointer_diff(&self, lhs: &Value, rhs: &Value) -> UbStatus {
        let (Some(a1), Some(a2), Some(pointee)) = (lhs.address(), rhs.address(), lhs.ty().pointee())
        else {
            return UbStatus::Ok;
        };
        let size = self.target.size_of(pointee) as i64;
        if size <= 1 {
            return UbStatus::Ok;
        }
        let distance = (a1 as i64).wrapping_sub(a2 as i64);
        if distance < 0 && distance % size != 0 {
            UbStatus::InvalidPtrDiff
        } else {
            UbStatus::Ok
        }
    }
}

#[cfg(test)]
mod tests {
    use exprcheck_frontend::ScalarType;

    use super::*;
    use crate::types::{Arch, EnumType};

    fn int_value(target: &Target, s: ScalarType, v: i128) -> Value {
        Value::from_int(target, Type::Scalar(s), v)
    }

    fn double(v: f64) -> Value {
        Value::from_float(Type::Scalar(ScalarType::Double), v)
    }

    fn int_ptr(address: u64) -> Value {
        Value::pointer(Type::Scalar(ScalarType::Int), address)
    }

    #[test]
    fn first_finding_wins() {
        assert_eq!(UbStatus::Ok.or(UbStatus::InvalidShift), UbStatus::InvalidShift);
        assert_eq!(
            UbStatus::DivisionByZero.or(UbStatus::InvalidShift),
            UbStatus::DivisionByZero
        );
        assert!(UbStatus::default().is_ok());
    }

    #[test]
    fn division_by_zero_for_every_integer_type() {
        let target = Target::default();
        let ub = UbClassifier::new(&target);
        for s in ScalarType::ALL.into_iter().filter(|s| s.is_integral()) {
            let x = int_value(&target, s, 1);
            let zero = int_value(&target, s, 0);
            assert_eq!(
                ub.classify_binary(BinOp::Div, &x, &zero),
                UbStatus::DivisionByZero,
                "{s}"
            );
            assert_eq!(
                ub.classify_binary(BinOp::Mod, &x, &zero),
                UbStatus::DivisionByZero,
                "{s}"
            );
        }
        assert_eq!(
            ub.classify_binary(BinOp::Div, &double(1.0), &double(0.0)),
            UbStatus::Ok
        );
        assert_eq!(
            ub.classify_binary(BinOp::Div, &double(1.0), &double(-0.0)),
            UbStatus::Ok
        );
    }

    #[test]
    fn signed_minimum_by_minus_one() {
        let target = Target::default();
        let ub = UbClassifier::new(&target);
        for (signed, unsigned) in [
            (ScalarType::Int, ScalarType::UnsignedInt),
            (ScalarType::Long, ScalarType::UnsignedLong),
            (ScalarType::LongLong, ScalarType::UnsignedLongLong),
        ] {
            let min = target.int_range(&Type::Scalar(signed)).unwrap().min;
            let x = int_value(&target, signed, min);
            let minus_one = int_value(&target, signed, -1);
            assert_eq!(
                ub.classify_binary(BinOp::Div, &x, &minus_one),
                UbStatus::DivisionByMinusOne
            );
            assert_eq!(
                ub.classify_binary(BinOp::Mod, &x, &minus_one),
                UbStatus::DivisionByMinusOne
            );

            let ux = int_value(&target, unsigned, min);
            let uminus_one = int_value(&target, unsigned, -1);
            assert_eq!(ub.classify_binary(BinOp::Div, &ux, &uminus_one), UbStatus::Ok);

            let not_min = int_value(&target, signed, min + 1);
            assert_eq!(ub.classify_binary(BinOp::Div, &not_min, &minus_one), UbStatus::Ok);
            let minus_two = int_value(&target, signed, -2);
            assert_eq!(ub.classify_binary(BinOp::Div, &x, &minus_two), UbStatus::Ok);
        }
    }

    #[test]
    fn cast_bounds_are_exact() {
        let target = Target::default();
        let ub = UbClassifier::new(&target);
        let cases = [
            (ScalarType::Int, 2147483647.0, UbStatus::Ok),
            (ScalarType::Int, 2147483648.0, UbStatus::InvalidCast),
            (ScalarType::Int, -2147483648.0, UbStatus::Ok),
            (ScalarType::Int, -2147483648.9, UbStatus::Ok),
            (ScalarType::Int, -2147483649.0, UbStatus::InvalidCast),
            (ScalarType::UnsignedInt, 4294967295.8, UbStatus::Ok),
            (ScalarType::UnsignedInt, 4294967296.0, UbStatus::InvalidCast),
            (ScalarType::UnsignedInt, -0.1, UbStatus::Ok),
            (ScalarType::UnsignedInt, -1.0, UbStatus::InvalidCast),
            (ScalarType::SignedChar, 127.0, UbStatus::Ok),
            (ScalarType::SignedChar, 128.0, UbStatus::InvalidCast),
            (ScalarType::UnsignedShort, 65536.0, UbStatus::InvalidCast),
            (ScalarType::LongLong, 9.223372036854775e18, UbStatus::Ok),
            (ScalarType::LongLong, 9.223372036854777e18, UbStatus::InvalidCast),
            (ScalarType::UnsignedLongLong, 1.844674407370955e19, UbStatus::Ok),
            (ScalarType::UnsignedLongLong, 1.844674407370957e19, UbStatus::InvalidCast),
        ];
        for (dest, v, expected) in cases {
            assert_eq!(
                ub.check_cast(&double(v), &Type::Scalar(dest)),
                expected,
                "({dest}){v}"
            );
        }
    }

    #[test]
    fn cast_special_values() {
        let target = Target::default();
        let ub = UbClassifier::new(&target);
        let int = Type::Scalar(ScalarType::Int);
        for v in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN, f64::MAX, -f64::MAX] {
            assert_eq!(ub.check_cast(&double(v), &int), UbStatus::InvalidCast, "{v}");
        }
        let denorm = f64::from_bits(1);
        assert_eq!(ub.check_cast(&double(denorm), &int), UbStatus::Ok);
        assert_eq!(
            ub.check_cast(&double(-denorm), &Type::Scalar(ScalarType::UnsignedInt)),
            UbStatus::Ok
        );
        // Anything converts to bool, and integer sources are never checked.
        assert_eq!(
            ub.check_cast(&double(f64::NAN), &Type::Scalar(ScalarType::Bool)),
            UbStatus::Ok
        );
        let big = int_value(&target, ScalarType::LongLong, i128::from(i64::MAX));
        assert_eq!(ub.check_cast(&big, &int), UbStatus::Ok);
    }

    #[test]
    fn cast_to_enum_uses_underlying_range() {
        let target = Target::default();
        let ub = UbClassifier::new(&target);
        let scoped = Type::Enum(EnumType {
            name: "ScopedEnum".to_string(),
            underlying: ScalarType::Int,
            scoped: true,
        });
        assert_eq!(ub.check_cast(&double(2147483647.0), &scoped), UbStatus::Ok);
        assert_eq!(ub.check_cast(&double(2147483648.0), &scoped), UbStatus::InvalidCast);
        assert_eq!(ub.check_cast(&double(-2147483648.5), &scoped), UbStatus::Ok);
    }

    #[test]
    fn shift_limits() {
        let target = Target::default();
        let ub = UbClassifier::new(&target);
        let int = Type::Scalar(ScalarType::Int);
        let llong = Type::Scalar(ScalarType::LongLong);
        let amount = |v| int_value(&target, ScalarType::Int, v);

        assert_eq!(ub.check_shift(&int, &amount(0)), UbStatus::Ok);
        assert_eq!(ub.check_shift(&int, &amount(31)), UbStatus::Ok);
        assert_eq!(ub.check_shift(&int, &amount(32)), UbStatus::InvalidShift);
        assert_eq!(ub.check_shift(&int, &amount(-1)), UbStatus::InvalidShift);
        assert_eq!(ub.check_shift(&llong, &amount(63)), UbStatus::Ok);
        assert_eq!(ub.check_shift(&llong, &amount(64)), UbStatus::InvalidShift);
        assert_eq!(
            ub.check_shift(&Type::Scalar(ScalarType::Char), &amount(32)),
            UbStatus::InvalidShift
        );
        assert_eq!(
            ub.check_shift(&Type::Scalar(ScalarType::Char), &amount(31)),
            UbStatus::Ok
        );
    }

    #[test]
    fn null_pointer_addition_only() {
        let target = Target::default();
        let ub = UbClassifier::new(&target);
        let four = int_value(&target, ScalarType::Int, 4);
        let minus_four = int_value(&target, ScalarType::Int, -4);
        let zero = int_value(&target, ScalarType::Int, 0);

        assert_eq!(
            ub.classify_binary(BinOp::Plus, &int_ptr(0), &four),
            UbStatus::NullptrArithmetic
        );
        assert_eq!(
            ub.classify_binary(BinOp::Plus, &minus_four, &int_ptr(0)),
            UbStatus::NullptrArithmetic
        );
        assert_eq!(ub.classify_binary(BinOp::Plus, &int_ptr(0), &zero), UbStatus::Ok);
        assert_eq!(ub.classify_binary(BinOp::Plus, &int_ptr(4), &minus_four), UbStatus::Ok);
        assert_eq!(ub.classify_binary(BinOp::Minus, &int_ptr(0), &four), UbStatus::Ok);
    }

    #[test]
    fn pointer_difference_tolerances() {
        let target = Target::new(Arch::X86_64);
        let ub = UbClassifier::new(&target);
        let short_ptr = |a| Value::pointer(Type::Scalar(ScalarType::Short), a);
        let diff = |a: Value, b: Value| ub.classify_binary(BinOp::Minus, &a, &b);

        assert_eq!(diff(int_ptr(4), int_ptr(8)), UbStatus::Ok);
        assert_eq!(diff(int_ptr(4), int_ptr(10)), UbStatus::InvalidPtrDiff);
        assert_eq!(diff(short_ptr(4), short_ptr(10)), UbStatus::Ok);
        assert_eq!(diff(short_ptr(4), short_ptr(5)), UbStatus::InvalidPtrDiff);
        assert_eq!(diff(int_ptr(3), int_ptr(7)), UbStatus::Ok);
        assert_eq!(diff(int_ptr(7), int_ptr(6)), UbStatus::Ok);

        let char_ptr = |a| Value::pointer(Type::Scalar(ScalarType::Char), a);
        assert_eq!(diff(char_ptr(1), char_ptr(8)), UbStatus::Ok);
    }
}
