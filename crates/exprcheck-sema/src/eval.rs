// eval.rs
//
// Reference interpreter. Walks an expression tree against a `Frame`, applies
// promotions and the usual arithmetic conversions, and asks the classifier
// about every operator and cast along the way.

use std::cmp::Ordering;

use exprcheck_frontend::{
    ArrayIndex, Base, BinOp, BinaryExpr, CastExpr, DoubleConstant, Expr, IntLength,
    IntegerConstant, MemberOf, MemberOfPtr, QualifiedType, ScalarType, Signedness, TernaryExpr,
    TypeDesc, UnOp, UnaryExpr,
};

use crate::errors::EvalError;
use crate::frame::Frame;
use crate::types::{RecordType, Target, Type};
use crate::ub::{UbClassifier, UbStatus};
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct EvalOptions {
    /// Fail with `EvalError::UndefinedBehavior` at the first finding instead
    /// of recording it and carrying on with an unspecified value.
    pub stop_on_ub: bool,
}

/// Result of evaluating a whole expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: Value,
    /// The first undefined behavior met, or `Ok`.
    pub ub: UbStatus,
}

pub struct Interpreter<'a, F: Frame + ?Sized> {
    target: &'a Target,
    frame: &'a F,
    options: EvalOptions,
    ub: UbStatus,
    /// Set while typing the branch a conditional does not take: nothing is
    /// reported and unreadable memory reads as zero.
    speculative: bool,
}

/// Evaluates `expr` with default options.
pub fn evaluate<F: Frame + ?Sized>(
    target: &Target,
    frame: &F,
    expr: &Expr,
) -> Result<Evaluation, EvalError> {
    Interpreter::new(target, frame).eval(expr)
}

/// Integer bits of an integral or pointer value.
fn bits(value: &Value) -> i128 {
    value.as_i128().unwrap_or_else(|| value.as_f64().trunc() as i128)
}

fn invalid_binary(op: BinOp, lhs: &Value, rhs: &Value) -> EvalError {
    EvalError::InvalidBinaryOperands {
        op,
        lhs: lhs.ty().to_string(),
        rhs: rhs.ty().to_string(),
    }
}

fn invalid_unary(op: UnOp, operand: &Value) -> EvalError {
    EvalError::InvalidUnaryOperand {
        op,
        ty: operand.ty().to_string(),
    }
}

impl<'a, F: Frame + ?Sized> Interpreter<'a, F> {
    pub fn new(target: &'a Target, frame: &'a F) -> Self {
        Self {
            target,
            frame,
            options: EvalOptions::default(),
            ub: UbStatus::Ok,
            speculative: false,
        }
    }

    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    #[tracing::instrument(skip(self, expr), fields(expr = %expr))]
    pub fn eval(&mut self, expr: &Expr) -> Result<Evaluation, EvalError> {
        self.ub = UbStatus::Ok;
        let value = self.visit(expr)?;
        Ok(Evaluation {
            value,
            ub: self.ub,
        })
    }

    fn classifier(&self) -> UbClassifier<'a> {
        UbClassifier::new(self.target)
    }

    fn report(&mut self, status: UbStatus) -> Result<(), EvalError> {
        if status.is_ok() || self.speculative {
            return Ok(());
        }
        self.ub = self.ub.or(status);
        if self.options.stop_on_ub {
            return Err(EvalError::UndefinedBehavior(status));
        }
        Ok(())
    }

    /// Integral types that take part in arithmetic (scoped enums don't).
    fn is_integer_operand(&self, ty: &Type) -> bool {
        ty.is_integral() && self.target.is_arithmetic(ty)
    }

    fn visit(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::IntegerConstant(c) => Ok(self.integer_literal(c)),
            Expr::DoubleConstant(c) => Ok(double_literal(c)),
            Expr::BooleanConstant(b) => Ok(Value::boolean(*b)),
            Expr::Variable(v) => {
                self.frame
                    .variable(&v.name)
                    .ok_or_else(|| EvalError::UndefinedVariable {
                        name: v.name.clone(),
                    })
            }
            Expr::Unary(e) => self.visit_unary(e),
            Expr::Binary(e) => self.visit_binary(e),
            Expr::AddressOf(e) => self.visit_address_of(&e.operand),
            Expr::Dereference(e) => {
                let pointer = self.visit(&e.operand)?;
                let (Some(address), Some(pointee)) = (pointer.address(), pointer.ty().pointee())
                else {
                    return Err(EvalError::InvalidIndirection {
                        ty: pointer.ty().to_string(),
                    });
                };
                self.load(address, pointee)
            }
            Expr::MemberOf(e) => {
                let (ty, address) = self.member_of(e)?;
                self.load(address, &ty)
            }
            Expr::MemberOfPtr(e) => {
                let (ty, address) = self.member_of_ptr(e)?;
                self.load(address, &ty)
            }
            Expr::ArrayIndex(e) => self.visit_index(e),
            Expr::Ternary(e) => self.visit_ternary(e),
            Expr::Cast(e) => self.visit_cast(e),
            Expr::Parenthesized(inner) => self.visit(inner),
        }
    }

    /// Type of an integer literal: the first candidate that can hold it.
    /// Decimal literals without `U` stay signed.
    fn integer_literal(&self, c: &IntegerConstant) -> Value {
        use ScalarType as S;

        let decimal = c.base == Base::Dec;
        let candidates: &[ScalarType] = match (c.length, c.signedness, decimal) {
            (IntLength::Int, Signedness::Signed, true) => &[S::Int, S::Long, S::LongLong],
            (IntLength::Int, Signedness::Signed, false) => &[
                S::Int,
                S::UnsignedInt,
                S::Long,
                S::UnsignedLong,
                S::LongLong,
                S::UnsignedLongLong,
            ],
            (IntLength::Int, Signedness::Unsigned, _) => {
                &[S::UnsignedInt, S::UnsignedLong, S::UnsignedLongLong]
            }
            (IntLength::Long, Signedness::Signed, true) => &[S::Long, S::LongLong],
            (IntLength::Long, Signedness::Signed, false) => {
                &[S::Long, S::UnsignedLong, S::LongLong, S::UnsignedLongLong]
            }
            (IntLength::Long, Signedness::Unsigned, _) => &[S::UnsignedLong, S::UnsignedLongLong],
            (IntLength::LongLong, Signedness::Signed, true) => &[S::LongLong],
            (IntLength::LongLong, Signedness::Signed, false) => &[S::LongLong, S::UnsignedLongLong],
            (IntLength::LongLong, Signedness::Unsigned, _) => &[S::UnsignedLongLong],
        };
        let raw = i128::from(c.value);
        let scalar = candidates
            .iter()
            .copied()
            .find(|s| {
                self.target
                    .int_range(&Type::Scalar(*s))
                    .is_some_and(|range| range.contains(raw))
            })
            .unwrap_or(S::UnsignedLongLong);
        Value::from_int(self.target, Type::Scalar(scalar), raw)
    }

    fn visit_unary(&mut self, e: &UnaryExpr) -> Result<Value, EvalError> {
        let operand = self.visit(&e.operand)?;
        let ty = operand.ty().clone();
        match e.op {
            UnOp::LogicalNot if ty.is_scalar() => Ok(Value::boolean(!operand.is_truthy())),
            UnOp::Plus if ty.is_pointer() => Ok(operand),
            UnOp::Plus if self.target.is_arithmetic(&ty) => {
                Ok(operand.convert(self.target, &self.target.promote(&ty)))
            }
            UnOp::Neg if self.target.is_arithmetic(&ty) => {
                let promoted = self.target.promote(&ty);
                let v = operand.convert(self.target, &promoted);
                if promoted.is_floating() {
                    Ok(Value::from_float(promoted, -v.as_f64()))
                } else {
                    Ok(Value::from_int(self.target, promoted, bits(&v).wrapping_neg()))
                }
            }
            UnOp::BitNot if self.is_integer_operand(&ty) => {
                let promoted = self.target.promote(&ty);
                let v = operand.convert(self.target, &promoted);
                Ok(Value::from_int(self.target, promoted, !bits(&v)))
            }
            op => Err(invalid_unary(op, &operand)),
        }
    }

    fn visit_binary(&mut self, e: &BinaryExpr) -> Result<Value, EvalError> {
        if e.op.is_logical() {
            return self.visit_logical(e);
        }
        let lhs = self.visit(&e.lhs)?;
        let rhs = self.visit(&e.rhs)?;
        match e.op {
            BinOp::Plus | BinOp::Minus if lhs.ty().is_pointer() || rhs.ty().is_pointer() => {
                self.pointer_arithmetic(e.op, lhs, rhs)
            }
            BinOp::Shl | BinOp::Shr => self.shift(e.op, lhs, rhs),
            op if op.is_comparison() => self.compare(op, lhs, rhs),
            op => self.arithmetic(op, lhs, rhs),
        }
    }

    /// `&&` and `||`; the right operand is skipped, and never classified,
    /// when the left one decides the result.
    fn visit_logical(&mut self, e: &BinaryExpr) -> Result<Value, EvalError> {
        let lhs = self.visit(&e.lhs)?;
        if !lhs.ty().is_scalar() {
            return Err(invalid_binary(e.op, &lhs, &lhs));
        }
        let decided = match e.op {
            BinOp::LogicalAnd => !lhs.is_truthy(),
            _ => lhs.is_truthy(),
        };
        if decided {
            return Ok(Value::boolean(lhs.is_truthy()));
        }
        let rhs = self.visit(&e.rhs)?;
        if !rhs.ty().is_scalar() {
            return Err(invalid_binary(e.op, &lhs, &rhs));
        }
        Ok(Value::boolean(rhs.is_truthy()))
    }

    /// `ptr + n`, `n + ptr`, `ptr - n` and `ptr - ptr`.
    fn pointer_arithmetic(&mut self, op: BinOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
        let (l_ptr, r_ptr) = (lhs.ty().is_pointer(), rhs.ty().is_pointer());
        match (op, l_ptr, r_ptr) {
            (BinOp::Plus, true, false) if self.is_integer_operand(rhs.ty()) => {
                self.report(self.classifier().classify_binary(op, &lhs, &rhs))?;
                Ok(self.offset(&lhs, bits(&rhs)))
            }
            (BinOp::Plus, false, true) if self.is_integer_operand(lhs.ty()) => {
                self.report(self.classifier().classify_binary(op, &lhs, &rhs))?;
                Ok(self.offset(&rhs, bits(&lhs)))
            }
            (BinOp::Minus, true, false) if self.is_integer_operand(rhs.ty()) => {
                self.report(self.classifier().classify_binary(op, &lhs, &rhs))?;
                Ok(self.offset(&lhs, bits(&rhs).wrapping_neg()))
            }
            (BinOp::Minus, true, true) if lhs.ty() == rhs.ty() => {
                self.report(self.classifier().classify_binary(op, &lhs, &rhs))?;
                let size = lhs
                    .ty()
                    .pointee()
                    .map_or(1, |pointee| self.target.size_of(pointee))
                    .max(1) as i128;
                let distance = bits(&lhs) - bits(&rhs);
                Ok(Value::from_int(
                    self.target,
                    self.target.ptrdiff_type(),
                    distance / size,
                ))
            }
            _ => Err(invalid_binary(op, &lhs, &rhs)),
        }
    }

    /// `ptr` moved by `elements` elements, without classification.
    fn offset(&self, ptr: &Value, elements: i128) -> Value {
        let size = ptr
            .ty()
            .pointee()
            .map_or(1, |pointee| self.target.size_of(pointee)) as i128;
        let address = bits(ptr).wrapping_add(elements.wrapping_mul(size));
        Value::from_int(self.target, ptr.ty().clone(), address)
    }

    /// Shifts promote each operand on its own; the result has the type of
    /// the promoted left operand.
    fn shift(&mut self, op: BinOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
        if !self.is_integer_operand(lhs.ty()) || !self.is_integer_operand(rhs.ty()) {
            return Err(invalid_binary(op, &lhs, &rhs));
        }
        let lt = self.target.promote(lhs.ty());
        let rt = self.target.promote(rhs.ty());
        let lhs = lhs.convert(self.target, &lt);
        let rhs = rhs.convert(self.target, &rt);
        self.report(self.classifier().classify_binary(op, &lhs, &rhs))?;

        let width = i128::from(self.target.shift_width(&lt));
        let amount = bits(&rhs).rem_euclid(width) as u32;
        let value = bits(&lhs);
        let result = if op == BinOp::Shl {
            value << amount
        } else {
            value >> amount
        };
        Ok(Value::from_int(self.target, lt, result))
    }

    fn compare(&mut self, op: BinOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
        let ordering = if lhs.ty().is_pointer() && rhs.ty().is_pointer() {
            Some(bits(&lhs).cmp(&bits(&rhs)))
        } else {
            let Some(common) = self.target.usual_arithmetic_conversion(lhs.ty(), rhs.ty()) else {
                return Err(invalid_binary(op, &lhs, &rhs));
            };
            let (l, r) = (lhs.convert(self.target, &common), rhs.convert(self.target, &common));
            if common.is_floating() {
                l.as_f64().partial_cmp(&r.as_f64())
            } else {
                Some(bits(&l).cmp(&bits(&r)))
            }
        };
        let result = match op {
            BinOp::Lt => ordering == Some(Ordering::Less),
            BinOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            BinOp::Gt => ordering == Some(Ordering::Greater),
            BinOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            BinOp::Eq => ordering == Some(Ordering::Equal),
            BinOp::Ne => ordering != Some(Ordering::Equal),
            _ => return Err(invalid_binary(op, &lhs, &rhs)),
        };
        Ok(Value::boolean(result))
    }

    /// `* / % + - & | ^` on arithmetic operands, in their common type.
    fn arithmetic(&mut self, op: BinOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
        let Some(common) = self.target.usual_arithmetic_conversion(lhs.ty(), rhs.ty()) else {
            return Err(invalid_binary(op, &lhs, &rhs));
        };
        let (l, r) = (lhs.convert(self.target, &common), rhs.convert(self.target, &common));

        if common.is_floating() {
            let (a, b) = (l.as_f64(), r.as_f64());
            let result = match op {
                BinOp::Mul => a * b,
                BinOp::Div => a / b,
                BinOp::Plus => a + b,
                BinOp::Minus => a - b,
                _ => return Err(invalid_binary(op, &lhs, &rhs)),
            };
            return Ok(Value::from_float(common, result));
        }

        self.report(self.classifier().classify_binary(op, &l, &r))?;
        let (a, b) = (bits(&l), bits(&r));
        let result = match op {
            BinOp::Mul => a.wrapping_mul(b),
            BinOp::Div if b == 0 => 0,
            BinOp::Div => a.wrapping_div(b),
            BinOp::Mod if b == 0 => 0,
            BinOp::Mod => a.wrapping_rem(b),
            BinOp::Plus => a.wrapping_add(b),
            BinOp::Minus => a.wrapping_sub(b),
            BinOp::BitAnd => a & b,
            BinOp::BitOr => a | b,
            BinOp::BitXor => a ^ b,
            _ => return Err(invalid_binary(op, &lhs, &rhs)),
        };
        Ok(Value::from_int(self.target, common, result))
    }

    /// The selected branch is evaluated; the other is only typed, without
    /// classification. The result has the common type of both branches.
    fn visit_ternary(&mut self, e: &TernaryExpr) -> Result<Value, EvalError> {
        let cond = self.visit(&e.cond)?;
        if !cond.ty().is_scalar() {
            return Err(EvalError::InvalidCast {
                from: cond.ty().to_string(),
                to: "bool".to_string(),
            });
        }
        let (taken, skipped) = if cond.is_truthy() {
            (&e.lhs, &e.rhs)
        } else {
            (&e.rhs, &e.lhs)
        };
        let value = self.visit(taken)?;
        let other = self.visit_speculative(skipped)?;
        let Some(common) = self.conditional_type(value.ty(), other.ty()) else {
            let (lhs, rhs) = if cond.is_truthy() {
                (value.ty(), other.ty())
            } else {
                (other.ty(), value.ty())
            };
            return Err(EvalError::IncompatibleOperands {
                lhs: lhs.to_string(),
                rhs: rhs.to_string(),
            });
        };
        if *value.ty() == common {
            return Ok(value);
        }
        Ok(value.convert(self.target, &common))
    }

    fn visit_speculative(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        let outer = std::mem::replace(&mut self.speculative, true);
        let result = self.visit(expr);
        self.speculative = outer;
        result
    }

    /// Common type of the second and third operands of `?:`.
    fn conditional_type(&self, lhs: &Type, rhs: &Type) -> Option<Type> {
        if lhs == rhs {
            return Some(lhs.clone());
        }
        if let Some(common) = self.target.usual_arithmetic_conversion(lhs, rhs) {
            return Some(common);
        }
        match (lhs.is_pointer(), rhs.is_pointer()) {
            (true, false) if self.is_integer_operand(rhs) => Some(lhs.clone()),
            (false, true) if self.is_integer_operand(lhs) => Some(rhs.clone()),
            _ => None,
        }
    }

    fn visit_cast(&mut self, e: &CastExpr) -> Result<Value, EvalError> {
        let dest = self.resolve_type(&e.ty)?;
        let value = self.visit(&e.operand)?;
        let src = value.ty().clone();
        let invalid = || EvalError::InvalidCast {
            from: src.to_string(),
            to: dest.to_string(),
        };
        match &dest {
            Type::Record(_) => Err(invalid()),
            Type::Pointer(_) if src.is_pointer() || src.is_integral() => {
                Ok(value.convert(self.target, &dest))
            }
            Type::Pointer(_) => Err(invalid()),
            _ if matches!(src, Type::Record(_)) => Err(invalid()),
            _ if src.is_pointer() && dest.is_floating() => Err(invalid()),
            _ => {
                self.report(self.classifier().check_cast(&value, &dest))?;
                Ok(value.convert(self.target, &dest))
            }
        }
    }

    fn resolve_type(&self, ty: &QualifiedType) -> Result<Type, EvalError> {
        match &ty.ty {
            TypeDesc::Scalar(scalar) => Ok(Type::Scalar(*scalar)),
            TypeDesc::Tagged(name) => {
                self.frame
                    .tagged_type(name)
                    .ok_or_else(|| EvalError::UnknownType { name: name.clone() })
            }
            TypeDesc::Pointer(pointee) => Ok(Type::pointer_to(self.resolve_type(pointee)?)),
            TypeDesc::Reference(_) => Err(EvalError::unsupported("cast to a reference type")),
        }
    }

    /// `&base[index]`, `&name`, `&*ptr` and `&s.field`. Taking an address is
    /// never classified, whatever the base.
    fn visit_address_of(&mut self, operand: &Expr) -> Result<Value, EvalError> {
        match operand.unparenthesized() {
            Expr::ArrayIndex(e) => self.element_pointer(e),
            Expr::Variable(v) => {
                let value = self
                    .frame
                    .variable(&v.name)
                    .ok_or_else(|| EvalError::UndefinedVariable {
                        name: v.name.clone(),
                    })?;
                let address = self.frame.address_of(&v.name).or_else(|| match value.ty() {
                    Type::Record(_) => value.address(),
                    _ => None,
                });
                let address = address.ok_or_else(|| {
                    EvalError::unsupported(format!("taking the address of '{}'", v.name))
                })?;
                Ok(Value::pointer(value.ty().clone(), address))
            }
            Expr::Dereference(e) => {
                let pointer = self.visit(&e.operand)?;
                if !pointer.ty().is_pointer() {
                    return Err(EvalError::InvalidIndirection {
                        ty: pointer.ty().to_string(),
                    });
                }
                Ok(pointer)
            }
            Expr::MemberOf(e) => {
                let (ty, address) = self.member_of(e)?;
                Ok(Value::pointer(ty, address))
            }
            Expr::MemberOfPtr(e) => {
                let (ty, address) = self.member_of_ptr(e)?;
                Ok(Value::pointer(ty, address))
            }
            other => Err(EvalError::unsupported(format!("taking the address of '{other}'"))),
        }
    }

    /// Type and address of `base.field`.
    fn member_of(&mut self, e: &MemberOf) -> Result<(Type, u64), EvalError> {
        let base = self.visit(&e.base)?;
        match (base.ty(), base.address()) {
            (Type::Record(record), Some(address)) => field_location(record, address, &e.field),
            (ty, _) => Err(EvalError::NoMember {
                ty: ty.to_string(),
                field: e.field.clone(),
            }),
        }
    }

    /// Type and address of `base->field`.
    fn member_of_ptr(&mut self, e: &MemberOfPtr) -> Result<(Type, u64), EvalError> {
        let base = self.visit(&e.base)?;
        match (base.ty().pointee(), base.address()) {
            (Some(Type::Record(record)), Some(address)) => {
                field_location(record, address, &e.field)
            }
            _ => Err(EvalError::NoMember {
                ty: base.ty().to_string(),
                field: e.field.clone(),
            }),
        }
    }

    /// Reads an object of type `ty` at `address`. Records are not read;
    /// their value is the address itself.
    fn load(&self, address: u64, ty: &Type) -> Result<Value, EvalError> {
        if let Type::Record(record) = ty {
            return Ok(Value::record(record.clone(), address));
        }
        match self.frame.read(address, ty) {
            Some(value) => Ok(value),
            None if self.speculative => Ok(Value::zero(self.target, ty)),
            None => Err(EvalError::MemoryRead { address }),
        }
    }

    fn element_pointer(&mut self, e: &ArrayIndex) -> Result<Value, EvalError> {
        let base = self.visit(&e.base)?;
        let index = self.visit(&e.index)?;
        if !base.ty().is_pointer() || !self.is_integer_operand(index.ty()) {
            return Err(EvalError::InvalidBinaryOperands {
                op: BinOp::Plus,
                lhs: base.ty().to_string(),
                rhs: index.ty().to_string(),
            });
        }
        Ok(self.offset(&base, bits(&index)))
    }

    fn visit_index(&mut self, e: &ArrayIndex) -> Result<Value, EvalError> {
        let element = self.element_pointer(e)?;
        let (Some(address), Some(pointee)) = (element.address(), element.ty().pointee()) else {
            return Err(EvalError::unsupported("indexing a non-pointer"));
        };
        self.load(address, pointee)
    }
}

fn field_location(
    record: &RecordType,
    address: u64,
    field: &str,
) -> Result<(Type, u64), EvalError> {
    let found = record.field(field).ok_or_else(|| EvalError::NoMember {
        ty: record.name.clone(),
        field: field.to_string(),
    })?;
    Ok((found.ty.clone(), address.wrapping_add(found.offset)))
}

fn double_literal(c: &DoubleConstant) -> Value {
    let scalar = if c.is_float {
        ScalarType::Float
    } else {
        ScalarType::Double
    };
    Value::from_float(Type::Scalar(scalar), c.value)
}
