// value.rs
//
// Runtime values: a resolved type plus its bits, held as a 64-bit integer of
// the right signedness or as a double. A record value is its address; its
// fields stay in frame memory.

use std::fmt;

use exprcheck_frontend::ScalarType;

use crate::types::{RecordType, Target, Type};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    ty: Type,
    scalar: Scalar,
}

impl Value {
    /// Integer value of type `ty`, wrapped to the type's width the way a
    /// conversion to an integer type of that width would.
    pub fn from_int(target: &Target, ty: Type, raw: i128) -> Value {
        if ty.is_bool() {
            return Value {
                ty,
                scalar: Scalar::Unsigned(u64::from(raw != 0)),
            };
        }
        let bits = target.type_bit_width(&ty).clamp(1, 64);
        let scalar = if target.is_signed_type(&ty) {
            let shift = 128 - bits;
            Scalar::Signed(((raw << shift) >> shift) as i64)
        } else {
            let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
            Scalar::Unsigned((raw as u64) & mask)
        };
        Value { ty, scalar }
    }

    /// Floating value of type `ty`; `float` values are rounded to single
    /// precision.
    pub fn from_float(ty: Type, raw: f64) -> Value {
        let raw = if ty == Type::Scalar(ScalarType::Float) {
            raw as f32 as f64
        } else {
            raw
        };
        Value {
            ty,
            scalar: Scalar::Float(raw),
        }
    }

    pub fn pointer(pointee: Type, address: u64) -> Value {
        Value {
            ty: Type::pointer_to(pointee),
            scalar: Scalar::Unsigned(address),
        }
    }

    pub fn record(record: RecordType, address: u64) -> Value {
        Value {
            ty: Type::Record(record),
            scalar: Scalar::Unsigned(address),
        }
    }

    /// Zero of any type: null for pointers, address zero for records.
    pub fn zero(target: &Target, ty: &Type) -> Value {
        match ty {
            Type::Record(r) => Value::record(r.clone(), 0),
            ty if ty.is_floating() => Value::from_float(ty.clone(), 0.0),
            ty => Value::from_int(target, ty.clone(), 0),
        }
    }

    pub fn boolean(value: bool) -> Value {
        Value {
            ty: Type::Scalar(ScalarType::Bool),
            scalar: Scalar::Unsigned(u64::from(value)),
        }
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn scalar(&self) -> Scalar {
        self.scalar
    }

    /// Integer value, for integral, enumeration and pointer values.
    pub fn as_i128(&self) -> Option<i128> {
        match self.scalar {
            Scalar::Signed(v) => Some(i128::from(v)),
            Scalar::Unsigned(v) => Some(i128::from(v)),
            Scalar::Float(_) => None,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self.scalar {
            Scalar::Signed(v) => v as f64,
            Scalar::Unsigned(v) => v as f64,
            Scalar::Float(v) => v,
        }
    }

    pub fn address(&self) -> Option<u64> {
        match (&self.ty, self.scalar) {
            (Type::Pointer(_) | Type::Record(_), Scalar::Unsigned(address)) => Some(address),
            _ => None,
        }
    }

    /// Truth value as used by `!`, `&&`, `||` and `?:`.
    pub fn is_truthy(&self) -> bool {
        match self.scalar {
            Scalar::Signed(v) => v != 0,
            Scalar::Unsigned(v) => v != 0,
            Scalar::Float(v) => v != 0.0,
        }
    }

    /// Converts between arithmetic, enumeration and pointer types without
    /// checking for undefined behavior. Out-of-range floating values
    /// saturate; NaN becomes zero.
    pub fn convert(&self, target: &Target, to: &Type) -> Value {
        if to.is_floating() {
            return Value::from_float(to.clone(), self.as_f64());
        }
        if to.is_bool() {
            return Value::boolean(self.is_truthy());
        }
        let raw = match self.scalar {
            Scalar::Float(v) => v.trunc() as i128,
            Scalar::Signed(v) => i128::from(v),
            Scalar::Unsigned(v) => i128::from(v),
        };
        Value::from_int(target, to.clone(), raw)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.ty, self.scalar) {
            (Type::Pointer(_), Scalar::Unsigned(address)) => write!(f, "0x{address:x}"),
            (Type::Record(r), Scalar::Unsigned(address)) => {
                write!(f, "{} @ 0x{address:x}", r.name)
            }
            (ty, Scalar::Unsigned(v)) if ty.is_bool() => write!(f, "{}", v != 0),
            (_, Scalar::Signed(v)) => write!(f, "{v}"),
            (_, Scalar::Unsigned(v)) => write!(f, "{v}"),
            (_, Scalar::Float(v)) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Arch;

    fn int(s: ScalarType) -> Type {
        Type::Scalar(s)
    }

    #[test]
    fn from_int_wraps_to_width() {
        let target = Target::default();
        let v = Value::from_int(&target, int(ScalarType::Int), i128::from(i32::MAX) + 1);
        assert_eq!(v.scalar(), Scalar::Signed(i64::from(i32::MIN)));

        let v = Value::from_int(&target, int(ScalarType::UnsignedChar), -1);
        assert_eq!(v.scalar(), Scalar::Unsigned(255));

        let v = Value::from_int(&target, int(ScalarType::UnsignedLongLong), -1);
        assert_eq!(v.scalar(), Scalar::Unsigned(u64::MAX));

        let v = Value::from_int(&target, int(ScalarType::Bool), 42);
        assert_eq!(v.scalar(), Scalar::Unsigned(1));
    }

    #[test]
    fn plain_char_signedness_follows_target() {
        let x86 = Target::new(Arch::X86_64);
        let arm = Target::new(Arch::Aarch64);
        let v = Value::from_int(&x86, int(ScalarType::Char), 200);
        assert_eq!(v.as_i128(), Some(-56));
        let v = Value::from_int(&arm, int(ScalarType::Char), 200);
        assert_eq!(v.as_i128(), Some(200));
    }

    #[test]
    fn float_values_round_to_single_precision() {
        let v = Value::from_float(int(ScalarType::Float), 0.1);
        assert_eq!(v.as_f64(), 0.1f32 as f64);
        let v = Value::from_float(int(ScalarType::Double), 0.1);
        assert_eq!(v.as_f64(), 0.1);
    }

    #[test]
    fn convert_truncates_toward_zero() {
        let target = Target::default();
        let v = Value::from_float(int(ScalarType::Double), -2.9);
        assert_eq!(v.convert(&target, &int(ScalarType::Int)).as_i128(), Some(-2));
        let v = Value::from_float(int(ScalarType::Double), f64::NAN);
        assert_eq!(v.convert(&target, &int(ScalarType::Int)).as_i128(), Some(0));
    }

    #[test]
    fn display_forms() {
        let target = Target::default();
        assert_eq!(Value::pointer(int(ScalarType::Int), 16).to_string(), "0x10");
        assert_eq!(Value::boolean(true).to_string(), "true");
        assert_eq!(Value::from_int(&target, int(ScalarType::Int), -3).to_string(), "-3");
        assert_eq!(Value::from_float(int(ScalarType::Double), 1.5).to_string(), "1.5");
        let record = Value::record(RecordType::new("S"), 0x3000);
        assert_eq!(record.to_string(), "S @ 0x3000");
        assert_eq!(record.address(), Some(0x3000));
    }
}
