// types.rs
//
// Target type model: sizes, signedness and ranges of the evaluable types on a
// given architecture, plus integer promotion and the usual arithmetic
// conversions. Everything here is a pure query.

use std::fmt;

use exprcheck_frontend::ScalarType;
use serde::{Deserialize, Serialize};

/// Architectures the type model knows about. They differ in the width of
/// `long` and pointers and in the signedness of plain `char`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Arch {
    /// LP64, signed `char`.
    #[default]
    #[serde(rename = "x86_64")]
    X86_64,
    /// LP64, unsigned `char`.
    #[serde(rename = "aarch64")]
    Aarch64,
    /// ILP32, signed `char`.
    #[serde(rename = "i686")]
    I686,
    /// LLP64, signed `char`.
    #[serde(rename = "x86_64-windows")]
    X86_64Windows,
}

impl Arch {
    pub const ALL: [Arch; 4] = [Arch::X86_64, Arch::Aarch64, Arch::I686, Arch::X86_64Windows];

    pub fn name(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
            Arch::I686 => "i686",
            Arch::X86_64Windows => "x86_64-windows",
        }
    }

    pub fn from_name(name: &str) -> Option<Arch> {
        Arch::ALL.into_iter().find(|arch| arch.name() == name)
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type sizes of the debuggee, which need not match the host's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    pub arch: Arch,
    pub char_signed: bool,
    pub long_bits: u32,
    pub pointer_bits: u32,
}

impl Target {
    pub fn new(arch: Arch) -> Self {
        match arch {
            Arch::X86_64 => Self {
                arch,
                char_signed: true,
                long_bits: 64,
                pointer_bits: 64,
            },
            Arch::Aarch64 => Self {
                arch,
                char_signed: false,
                long_bits: 64,
                pointer_bits: 64,
            },
            Arch::I686 => Self {
                arch,
                char_signed: true,
                long_bits: 32,
                pointer_bits: 32,
            },
            Arch::X86_64Windows => Self {
                arch,
                char_signed: true,
                long_bits: 32,
                pointer_bits: 64,
            },
        }
    }

    pub fn bit_width(&self, scalar: ScalarType) -> u32 {
        match scalar {
            ScalarType::Bool
            | ScalarType::Char
            | ScalarType::SignedChar
            | ScalarType::UnsignedChar => 8,
            ScalarType::Short | ScalarType::UnsignedShort => 16,
            ScalarType::Int | ScalarType::UnsignedInt | ScalarType::Float => 32,
            ScalarType::Long | ScalarType::UnsignedLong => self.long_bits,
            ScalarType::LongLong | ScalarType::UnsignedLongLong | ScalarType::Double => 64,
        }
    }

    pub fn is_signed(&self, scalar: ScalarType) -> bool {
        match scalar {
            ScalarType::Char => self.char_signed,
            ScalarType::SignedChar
            | ScalarType::Short
            | ScalarType::Int
            | ScalarType::Long
            | ScalarType::LongLong
            | ScalarType::Float
            | ScalarType::Double => true,
            ScalarType::Bool
            | ScalarType::UnsignedChar
            | ScalarType::UnsignedShort
            | ScalarType::UnsignedInt
            | ScalarType::UnsignedLong
            | ScalarType::UnsignedLongLong => false,
        }
    }

    /// Signedness of a value of type `ty`; pointers count as unsigned.
    pub fn is_signed_type(&self, ty: &Type) -> bool {
        match ty {
            Type::Scalar(scalar) => self.is_signed(*scalar),
            Type::Enum(e) => self.is_signed(e.underlying),
            Type::Pointer(_) | Type::Record(_) => false,
        }
    }

    /// Width in bits of a scalar, enum or pointer value.
    pub fn type_bit_width(&self, ty: &Type) -> u32 {
        match ty {
            Type::Scalar(scalar) => self.bit_width(*scalar),
            Type::Enum(e) => self.bit_width(e.underlying),
            Type::Pointer(_) => self.pointer_bits,
            Type::Record(r) => (r.size * 8) as u32,
        }
    }

    pub fn size_of(&self, ty: &Type) -> u64 {
        match ty {
            Type::Record(r) => r.size,
            other => u64::from(self.type_bit_width(other) / 8),
        }
    }

    /// Inclusive range of an integral or enumeration type. `None` for
    /// floating, pointer and record types.
    pub fn int_range(&self, ty: &Type) -> Option<IntRange> {
        let scalar = match ty {
            Type::Scalar(scalar) if scalar.is_integral() => *scalar,
            Type::Enum(e) => e.underlying,
            _ => return None,
        };
        if scalar == ScalarType::Bool {
            return Some(IntRange { min: 0, max: 1 });
        }
        let bits = self.bit_width(scalar);
        Some(if self.is_signed(scalar) {
            IntRange {
                min: -(1i128 << (bits - 1)),
                max: (1i128 << (bits - 1)) - 1,
            }
        } else {
            IntRange {
                min: 0,
                max: (1i128 << bits) - 1,
            }
        })
    }

    /// Integer promotion. Types of rank below `int` become `int` when it can
    /// hold all their values, `unsigned int` otherwise; unscoped enums
    /// promote through their underlying type. Everything else is unchanged.
    pub fn promote(&self, ty: &Type) -> Type {
        match ty {
            Type::Scalar(scalar) if scalar.is_integral() => {
                Type::Scalar(self.promote_scalar(*scalar))
            }
            Type::Enum(e) if !e.scoped => Type::Scalar(self.promote_scalar(e.underlying)),
            other => other.clone(),
        }
    }

    fn promote_scalar(&self, scalar: ScalarType) -> ScalarType {
        if integer_rank(scalar) >= integer_rank(ScalarType::Int) {
            return scalar;
        }
        let int_bits = self.bit_width(ScalarType::Int);
        let bits = self.bit_width(scalar);
        if bits < int_bits || (bits == int_bits && self.is_signed(scalar)) {
            ScalarType::Int
        } else {
            ScalarType::UnsignedInt
        }
    }

    /// Common type of the two operands of an arithmetic operator, or `None`
    /// when either is not arithmetic.
    pub fn usual_arithmetic_conversion(&self, lhs: &Type, rhs: &Type) -> Option<Type> {
        if !self.is_arithmetic(lhs) || !self.is_arithmetic(rhs) {
            return None;
        }
        for floating in [ScalarType::Double, ScalarType::Float] {
            if *lhs == Type::Scalar(floating) || *rhs == Type::Scalar(floating) {
                return Some(Type::Scalar(floating));
            }
        }
        let (Type::Scalar(l), Type::Scalar(r)) = (self.promote(lhs), self.promote(rhs)) else {
            return None;
        };
        if l == r {
            return Some(Type::Scalar(l));
        }
        let (l_signed, r_signed) = (self.is_signed(l), self.is_signed(r));
        if l_signed == r_signed {
            let wider = if integer_rank(l) >= integer_rank(r) { l } else { r };
            return Some(Type::Scalar(wider));
        }
        let (unsigned, signed) = if l_signed { (r, l) } else { (l, r) };
        Some(Type::Scalar(if integer_rank(unsigned) >= integer_rank(signed) {
            unsigned
        } else if self.bit_width(signed) > self.bit_width(unsigned) {
            signed
        } else {
            unsigned_counterpart(signed)
        }))
    }

    /// Number of bits a shift may move the left operand by: the width of its
    /// promoted type, not of the type as written.
    pub fn shift_width(&self, lhs: &Type) -> u32 {
        self.type_bit_width(&self.promote(lhs))
    }

    /// Arithmetic types take part in the usual arithmetic conversions:
    /// scalars and unscoped enums.
    pub fn is_arithmetic(&self, ty: &Type) -> bool {
        match ty {
            Type::Scalar(_) => true,
            Type::Enum(e) => !e.scoped,
            Type::Pointer(_) | Type::Record(_) => false,
        }
    }

    /// `ptrdiff_t`: the narrowest of `int`, `long` and `long long` as wide
    /// as a pointer. ILP32 targets pick `int`.
    pub fn ptrdiff_type(&self) -> Type {
        if self.pointer_bits == self.bit_width(ScalarType::Int) {
            Type::Scalar(ScalarType::Int)
        } else if self.pointer_bits == self.long_bits {
            Type::Scalar(ScalarType::Long)
        } else {
            Type::Scalar(ScalarType::LongLong)
        }
    }
}

impl Default for Target {
    fn default() -> Self {
        Target::new(Arch::default())
    }
}

/// Conversion rank of an integer type; floats rank above all integers.
pub fn integer_rank(scalar: ScalarType) -> u8 {
    match scalar {
        ScalarType::Bool => 0,
        ScalarType::Char | ScalarType::SignedChar | ScalarType::UnsignedChar => 1,
        ScalarType::Short | ScalarType::UnsignedShort => 2,
        ScalarType::Int | ScalarType::UnsignedInt => 3,
        ScalarType::Long | ScalarType::UnsignedLong => 4,
        ScalarType::LongLong | ScalarType::UnsignedLongLong => 5,
        ScalarType::Float | ScalarType::Double => u8::MAX,
    }
}

pub fn unsigned_counterpart(scalar: ScalarType) -> ScalarType {
    match scalar {
        ScalarType::Char | ScalarType::SignedChar => ScalarType::UnsignedChar,
        ScalarType::Short => ScalarType::UnsignedShort,
        ScalarType::Int => ScalarType::UnsignedInt,
        ScalarType::Long => ScalarType::UnsignedLong,
        ScalarType::LongLong => ScalarType::UnsignedLongLong,
        other => other,
    }
}

/// Inclusive integer range, wide enough for every 64-bit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntRange {
    pub min: i128,
    pub max: i128,
}

impl IntRange {
    pub fn contains(&self, value: i128) -> bool {
        self.min <= value && value <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    pub name: String,
    pub underlying: ScalarType,
    pub scoped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    /// Byte offset from the start of the record.
    pub offset: u64,
}

/// A struct or class, laid out in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordType {
    pub name: String,
    pub size: u64,
    pub align: u64,
    pub fields: Vec<Field>,
}

impl RecordType {
    pub fn new(name: impl Into<String>) -> Self {
        RecordType {
            name: name.into(),
            size: 0,
            align: 1,
            fields: Vec::new(),
        }
    }

    /// Appends a field, aligned to its own size (records to their
    /// alignment), and pads the record to its widest member.
    pub fn with_field(mut self, target: &Target, name: impl Into<String>, ty: Type) -> Self {
        let (size, align) = match &ty {
            Type::Record(r) => (r.size, r.align),
            other => {
                let size = target.size_of(other);
                (size, size.max(1))
            }
        };
        let unpadded = self.fields.last().map_or(0, |f| f.offset + target.size_of(&f.ty));
        let offset = unpadded.next_multiple_of(align);
        self.align = self.align.max(align);
        self.size = (offset + size).next_multiple_of(self.align);
        self.fields.push(Field {
            name: name.into(),
            ty,
            offset,
        });
        self
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A resolved type of a runtime value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Scalar(ScalarType),
    Enum(EnumType),
    Pointer(Box<Type>),
    Record(RecordType),
}

impl Type {
    pub fn pointer_to(pointee: Type) -> Type {
        Type::Pointer(Box::new(pointee))
    }

    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(pointee) => Some(pointee),
            _ => None,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, Type::Scalar(s) if s.is_floating())
    }

    /// Integral scalars and enumerations.
    pub fn is_integral(&self) -> bool {
        match self {
            Type::Scalar(s) => s.is_integral(),
            Type::Enum(_) => true,
            Type::Pointer(_) | Type::Record(_) => false,
        }
    }

    pub fn is_bool(&self) -> bool {
        *self == Type::Scalar(ScalarType::Bool)
    }

    /// Scalar types convert to `bool` and may be tested for truth.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Type::Record(_))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Scalar(scalar) => write!(f, "{scalar}"),
            Type::Enum(e) => f.write_str(&e.name),
            Type::Pointer(pointee) => write!(f, "{pointee} *"),
            Type::Record(r) => f.write_str(&r.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(s: ScalarType) -> Type {
        Type::Scalar(s)
    }

    #[test]
    fn ranges_per_width() {
        let target = Target::new(Arch::X86_64);
        let int = target.int_range(&scalar(ScalarType::Int)).unwrap();
        assert_eq!(int.min, i32::MIN as i128);
        assert_eq!(int.max, i32::MAX as i128);

        let ull = target.int_range(&scalar(ScalarType::UnsignedLongLong)).unwrap();
        assert_eq!(ull.min, 0);
        assert_eq!(ull.max, u64::MAX as i128);

        let schar = target.int_range(&scalar(ScalarType::SignedChar)).unwrap();
        assert_eq!((schar.min, schar.max), (-128, 127));

        assert!(target.int_range(&scalar(ScalarType::Double)).is_none());
        assert!(target.int_range(&Type::pointer_to(scalar(ScalarType::Int))).is_none());
    }

    #[test]
    fn long_and_char_depend_on_target() {
        let lp64 = Target::new(Arch::X86_64);
        let ilp32 = Target::new(Arch::I686);
        let llp64 = Target::new(Arch::X86_64Windows);
        let arm = Target::new(Arch::Aarch64);

        assert_eq!(lp64.bit_width(ScalarType::Long), 64);
        assert_eq!(ilp32.bit_width(ScalarType::Long), 32);
        assert_eq!(llp64.bit_width(ScalarType::Long), 32);
        assert_eq!(llp64.pointer_bits, 64);

        assert!(lp64.is_signed(ScalarType::Char));
        assert!(!arm.is_signed(ScalarType::Char));
        let char_range = arm.int_range(&scalar(ScalarType::Char)).unwrap();
        assert_eq!((char_range.min, char_range.max), (0, 255));
    }

    #[test]
    fn small_types_promote_to_int() {
        let target = Target::default();
        for s in [
            ScalarType::Bool,
            ScalarType::Char,
            ScalarType::UnsignedChar,
            ScalarType::Short,
            ScalarType::UnsignedShort,
        ] {
            assert_eq!(target.promote(&scalar(s)), scalar(ScalarType::Int), "{s}");
        }
        assert_eq!(
            target.promote(&scalar(ScalarType::UnsignedInt)),
            scalar(ScalarType::UnsignedInt)
        );
        assert_eq!(target.promote(&scalar(ScalarType::Float)), scalar(ScalarType::Float));

        let unscoped = Type::Enum(EnumType {
            name: "E".to_string(),
            underlying: ScalarType::UnsignedChar,
            scoped: false,
        });
        assert_eq!(target.promote(&unscoped), scalar(ScalarType::Int));
    }

    #[test]
    fn usual_arithmetic_conversions() {
        let target = Target::new(Arch::X86_64);
        let conv = |a, b| target.usual_arithmetic_conversion(&scalar(a), &scalar(b));

        assert_eq!(conv(ScalarType::Int, ScalarType::Double), Some(scalar(ScalarType::Double)));
        assert_eq!(conv(ScalarType::Float, ScalarType::Long), Some(scalar(ScalarType::Float)));
        assert_eq!(conv(ScalarType::Char, ScalarType::Short), Some(scalar(ScalarType::Int)));
        assert_eq!(
            conv(ScalarType::Int, ScalarType::UnsignedInt),
            Some(scalar(ScalarType::UnsignedInt))
        );
        assert_eq!(conv(ScalarType::UnsignedInt, ScalarType::Long), Some(scalar(ScalarType::Long)));
        assert_eq!(
            conv(ScalarType::LongLong, ScalarType::UnsignedLong),
            Some(scalar(ScalarType::UnsignedLongLong))
        );

        // On LLP64 `long` cannot hold every `unsigned int`.
        let llp64 = Target::new(Arch::X86_64Windows);
        assert_eq!(
            llp64.usual_arithmetic_conversion(
                &scalar(ScalarType::Long),
                &scalar(ScalarType::UnsignedInt)
            ),
            Some(scalar(ScalarType::UnsignedLong))
        );

        let ptr = Type::pointer_to(scalar(ScalarType::Int));
        assert_eq!(target.usual_arithmetic_conversion(&ptr, &scalar(ScalarType::Int)), None);
    }

    #[test]
    fn shift_width_uses_promoted_type() {
        let target = Target::default();
        assert_eq!(target.shift_width(&scalar(ScalarType::Char)), 32);
        assert_eq!(target.shift_width(&scalar(ScalarType::Int)), 32);
        assert_eq!(target.shift_width(&scalar(ScalarType::LongLong)), 64);
        assert_eq!(Target::new(Arch::I686).shift_width(&scalar(ScalarType::Long)), 32);
    }

    #[test]
    fn ptrdiff_matches_data_model() {
        assert_eq!(Target::new(Arch::X86_64).ptrdiff_type(), scalar(ScalarType::Long));
        assert_eq!(Target::new(Arch::I686).ptrdiff_type(), scalar(ScalarType::Int));
        assert_eq!(Target::new(Arch::Aarch64).ptrdiff_type(), scalar(ScalarType::Long));
        assert_eq!(
            Target::new(Arch::X86_64Windows).ptrdiff_type(),
            scalar(ScalarType::LongLong)
        );
    }

    #[test]
    fn record_fields_are_aligned() {
        let target = Target::new(Arch::X86_64);
        let record = RecordType::new("S")
            .with_field(&target, "c", scalar(ScalarType::Char))
            .with_field(&target, "p", Type::pointer_to(scalar(ScalarType::Int)))
            .with_field(&target, "s", scalar(ScalarType::Short));
        let offsets: Vec<u64> = record.fields.iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 8, 16]);
        assert_eq!(record.size, 24);
        assert_eq!(record.field("p").map(|f| f.ty.to_string()), Some("int *".to_string()));
        assert!(record.field("missing").is_none());

        let i686 = Target::new(Arch::I686);
        let record = RecordType::new("S")
            .with_field(&i686, "c", scalar(ScalarType::Char))
            .with_field(&i686, "p", Type::pointer_to(scalar(ScalarType::Int)));
        assert_eq!(record.field("p").map(|f| f.offset), Some(4));
        assert_eq!(record.size, 8);
    }

    #[test]
    fn arch_names_round_trip() {
        for arch in Arch::ALL {
            assert_eq!(Arch::from_name(arch.name()), Some(arch));
        }
        assert_eq!(Arch::from_name("sparc"), None);
    }
}
