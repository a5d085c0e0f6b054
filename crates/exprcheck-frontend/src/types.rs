// types.rs
//
// Source-level type descriptors: what a cast or a declaration names, before
// any target architecture gives it a size.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Builtin arithmetic types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
}

impl ScalarType {
    pub const ALL: [ScalarType; 14] = [
        ScalarType::Bool,
        ScalarType::Char,
        ScalarType::SignedChar,
        ScalarType::UnsignedChar,
        ScalarType::Short,
        ScalarType::UnsignedShort,
        ScalarType::Int,
        ScalarType::UnsignedInt,
        ScalarType::Long,
        ScalarType::UnsignedLong,
        ScalarType::LongLong,
        ScalarType::UnsignedLongLong,
        ScalarType::Float,
        ScalarType::Double,
    ];

    pub fn c_name(self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Char => "char",
            ScalarType::SignedChar => "signed char",
            ScalarType::UnsignedChar => "unsigned char",
            ScalarType::Short => "short",
            ScalarType::UnsignedShort => "unsigned short",
            ScalarType::Int => "int",
            ScalarType::UnsignedInt => "unsigned int",
            ScalarType::Long => "long",
            ScalarType::UnsignedLong => "unsigned long",
            ScalarType::LongLong => "long long",
            ScalarType::UnsignedLongLong => "unsigned long long",
            ScalarType::Float => "float",
            ScalarType::Double => "double",
        }
    }

    pub fn is_floating(self) -> bool {
        matches!(self, ScalarType::Float | ScalarType::Double)
    }

    pub fn is_integral(self) -> bool {
        !self.is_floating()
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.c_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CvQualifiers {
    pub is_const: bool,
    pub is_volatile: bool,
}

impl CvQualifiers {
    pub const NONE: CvQualifiers = CvQualifiers {
        is_const: false,
        is_volatile: false,
    };

    pub fn new(is_const: bool, is_volatile: bool) -> Self {
        Self {
            is_const,
            is_volatile,
        }
    }

    pub fn is_empty(self) -> bool {
        !self.is_const && !self.is_volatile
    }
}

/// A type as written in source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDesc {
    Scalar(ScalarType),
    /// A struct, class, union or enum referred to by name.
    Tagged(String),
    Pointer(Box<QualifiedType>),
    Reference(Box<QualifiedType>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedType {
    pub ty: TypeDesc,
    pub cv: CvQualifiers,
}

impl QualifiedType {
    pub fn new(ty: TypeDesc, cv: CvQualifiers) -> Self {
        Self { ty, cv }
    }

    pub fn unqualified(ty: TypeDesc) -> Self {
        Self::new(ty, CvQualifiers::NONE)
    }

    pub fn scalar(scalar: ScalarType) -> Self {
        Self::unqualified(TypeDesc::Scalar(scalar))
    }

    pub fn tagged(name: impl Into<String>) -> Self {
        Self::unqualified(TypeDesc::Tagged(name.into()))
    }

    pub fn pointer_to(pointee: QualifiedType) -> Self {
        Self::unqualified(TypeDesc::Pointer(Box::new(pointee)))
    }

    pub fn reference_to(referee: QualifiedType) -> Self {
        Self::unqualified(TypeDesc::Reference(Box::new(referee)))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.ty, TypeDesc::Reference(_))
    }
}
