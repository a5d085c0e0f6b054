// display.rs
//
// C++ concrete syntax for expressions, types and declarations. The printer
// is faithful to the tree: parentheses appear only where the tree has a
// `Parenthesized` node.

use std::fmt;

use crate::ast::{Base, DoubleConstant, Expr, IntLength, IntegerConstant, Signedness, VariableDecl};
use crate::ops::UnOp;
use crate::types::{CvQualifiers, QualifiedType, TypeDesc};

impl fmt::Display for IntegerConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base {
            Base::Dec => write!(f, "{}", self.value)?,
            Base::Hex => write!(f, "0x{:x}", self.value)?,
            Base::Bin => write!(f, "0b{:b}", self.value)?,
            Base::Oct if self.value == 0 => f.write_str("0")?,
            Base::Oct => write!(f, "0{:o}", self.value)?,
        }
        if self.signedness == Signedness::Unsigned {
            f.write_str("U")?;
        }
        match self.length {
            IntLength::Int => Ok(()),
            IntLength::Long => f.write_str("L"),
            IntLength::LongLong => f.write_str("LL"),
        }
    }
}

impl fmt::Display for DoubleConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `{:?}` keeps a fractional part or exponent, so the literal never
        // reads back as an integer.
        write!(f, "{:?}", self.value)?;
        if self.is_float {
            f.write_str("f")?;
        }
        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::IntegerConstant(c) => write!(f, "{c}"),
            Expr::DoubleConstant(c) => write!(f, "{c}"),
            Expr::BooleanConstant(b) => write!(f, "{b}"),
            Expr::Variable(v) => f.write_str(&v.name),
            Expr::Unary(e) => {
                let operand = e.operand.to_string();
                let sign = matches!(e.op, UnOp::Plus | UnOp::Neg);
                if sign && operand.starts_with(e.op.symbol()) {
                    // `- -x`, not `--x`.
                    write!(f, "{} {operand}", e.op)
                } else {
                    write!(f, "{}{operand}", e.op)
                }
            }
            Expr::Binary(e) => write!(f, "{} {} {}", e.lhs, e.op, e.rhs),
            Expr::AddressOf(e) => {
                let operand = e.operand.to_string();
                if operand.starts_with('&') {
                    write!(f, "& {operand}")
                } else {
                    write!(f, "&{operand}")
                }
            }
            Expr::Dereference(e) => write!(f, "*{}", e.operand),
            Expr::MemberOf(e) => write!(f, "{}.{}", e.base, e.field),
            Expr::MemberOfPtr(e) => write!(f, "{}->{}", e.base, e.field),
            Expr::ArrayIndex(e) => write!(f, "{}[{}]", e.base, e.index),
            Expr::Ternary(e) => write!(f, "{} ? {} : {}", e.cond, e.lhs, e.rhs),
            Expr::Cast(e) => write!(f, "({}){}", e.ty, e.operand),
            Expr::Parenthesized(inner) => write!(f, "({inner})"),
        }
    }
}

fn write_cv(f: &mut fmt::Formatter<'_>, cv: CvQualifiers, leading: bool) -> fmt::Result {
    let mut words = Vec::with_capacity(2);
    if cv.is_const {
        words.push("const");
    }
    if cv.is_volatile {
        words.push("volatile");
    }
    if words.is_empty() {
        return Ok(());
    }
    if leading {
        write!(f, "{} ", words.join(" "))
    } else {
        write!(f, " {}", words.join(" "))
    }
}

impl fmt::Display for QualifiedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ty {
            TypeDesc::Scalar(scalar) => {
                write_cv(f, self.cv, true)?;
                write!(f, "{scalar}")
            }
            TypeDesc::Tagged(name) => {
                write_cv(f, self.cv, true)?;
                f.write_str(name)
            }
            TypeDesc::Pointer(pointee) => {
                write!(f, "{pointee}*")?;
                write_cv(f, self.cv, false)
            }
            // References carry no cv-qualifiers of their own.
            TypeDesc::Reference(referee) => write!(f, "{referee}&"),
        }
    }
}

impl fmt::Display for VariableDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {};", self.ty, self.name)
    }
}
