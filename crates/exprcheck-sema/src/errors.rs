// errors.rs
//! Evaluation errors (E3xxx).
//!
//! Undefined behavior is not an error: it is reported through `UbStatus` and
//! only becomes `EvalError::UndefinedBehavior` when the caller asks the
//! interpreter to stop at the first finding.

use exprcheck_frontend::{BinOp, UnOp};
use miette::Diagnostic;
use thiserror::Error;

use crate::ub::UbStatus;

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum EvalError {
    #[error("use of undeclared identifier '{name}'")]
    #[diagnostic(code(E3001))]
    UndefinedVariable { name: String },

    #[error("unknown type name '{name}'")]
    #[diagnostic(code(E3002))]
    UnknownType { name: String },

    #[error("invalid operands to binary expression '{op}' ('{lhs}' and '{rhs}')")]
    #[diagnostic(code(E3003))]
    InvalidBinaryOperands { op: BinOp, lhs: String, rhs: String },

    #[error("invalid argument type '{ty}' to unary expression '{op}'")]
    #[diagnostic(code(E3004))]
    InvalidUnaryOperand { op: UnOp, ty: String },

    #[error("cannot cast from type '{from}' to '{to}'")]
    #[diagnostic(code(E3005))]
    InvalidCast { from: String, to: String },

    #[error("{construct} is not supported by the interpreter")]
    #[diagnostic(code(E3006))]
    Unsupported { construct: String },

    #[error("cannot read memory at address {address:#x}")]
    #[diagnostic(code(E3007))]
    MemoryRead { address: u64 },

    #[error("no member named '{field}' in '{ty}'")]
    #[diagnostic(code(E3009))]
    NoMember { ty: String, field: String },

    #[error("indirection requires pointer operand ('{ty}' invalid)")]
    #[diagnostic(code(E3010))]
    InvalidIndirection { ty: String },

    #[error("incompatible operand types ('{lhs}' and '{rhs}')")]
    #[diagnostic(code(E3011))]
    IncompatibleOperands { lhs: String, rhs: String },

    #[error("undefined behavior: {0}")]
    #[diagnostic(code(E3008), help("evaluate without `stop_on_ub` to get a value anyway"))]
    UndefinedBehavior(UbStatus),
}

impl EvalError {
    pub fn unsupported(construct: impl Into<String>) -> Self {
        EvalError::Unsupported {
            construct: construct.into(),
        }
    }
}
