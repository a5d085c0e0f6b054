//! exprcheck frontend: the expression tree, operators and type descriptors
//! shared by the generator and the interpreter, plus their C++ spelling.
//!
//! Parsing is not done here; trees are built by the generator or by hand.

pub mod ast;
pub mod display;
pub mod ops;
pub mod types;

pub use ast::{
    AddressOf, ArrayIndex, Base, BinaryExpr, CastExpr, Dereference, DoubleConstant, Expr,
    IntLength, IntegerConstant, MemberOf, MemberOfPtr, Signedness, TernaryExpr, UnaryExpr,
    VariableDecl, VariableExpr,
};
pub use ops::{BinOp, BinOpMask, NUM_BIN_OPS, NUM_UN_OPS, OpMask, Operator, UnOp, UnOpMask};
pub use types::{CvQualifiers, QualifiedType, ScalarType, TypeDesc};
