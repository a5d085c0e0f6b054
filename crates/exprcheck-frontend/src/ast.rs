// ast.rs
//
// Expression tree shared by the generator, the printer and the interpreter.
// Every node owns its children; trees are acyclic by construction.

use crate::ops::{BinOp, UnOp};
use crate::types::QualifiedType;

/// Precedence of primary expressions (literals, names, parentheses).
pub const PRIMARY_PRECEDENCE: u8 = 0;
/// Precedence of postfix expressions (`a[i]`, `s.f`, `p->f`).
pub const POSTFIX_PRECEDENCE: u8 = 2;
/// Precedence of prefix unary expressions and C-style casts.
pub const UNARY_PRECEDENCE: u8 = 3;
/// Precedence of the conditional operator.
pub const TERNARY_PRECEDENCE: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Base {
    Bin,
    Hex,
    Oct,
    #[default]
    Dec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IntLength {
    #[default]
    Int,
    Long,
    LongLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Signedness {
    #[default]
    Signed,
    Unsigned,
}

/// Integer literal: value plus the base and suffix it is spelled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntegerConstant {
    pub value: u64,
    pub base: Base,
    pub length: IntLength,
    pub signedness: Signedness,
}

impl IntegerConstant {
    pub fn new(value: u64) -> Self {
        Self {
            value,
            base: Base::Dec,
            length: IntLength::Int,
            signedness: Signedness::Signed,
        }
    }

    pub fn with_suffix(mut self, length: IntLength, signedness: Signedness) -> Self {
        self.length = length;
        self.signedness = signedness;
        self
    }

    pub fn with_base(mut self, base: Base) -> Self {
        self.base = base;
        self
    }
}

/// Floating literal; `is_float` selects the `f` suffix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoubleConstant {
    pub value: f64,
    pub is_float: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableExpr {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnOp,
    pub operand: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddressOf {
    pub operand: Box<Expr>,
}

/// `*operand`
#[derive(Debug, Clone, PartialEq)]
pub struct Dereference {
    pub operand: Box<Expr>,
}

/// `base.field`
#[derive(Debug, Clone, PartialEq)]
pub struct MemberOf {
    pub base: Box<Expr>,
    pub field: String,
}

/// `base->field`
#[derive(Debug, Clone, PartialEq)]
pub struct MemberOfPtr {
    pub base: Box<Expr>,
    pub field: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayIndex {
    pub base: Box<Expr>,
    pub index: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TernaryExpr {
    pub cond: Box<Expr>,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

/// C-style cast `(type)expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct CastExpr {
    pub ty: QualifiedType,
    pub operand: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntegerConstant(IntegerConstant),
    DoubleConstant(DoubleConstant),
    BooleanConstant(bool),
    Variable(VariableExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    AddressOf(AddressOf),
    Dereference(Dereference),
    MemberOf(MemberOf),
    MemberOfPtr(MemberOfPtr),
    ArrayIndex(ArrayIndex),
    Ternary(TernaryExpr),
    Cast(CastExpr),
    Parenthesized(Box<Expr>),
}

impl Expr {
    pub fn int(value: u64) -> Expr {
        Expr::IntegerConstant(IntegerConstant::new(value))
    }

    pub fn double(value: f64) -> Expr {
        Expr::DoubleConstant(DoubleConstant {
            value,
            is_float: false,
        })
    }

    pub fn float(value: f64) -> Expr {
        Expr::DoubleConstant(DoubleConstant {
            value,
            is_float: true,
        })
    }

    pub fn var(name: impl Into<String>) -> Expr {
        Expr::Variable(VariableExpr { name: name.into() })
    }

    pub fn unary(op: UnOp, operand: Expr) -> Expr {
        Expr::Unary(UnaryExpr {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary(BinaryExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn address_of(operand: Expr) -> Expr {
        Expr::AddressOf(AddressOf {
            operand: Box::new(operand),
        })
    }

    pub fn deref(operand: Expr) -> Expr {
        Expr::Dereference(Dereference {
            operand: Box::new(operand),
        })
    }

    pub fn member_of(base: Expr, field: impl Into<String>) -> Expr {
        Expr::MemberOf(MemberOf {
            base: Box::new(base),
            field: field.into(),
        })
    }

    pub fn member_of_ptr(base: Expr, field: impl Into<String>) -> Expr {
        Expr::MemberOfPtr(MemberOfPtr {
            base: Box::new(base),
            field: field.into(),
        })
    }

    pub fn index(base: Expr, index: Expr) -> Expr {
        Expr::ArrayIndex(ArrayIndex {
            base: Box::new(base),
            index: Box::new(index),
        })
    }

    pub fn ternary(cond: Expr, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Ternary(TernaryExpr {
            cond: Box::new(cond),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn cast(ty: QualifiedType, operand: Expr) -> Expr {
        Expr::Cast(CastExpr {
            ty,
            operand: Box::new(operand),
        })
    }

    pub fn paren(inner: Expr) -> Expr {
        Expr::Parenthesized(Box::new(inner))
    }

    /// C++ precedence level of the outermost node; lower binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            Expr::IntegerConstant(_)
            | Expr::DoubleConstant(_)
            | Expr::BooleanConstant(_)
            | Expr::Variable(_)
            | Expr::Parenthesized(_) => PRIMARY_PRECEDENCE,
            Expr::MemberOf(_) | Expr::MemberOfPtr(_) | Expr::ArrayIndex(_) => POSTFIX_PRECEDENCE,
            Expr::Unary(_) | Expr::AddressOf(_) | Expr::Dereference(_) | Expr::Cast(_) => {
                UNARY_PRECEDENCE
            }
            Expr::Binary(bin) => bin.op.precedence(),
            Expr::Ternary(_) => TERNARY_PRECEDENCE,
        }
    }

    /// Strips any number of redundant parentheses.
    pub fn unparenthesized(&self) -> &Expr {
        let mut expr = self;
        while let Expr::Parenthesized(inner) = expr {
            expr = inner;
        }
        expr
    }

    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::IntegerConstant(_)
            | Expr::DoubleConstant(_)
            | Expr::BooleanConstant(_)
            | Expr::Variable(_) => Vec::new(),
            Expr::Unary(e) => vec![&*e.operand],
            Expr::Binary(e) => vec![&*e.lhs, &*e.rhs],
            Expr::AddressOf(e) => vec![&*e.operand],
            Expr::Dereference(e) => vec![&*e.operand],
            Expr::MemberOf(e) => vec![&*e.base],
            Expr::MemberOfPtr(e) => vec![&*e.base],
            Expr::ArrayIndex(e) => vec![&*e.base, &*e.index],
            Expr::Ternary(e) => vec![&*e.cond, &*e.lhs, &*e.rhs],
            Expr::Cast(e) => vec![&*e.operand],
            Expr::Parenthesized(e) => vec![&**e],
        }
    }

    /// Height of the tree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(Expr::depth)
            .max()
            .unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(Expr::node_count)
            .sum::<usize>()
    }
}

/// `type name;`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableDecl {
    pub ty: QualifiedType,
    pub name: String,
}
