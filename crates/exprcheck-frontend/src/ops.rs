// ops.rs
//
// Unary and binary operators, their C++ spelling and precedence, and the
// bitmask type used to restrict which operators a generator may pick.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A closed, densely numbered operator set.
pub trait Operator: Copy + Eq + fmt::Debug + 'static {
    /// Every operator, ordered by `index()`.
    const ALL: &'static [Self];

    /// Dense index in `0..ALL.len()`.
    fn index(self) -> usize;

    fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BinOp {
    Mul,
    Div,
    Mod,
    Plus,
    Minus,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    LogicalAnd,
    LogicalOr,
}

pub const NUM_BIN_OPS: usize = 18;

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Plus => "+",
            BinOp::Minus => "-",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::BitAnd => "&",
            BinOp::BitXor => "^",
            BinOp::BitOr => "|",
            BinOp::LogicalAnd => "&&",
            BinOp::LogicalOr => "||",
        }
    }

    /// C++ precedence level; lower binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Mul | BinOp::Div | BinOp::Mod => 5,
            BinOp::Plus | BinOp::Minus => 6,
            BinOp::Shl | BinOp::Shr => 7,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 9,
            BinOp::Eq | BinOp::Ne => 10,
            BinOp::BitAnd => 11,
            BinOp::BitXor => 12,
            BinOp::BitOr => 13,
            BinOp::LogicalAnd => 14,
            BinOp::LogicalOr => 15,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::Eq | BinOp::Ne
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::LogicalAnd | BinOp::LogicalOr)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinOp::Shl | BinOp::Shr)
    }
}

impl Operator for BinOp {
    const ALL: &'static [Self] = &[
        BinOp::Mul,
        BinOp::Div,
        BinOp::Mod,
        BinOp::Plus,
        BinOp::Minus,
        BinOp::Shl,
        BinOp::Shr,
        BinOp::Lt,
        BinOp::Le,
        BinOp::Gt,
        BinOp::Ge,
        BinOp::Eq,
        BinOp::Ne,
        BinOp::BitAnd,
        BinOp::BitXor,
        BinOp::BitOr,
        BinOp::LogicalAnd,
        BinOp::LogicalOr,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnOp {
    Plus,
    Neg,
    LogicalNot,
    BitNot,
}

pub const NUM_UN_OPS: usize = 4;

impl UnOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Plus => "+",
            UnOp::Neg => "-",
            UnOp::LogicalNot => "!",
            UnOp::BitNot => "~",
        }
    }
}

impl Operator for UnOp {
    const ALL: &'static [Self] = &[UnOp::Plus, UnOp::Neg, UnOp::LogicalNot, UnOp::BitNot];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Set of enabled operators, one bit per `Operator::index()`.
///
/// Serialized as a list of operator names so profiles stay readable.
pub struct OpMask<T> {
    bits: u64,
    _marker: PhantomData<T>,
}

pub type BinOpMask = OpMask<BinOp>;
pub type UnOpMask = OpMask<UnOp>;

impl<T: Operator> OpMask<T> {
    pub fn all() -> Self {
        T::ALL.iter().copied().collect()
    }

    pub fn none() -> Self {
        Self::from_bits(0)
    }

    /// Bits outside the operator range are dropped.
    pub fn from_bits(bits: u64) -> Self {
        let valid = if T::ALL.len() >= 64 {
            u64::MAX
        } else {
            (1u64 << T::ALL.len()) - 1
        };
        Self {
            bits: bits & valid,
            _marker: PhantomData,
        }
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }

    pub fn contains(&self, op: T) -> bool {
        self.bits & (1 << op.index()) != 0
    }

    pub fn insert(&mut self, op: T) {
        self.bits |= 1 << op.index();
    }

    pub fn remove(&mut self, op: T) {
        self.bits &= !(1 << op.index());
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Enabled operators in index order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        T::ALL.iter().copied().filter(|op| self.contains(*op))
    }
}

impl<T: Operator> Default for OpMask<T> {
    fn default() -> Self {
        Self::all()
    }
}

impl<T: Operator> FromIterator<T> for OpMask<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut mask = Self::from_bits(0);
        for op in iter {
            mask.insert(op);
        }
        mask
    }
}

// Manual impls: derives would put bounds on `T` that `PhantomData` doesn't need.
impl<T> Clone for OpMask<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for OpMask<T> {}

impl<T> PartialEq for OpMask<T> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<T> Eq for OpMask<T> {}

impl<T: Operator> fmt::Debug for OpMask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Operator + Serialize> Serialize for OpMask<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, T: Operator + Deserialize<'de>> Deserialize<'de> for OpMask<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ops = Vec::<T>::deserialize(deserializer)?;
        Ok(ops.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_indices_are_dense() {
        for (i, op) in BinOp::ALL.iter().enumerate() {
            assert_eq!(op.index(), i);
        }
        for (i, op) in UnOp::ALL.iter().enumerate() {
            assert_eq!(op.index(), i);
        }
        assert_eq!(BinOp::ALL.len(), NUM_BIN_OPS);
        assert_eq!(UnOp::ALL.len(), NUM_UN_OPS);
    }

    #[test]
    fn mask_from_bits_drops_out_of_range() {
        let mask = UnOpMask::from_bits(u64::MAX);
        assert_eq!(mask.len(), NUM_UN_OPS);
        assert_eq!(mask, UnOpMask::all());
    }

    #[test]
    fn mask_insert_remove() {
        let mut mask = BinOpMask::none();
        assert!(mask.is_empty());
        mask.insert(BinOp::Shl);
        mask.insert(BinOp::Div);
        assert!(mask.contains(BinOp::Shl));
        assert!(!mask.contains(BinOp::Shr));
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![BinOp::Div, BinOp::Shl]);
        mask.remove(BinOp::Div);
        assert_eq!(mask.len(), 1);
    }

    #[test]
    fn multiplicative_binds_tighter_than_additive() {
        assert!(BinOp::Mul.precedence() < BinOp::Plus.precedence());
        assert!(BinOp::Shl.precedence() < BinOp::Lt.precedence());
        assert!(BinOp::LogicalAnd.precedence() < BinOp::LogicalOr.precedence());
    }
}
