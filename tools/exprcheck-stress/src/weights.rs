//! Expression and type kinds the generator chooses between, the per-kind
//! weight tables configured for them, and the per-depth weight snapshot the
//! RNG samples from.
//!
//! Both kind sets are closed and densely numbered so a snapshot is a pair of
//! fixed-length arrays indexed by kind.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A closed, densely numbered set of grammar productions.
pub trait Kind: Copy + Eq + fmt::Debug + 'static {
    /// Every kind, ordered by `index()`.
    const ALL: &'static [Self];

    fn index(self) -> usize;

    /// snake_case name used in profiles and logs.
    fn name(self) -> &'static str;

    /// Whether a node of this kind contains another node of the same family,
    /// so that picking it deepens the tree.
    fn is_recursive(self) -> bool;

    fn default_weight(self) -> WeightInfo;

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExprKind {
    IntegerConstant,
    DoubleConstant,
    VariableExpr,
    UnaryExpr,
    BinaryExpr,
    AddressOf,
    MemberOf,
    MemberOfPtr,
    ArrayIndex,
    TernaryExpr,
    BooleanConstant,
}

pub const NUM_EXPR_KINDS: usize = 11;

impl Kind for ExprKind {
    const ALL: &'static [Self] = &[
        ExprKind::IntegerConstant,
        ExprKind::DoubleConstant,
        ExprKind::VariableExpr,
        ExprKind::UnaryExpr,
        ExprKind::BinaryExpr,
        ExprKind::AddressOf,
        ExprKind::MemberOf,
        ExprKind::MemberOfPtr,
        ExprKind::ArrayIndex,
        ExprKind::TernaryExpr,
        ExprKind::BooleanConstant,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            ExprKind::IntegerConstant => "integer_constant",
            ExprKind::DoubleConstant => "double_constant",
            ExprKind::VariableExpr => "variable_expr",
            ExprKind::UnaryExpr => "unary_expr",
            ExprKind::BinaryExpr => "binary_expr",
            ExprKind::AddressOf => "address_of",
            ExprKind::MemberOf => "member_of",
            ExprKind::MemberOfPtr => "member_of_ptr",
            ExprKind::ArrayIndex => "array_index",
            ExprKind::TernaryExpr => "ternary_expr",
            ExprKind::BooleanConstant => "boolean_constant",
        }
    }

    fn is_recursive(self) -> bool {
        matches!(
            self,
            ExprKind::UnaryExpr
                | ExprKind::BinaryExpr
                | ExprKind::ArrayIndex
                | ExprKind::TernaryExpr
        )
    }

    /// Integers, the variable, and a unary/binary grammar that fades out
    /// with depth.
    fn default_weight(self) -> WeightInfo {
        match self {
            ExprKind::IntegerConstant | ExprKind::VariableExpr => WeightInfo::new(1.0, 0.0),
            ExprKind::UnaryExpr => WeightInfo::new(7.0, 0.4),
            ExprKind::BinaryExpr => WeightInfo::new(3.0, 0.4),
            _ => WeightInfo::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKind {
    ScalarType,
    TaggedType,
    PointerType,
    ReferenceType,
}

pub const NUM_TYPE_KINDS: usize = 4;

impl Kind for TypeKind {
    const ALL: &'static [Self] = &[
        TypeKind::ScalarType,
        TypeKind::TaggedType,
        TypeKind::PointerType,
        TypeKind::ReferenceType,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            TypeKind::ScalarType => "scalar_type",
            TypeKind::TaggedType => "tagged_type",
            TypeKind::PointerType => "pointer_type",
            TypeKind::ReferenceType => "reference_type",
        }
    }

    fn is_recursive(self) -> bool {
        matches!(self, TypeKind::PointerType | TypeKind::ReferenceType)
    }

    fn default_weight(self) -> WeightInfo {
        match self {
            TypeKind::ScalarType => WeightInfo::new(2.0, 0.0),
            TypeKind::TaggedType => WeightInfo::ZERO,
            TypeKind::PointerType => WeightInfo::new(1.0, 0.5),
            TypeKind::ReferenceType => WeightInfo::new(0.5, 0.5),
        }
    }
}

impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configured weight of one kind: where it starts at the root, and how
/// quickly it fades with depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightInfo {
    pub initial_weight: f64,
    /// In `0.0..=1.0`; the weight is multiplied by `1 - dampening_factor`
    /// once per level of depth.
    pub dampening_factor: f64,
}

impl WeightInfo {
    pub const ZERO: WeightInfo = WeightInfo {
        initial_weight: 0.0,
        dampening_factor: 0.0,
    };

    pub fn new(initial_weight: f64, dampening_factor: f64) -> Self {
        Self {
            initial_weight,
            dampening_factor,
        }
    }

    pub fn at_depth(self, depth: usize) -> f64 {
        effective_weight(depth, self.initial_weight, self.dampening_factor)
    }
}

/// `initial * (1 - dampening)^depth`
pub fn effective_weight(depth: usize, initial: f64, dampening: f64) -> f64 {
    let depth = i32::try_from(depth).unwrap_or(i32::MAX);
    initial * (1.0 - dampening).powi(depth)
}

/// One `WeightInfo` per kind.
///
/// Serialized as a map from kind name to weight. Kinds missing from a
/// deserialized map keep their default weight.
pub struct KindTable<K> {
    entries: Vec<WeightInfo>,
    _kind: PhantomData<K>,
}

impl<K: Kind> KindTable<K> {
    pub fn from_fn(mut f: impl FnMut(K) -> WeightInfo) -> Self {
        Self {
            entries: K::ALL.iter().map(|kind| f(*kind)).collect(),
            _kind: PhantomData,
        }
    }

    /// Every kind at zero weight.
    pub fn zeroed() -> Self {
        Self::from_fn(|_| WeightInfo::ZERO)
    }

    pub fn get(&self, kind: K) -> WeightInfo {
        self.entries[kind.index()]
    }

    pub fn set(&mut self, kind: K, info: WeightInfo) {
        self.entries[kind.index()] = info;
    }

    pub fn with(mut self, kind: K, info: WeightInfo) -> Self {
        self.set(kind, info);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, WeightInfo)> + '_ {
        K::ALL.iter().map(|kind| (*kind, self.get(*kind)))
    }

    /// Effective weight of every kind at `depth`. At or beyond `max_depth`
    /// recursive kinds drop to zero.
    fn fill_at(&self, depth: usize, max_depth: Option<usize>, out: &mut [f64]) {
        let capped = max_depth.is_some_and(|max| depth >= max);
        for (kind, info) in self.iter() {
            out[kind.index()] = if capped && kind.is_recursive() {
                0.0
            } else {
                info.at_depth(depth)
            };
        }
    }
}

impl<K: Kind> Default for KindTable<K> {
    fn default() -> Self {
        Self::from_fn(K::default_weight)
    }
}

impl<K> Clone for KindTable<K> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K> PartialEq for KindTable<K> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Kind> fmt::Debug for KindTable<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(kind, info)| (kind.name(), info)))
            .finish()
    }
}

impl<K: Kind> Serialize for KindTable<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let map: BTreeMap<&str, WeightInfo> =
            self.iter().map(|(kind, info)| (kind.name(), info)).collect();
        map.serialize(serializer)
    }
}

impl<'de, K: Kind> Deserialize<'de> for KindTable<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, WeightInfo>::deserialize(deserializer)?;
        let mut table = Self::default();
        for (name, info) in map {
            let kind = K::from_name(&name).ok_or_else(|| {
                let known: Vec<&str> = K::ALL.iter().map(|kind| kind.name()).collect();
                D::Error::custom(format!(
                    "unknown kind '{name}', expected one of: {}",
                    known.join(", ")
                ))
            })?;
            table.set(kind, info);
        }
        Ok(table)
    }
}

/// Weight snapshot for one recursion point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    expr: [f64; NUM_EXPR_KINDS],
    types: [f64; NUM_TYPE_KINDS],
}

impl Weights {
    pub fn zeroed() -> Self {
        Self {
            expr: [0.0; NUM_EXPR_KINDS],
            types: [0.0; NUM_TYPE_KINDS],
        }
    }

    /// Effective weights of both tables at `depth`.
    pub fn at_depth(
        expr_table: &KindTable<ExprKind>,
        type_table: &KindTable<TypeKind>,
        depth: usize,
        max_depth: Option<usize>,
    ) -> Self {
        let mut weights = Self::zeroed();
        expr_table.fill_at(depth, max_depth, &mut weights.expr);
        type_table.fill_at(depth, max_depth, &mut weights.types);
        weights
    }

    pub fn expr_weights(&self) -> &[f64; NUM_EXPR_KINDS] {
        &self.expr
    }

    pub fn type_weights(&self) -> &[f64; NUM_TYPE_KINDS] {
        &self.types
    }

    pub fn has_viable_expr_kind(&self) -> bool {
        self.expr.iter().any(|w| *w > 0.0)
    }

    pub fn has_viable_type_kind(&self) -> bool {
        self.types.iter().any(|w| *w > 0.0)
    }
}

impl Index<ExprKind> for Weights {
    type Output = f64;

    fn index(&self, kind: ExprKind) -> &f64 {
        &self.expr[kind.index()]
    }
}

impl IndexMut<ExprKind> for Weights {
    fn index_mut(&mut self, kind: ExprKind) -> &mut f64 {
        &mut self.expr[kind.index()]
    }
}

impl Index<TypeKind> for Weights {
    type Output = f64;

    fn index(&self, kind: TypeKind) -> &f64 {
        &self.types[kind.index()]
    }
}

impl IndexMut<TypeKind> for Weights {
    fn index_mut(&mut self, kind: TypeKind) -> &mut f64 {
        &mut self.types[kind.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_densely_numbered() {
        assert_eq!(ExprKind::ALL.len(), NUM_EXPR_KINDS);
        assert_eq!(TypeKind::ALL.len(), NUM_TYPE_KINDS);
        for (i, kind) in ExprKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
            assert_eq!(ExprKind::from_name(kind.name()), Some(*kind));
        }
        for (i, kind) in TypeKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn dampening_decays_geometrically() {
        assert_eq!(effective_weight(0, 7.0, 0.4), 7.0);
        assert!((effective_weight(1, 7.0, 0.4) - 4.2).abs() < 1e-12);
        assert!((effective_weight(2, 3.0, 0.5) - 0.75).abs() < 1e-12);
        assert_eq!(effective_weight(10, 1.0, 0.0), 1.0);
        assert_eq!(effective_weight(3, 2.0, 1.0), 0.0);
        assert!(effective_weight(usize::MAX, 1.0, 0.5) >= 0.0);
    }

    #[test]
    fn snapshot_applies_depth_and_cap() {
        let exprs = KindTable::<ExprKind>::default();
        let types = KindTable::<TypeKind>::default();

        let root = Weights::at_depth(&exprs, &types, 0, None);
        assert_eq!(root[ExprKind::UnaryExpr], 7.0);
        assert_eq!(root[ExprKind::BinaryExpr], 3.0);
        assert_eq!(root[ExprKind::IntegerConstant], 1.0);
        assert_eq!(root[ExprKind::DoubleConstant], 0.0);
        assert_eq!(root[TypeKind::ScalarType], 2.0);

        let deep = Weights::at_depth(&exprs, &types, 3, None);
        assert!(deep[ExprKind::UnaryExpr] < root[ExprKind::UnaryExpr]);
        assert_eq!(deep[ExprKind::VariableExpr], 1.0);

        let capped = Weights::at_depth(&exprs, &types, 3, Some(3));
        assert_eq!(capped[ExprKind::UnaryExpr], 0.0);
        assert_eq!(capped[ExprKind::BinaryExpr], 0.0);
        assert_eq!(capped[TypeKind::PointerType], 0.0);
        assert_eq!(capped[ExprKind::IntegerConstant], 1.0);
        assert!(capped.has_viable_expr_kind());
    }

    #[test]
    fn partial_tables_keep_defaults() {
        #[derive(Deserialize)]
        struct Wrapper {
            weights: KindTable<ExprKind>,
        }
        let wrapper: Wrapper = toml::from_str(
            "[weights]\nternary_expr = { initial_weight = 2.0, dampening_factor = 0.5 }\n",
        )
        .unwrap();
        assert_eq!(wrapper.weights.get(ExprKind::TernaryExpr), WeightInfo::new(2.0, 0.5));
        assert_eq!(wrapper.weights.get(ExprKind::UnaryExpr), WeightInfo::new(7.0, 0.4));

        let err = toml::from_str::<Wrapper>(
            "[weights]\nlambda = { initial_weight = 1.0, dampening_factor = 0.0 }\n",
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("unknown kind 'lambda'"));
    }
}
