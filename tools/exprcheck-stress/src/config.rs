//! Generation policy.
//!
//! A `GenConfig` is set once before generation and shared read-only by a
//! run. TOML profiles only list the fields that differ from `Default`.

use exprcheck_frontend::{BinOpMask, UnOpMask};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::weights::{ExprKind, Kind, KindTable, TypeKind, Weights};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenConfig {
    /// Expressions per run of the CLI.
    pub num_exprs_to_generate: usize,

    /// Inclusive range of integer constants.
    pub int_const_min: u64,
    pub int_const_max: u64,

    /// Half-open range of double constants.
    pub double_constant_min: f64,
    pub double_constant_max: f64,

    /// Chance of wrapping any generated sub-expression in parentheses.
    pub parenthesize_prob: f64,

    /// Chances of qualifying a generated type with `const` and `volatile`.
    pub const_prob: f64,
    pub volatile_prob: f64,

    pub bin_op_mask: BinOpMask,
    pub un_op_mask: UnOpMask,

    pub expr_kind_weights: KindTable<ExprKind>,
    pub type_kind_weights: KindTable<TypeKind>,

    /// Depth at which recursive kinds are no longer chosen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,

    /// Names the terminal productions refer to.
    pub var_name: String,
    pub array_name: String,
    pub struct_name: String,
    pub struct_ptr_name: String,
    pub field_names: Vec<String>,
    pub tagged_types: Vec<String>,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            num_exprs_to_generate: 20,
            int_const_min: 0,
            int_const_max: 1000,
            double_constant_min: 0.0,
            double_constant_max: 10.0,
            parenthesize_prob: 0.2,
            const_prob: 0.3,
            volatile_prob: 0.05,
            bin_op_mask: BinOpMask::all(),
            un_op_mask: UnOpMask::all(),
            expr_kind_weights: KindTable::default(),
            type_kind_weights: KindTable::default(),
            max_depth: None,
            var_name: "x".to_string(),
            array_name: "arr".to_string(),
            struct_name: "s".to_string(),
            struct_ptr_name: "sp".to_string(),
            field_names: vec!["f".to_string()],
            tagged_types: Vec::new(),
        }
    }
}

impl GenConfig {
    /// Weight snapshot for a recursion point at `depth`.
    pub fn weights_at(&self, depth: usize) -> Weights {
        Weights::at_depth(
            &self.expr_kind_weights,
            &self.type_kind_weights,
            depth,
            self.max_depth,
        )
    }

    pub fn expr_weight(&self, kind: ExprKind) -> f64 {
        self.expr_kind_weights.get(kind).initial_weight
    }

    pub fn type_weight(&self, kind: TypeKind) -> f64 {
        self.type_kind_weights.get(kind).initial_weight
    }

    /// Recursive expression kinds that never fade and are not capped by
    /// `max_depth`.
    pub fn undamped_recursive_kinds(&self) -> Vec<ExprKind> {
        if self.max_depth.is_some() {
            return Vec::new();
        }
        self.expr_kind_weights
            .iter()
            .filter(|(kind, info)| {
                kind.is_recursive() && info.initial_weight > 0.0 && info.dampening_factor == 0.0
            })
            .map(|(kind, _)| kind)
            .collect()
    }

    /// Rejects configurations under which some required node has no viable
    /// choice.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.int_const_min > self.int_const_max {
            return Err(ConfigError::InvalidIntRange {
                min: self.int_const_min,
                max: self.int_const_max,
            });
        }
        let (dmin, dmax) = (self.double_constant_min, self.double_constant_max);
        // Sampling scales by `max - min`, so the width must be finite too.
        let width = dmax - dmin;
        if !dmin.is_finite() || !dmax.is_finite() || dmin > dmax || !width.is_finite() {
            return Err(ConfigError::InvalidDoubleRange {
                min: dmin,
                max: dmax,
            });
        }
        for (name, value) in [
            ("parenthesize_prob", self.parenthesize_prob),
            ("const_prob", self.const_prob),
            ("volatile_prob", self.volatile_prob),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }
        validate_table(&self.expr_kind_weights)?;
        validate_table(&self.type_kind_weights)?;

        let terminal = ExprKind::ALL
            .iter()
            .any(|kind| !kind.is_recursive() && self.expr_weight(*kind) > 0.0);
        if !terminal {
            return Err(ConfigError::NoTerminalExprKind);
        }
        if self.expr_weight(ExprKind::UnaryExpr) > 0.0 && self.un_op_mask.is_empty() {
            return Err(ConfigError::EmptyOperatorMask {
                kind: ExprKind::UnaryExpr.name(),
            });
        }
        if self.expr_weight(ExprKind::BinaryExpr) > 0.0 && self.bin_op_mask.is_empty() {
            return Err(ConfigError::EmptyOperatorMask {
                kind: ExprKind::BinaryExpr.name(),
            });
        }
        for kind in [ExprKind::MemberOf, ExprKind::MemberOfPtr] {
            if self.expr_weight(kind) > 0.0 && self.field_names.is_empty() {
                return Err(ConfigError::MissingNames {
                    kind: kind.name(),
                    what: "field names",
                });
            }
        }

        let any_type = TypeKind::ALL.iter().any(|kind| self.type_weight(*kind) > 0.0);
        let terminal_type = self.type_weight(TypeKind::ScalarType) > 0.0
            || self.type_weight(TypeKind::TaggedType) > 0.0;
        if any_type && !terminal_type {
            return Err(ConfigError::NoTerminalTypeKind);
        }
        if self.type_weight(TypeKind::TaggedType) > 0.0 && self.tagged_types.is_empty() {
            return Err(ConfigError::MissingNames {
                kind: TypeKind::TaggedType.name(),
                what: "tagged types",
            });
        }
        Ok(())
    }
}

fn validate_table<K: Kind>(table: &KindTable<K>) -> Result<(), ConfigError> {
    for (kind, info) in table.iter() {
        if !info.initial_weight.is_finite() || info.initial_weight < 0.0 {
            return Err(ConfigError::InvalidWeight {
                kind: kind.name(),
                value: info.initial_weight,
            });
        }
        if !(0.0..=1.0).contains(&info.dampening_factor) {
            return Err(ConfigError::InvalidDampening {
                kind: kind.name(),
                value: info.dampening_factor,
            });
        }
    }
    Ok(())
}
