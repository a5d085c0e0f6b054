//! Randomness for the generator.
//!
//! Every random decision the generator makes goes through `GeneratorRng`, so
//! a run is a pure function of the RNG's state and the configuration. The
//! seeded `DefaultGeneratorRng` drives normal runs; `RecordingRng` captures
//! a run's decisions and `ScriptedRng` replays (possibly shrunk) decision
//! sequences.

use std::collections::VecDeque;

use exprcheck_frontend::{BinOp, BinOpMask, CvQualifiers, OpMask, Operator, UnOp, UnOpMask};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::weights::{ExprKind, Kind, TypeKind, Weights};

pub trait GeneratorRng {
    /// An operator enabled in `mask`, or `None` when the mask is empty.
    fn gen_bin_op(&mut self, mask: BinOpMask) -> Option<BinOp>;
    fn gen_un_op(&mut self, mask: UnOpMask) -> Option<UnOp>;

    /// A kind drawn in proportion to its weight, or `None` when every
    /// weight is zero.
    fn gen_expr_kind(&mut self, weights: &Weights) -> Option<ExprKind>;
    fn gen_type_kind(&mut self, weights: &Weights) -> Option<TypeKind>;

    /// Uniform in `[min, max]`.
    fn gen_u64(&mut self, min: u64, max: u64) -> u64;

    /// Uniform in `[min, max)`.
    fn gen_double(&mut self, min: f64, max: f64) -> f64;

    /// `true` with `probability`.
    fn gen_bool(&mut self, probability: f64) -> bool;

    fn gen_cv_qualifiers(&mut self, const_prob: f64, volatile_prob: f64) -> CvQualifiers;
}

impl<R: GeneratorRng + ?Sized> GeneratorRng for &mut R {
    fn gen_bin_op(&mut self, mask: BinOpMask) -> Option<BinOp> {
        (**self).gen_bin_op(mask)
    }

    fn gen_un_op(&mut self, mask: UnOpMask) -> Option<UnOp> {
        (**self).gen_un_op(mask)
    }

    fn gen_expr_kind(&mut self, weights: &Weights) -> Option<ExprKind> {
        (**self).gen_expr_kind(weights)
    }

    fn gen_type_kind(&mut self, weights: &Weights) -> Option<TypeKind> {
        (**self).gen_type_kind(weights)
    }

    fn gen_u64(&mut self, min: u64, max: u64) -> u64 {
        (**self).gen_u64(min, max)
    }

    fn gen_double(&mut self, min: f64, max: f64) -> f64 {
        (**self).gen_double(min, max)
    }

    fn gen_bool(&mut self, probability: f64) -> bool {
        (**self).gen_bool(probability)
    }

    fn gen_cv_qualifiers(&mut self, const_prob: f64, volatile_prob: f64) -> CvQualifiers {
        (**self).gen_cv_qualifiers(const_prob, volatile_prob)
    }
}

impl<R: GeneratorRng + ?Sized> GeneratorRng for Box<R> {
    fn gen_bin_op(&mut self, mask: BinOpMask) -> Option<BinOp> {
        (**self).gen_bin_op(mask)
    }

    fn gen_un_op(&mut self, mask: UnOpMask) -> Option<UnOp> {
        (**self).gen_un_op(mask)
    }

    fn gen_expr_kind(&mut self, weights: &Weights) -> Option<ExprKind> {
        (**self).gen_expr_kind(weights)
    }

    fn gen_type_kind(&mut self, weights: &Weights) -> Option<TypeKind> {
        (**self).gen_type_kind(weights)
    }

    fn gen_u64(&mut self, min: u64, max: u64) -> u64 {
        (**self).gen_u64(min, max)
    }

    fn gen_double(&mut self, min: f64, max: f64) -> f64 {
        (**self).gen_double(min, max)
    }

    fn gen_bool(&mut self, probability: f64) -> bool {
        (**self).gen_bool(probability)
    }

    fn gen_cv_qualifiers(&mut self, const_prob: f64, volatile_prob: f64) -> CvQualifiers {
        (**self).gen_cv_qualifiers(const_prob, volatile_prob)
    }
}

/// `GeneratorRng` over a seeded `StdRng`.
#[derive(Debug, Clone)]
pub struct DefaultGeneratorRng {
    rng: StdRng,
}

impl DefaultGeneratorRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn pick_op<T: Operator>(&mut self, mask: OpMask<T>) -> Option<T> {
        let ops: Vec<T> = mask.iter().collect();
        ops.choose(&mut self.rng).copied()
    }

    fn pick_weighted<K: Kind>(&mut self, weights: &[f64]) -> Option<K> {
        let dist = WeightedIndex::new(weights).ok()?;
        K::ALL.get(dist.sample(&mut self.rng)).copied()
    }
}

impl GeneratorRng for DefaultGeneratorRng {
    fn gen_bin_op(&mut self, mask: BinOpMask) -> Option<BinOp> {
        self.pick_op(mask)
    }

    fn gen_un_op(&mut self, mask: UnOpMask) -> Option<UnOp> {
        self.pick_op(mask)
    }

    fn gen_expr_kind(&mut self, weights: &Weights) -> Option<ExprKind> {
        self.pick_weighted(weights.expr_weights())
    }

    fn gen_type_kind(&mut self, weights: &Weights) -> Option<TypeKind> {
        self.pick_weighted(weights.type_weights())
    }

    fn gen_u64(&mut self, min: u64, max: u64) -> u64 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    fn gen_double(&mut self, min: f64, max: f64) -> f64 {
        if !(min < max) {
            return min;
        }
        if !(max - min).is_finite() {
            // Interpolate so neither term overflows.
            let t: f64 = self.rng.r#gen();
            return (min * (1.0 - t) + max * t).clamp(min, max);
        }
        self.rng.gen_range(min..max)
    }

    fn gen_bool(&mut self, probability: f64) -> bool {
        if !(probability > 0.0) {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.rng.gen_bool(probability)
    }

    fn gen_cv_qualifiers(&mut self, const_prob: f64, volatile_prob: f64) -> CvQualifiers {
        let is_const = self.gen_bool(const_prob);
        let is_volatile = self.gen_bool(volatile_prob);
        CvQualifiers::new(is_const, is_volatile)
    }
}

/// One decision made through `GeneratorRng`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Choice {
    BinOp(BinOp),
    UnOp(UnOp),
    ExprKind(ExprKind),
    TypeKind(TypeKind),
    U64(u64),
    Double(f64),
    Bool(bool),
    Cv(CvQualifiers),
}

/// Wraps an RNG and records every decision it makes.
#[derive(Debug, Clone)]
pub struct RecordingRng<R> {
    inner: R,
    choices: Vec<Choice>,
}

impl<R: GeneratorRng> RecordingRng<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            choices: Vec::new(),
        }
    }

    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    /// Takes the decisions recorded so far, leaving the log empty.
    pub fn take_choices(&mut self) -> Vec<Choice> {
        std::mem::take(&mut self.choices)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn record<T>(&mut self, value: T, choice: impl FnOnce(T) -> Choice) -> T
    where
        T: Copy,
    {
        self.choices.push(choice(value));
        value
    }
}

impl<R: GeneratorRng> GeneratorRng for RecordingRng<R> {
    fn gen_bin_op(&mut self, mask: BinOpMask) -> Option<BinOp> {
        let op = self.inner.gen_bin_op(mask)?;
        Some(self.record(op, Choice::BinOp))
    }

    fn gen_un_op(&mut self, mask: UnOpMask) -> Option<UnOp> {
        let op = self.inner.gen_un_op(mask)?;
        Some(self.record(op, Choice::UnOp))
    }

    fn gen_expr_kind(&mut self, weights: &Weights) -> Option<ExprKind> {
        let kind = self.inner.gen_expr_kind(weights)?;
        Some(self.record(kind, Choice::ExprKind))
    }

    fn gen_type_kind(&mut self, weights: &Weights) -> Option<TypeKind> {
        let kind = self.inner.gen_type_kind(weights)?;
        Some(self.record(kind, Choice::TypeKind))
    }

    fn gen_u64(&mut self, min: u64, max: u64) -> u64 {
        let value = self.inner.gen_u64(min, max);
        self.record(value, Choice::U64)
    }

    fn gen_double(&mut self, min: f64, max: f64) -> f64 {
        let value = self.inner.gen_double(min, max);
        self.record(value, Choice::Double)
    }

    fn gen_bool(&mut self, probability: f64) -> bool {
        let value = self.inner.gen_bool(probability);
        self.record(value, Choice::Bool)
    }

    fn gen_cv_qualifiers(&mut self, const_prob: f64, volatile_prob: f64) -> CvQualifiers {
        let cv = self.inner.gen_cv_qualifiers(const_prob, volatile_prob);
        self.record(cv, Choice::Cv)
    }
}

/// Replays a fixed sequence of decisions.
///
/// A scripted decision is used only if it is valid for the request (an
/// enabled operator, a kind with positive weight, a value in range).
/// Otherwise, and once the script runs out, the simplest valid answer is
/// given: the first enabled operator, the first terminal kind with positive
/// weight, the lower bound of a range, `false`, no qualifiers. Shrinking a
/// recorded script therefore always yields a smaller, finite expression.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRng {
    script: VecDeque<Choice>,
    mismatches: usize,
}

impl ScriptedRng {
    pub fn new(script: impl IntoIterator<Item = Choice>) -> Self {
        Self {
            script: script.into_iter().collect(),
            mismatches: 0,
        }
    }

    /// Decisions not consumed yet.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Scripted decisions that did not fit the request they were consumed by.
    pub fn mismatches(&self) -> usize {
        self.mismatches
    }

    fn next_matching<T>(&mut self, accept: impl FnOnce(Choice) -> Option<T>) -> Option<T> {
        let choice = self.script.pop_front()?;
        let accepted = accept(choice);
        if accepted.is_none() {
            tracing::trace!(?choice, "scripted choice does not fit, using fallback");
            self.mismatches += 1;
        }
        accepted
    }

    fn simplest_kind<K: Kind>(weights: &[f64]) -> Option<K> {
        let viable = |kind: &K| weights.get(kind.index()).is_some_and(|w| *w > 0.0);
        K::ALL
            .iter()
            .copied()
            .filter(viable)
            .find(|kind| !kind.is_recursive())
            .or_else(|| K::ALL.iter().copied().find(viable))
    }
}

fn weight_of<K: Kind>(weights: &[f64], kind: K) -> f64 {
    weights.get(kind.index()).copied().unwrap_or(0.0)
}

impl GeneratorRng for ScriptedRng {
    fn gen_bin_op(&mut self, mask: BinOpMask) -> Option<BinOp> {
        self.next_matching(|c| match c {
            Choice::BinOp(op) if mask.contains(op) => Some(op),
            _ => None,
        })
        .or_else(|| mask.iter().next())
    }

    fn gen_un_op(&mut self, mask: UnOpMask) -> Option<UnOp> {
        self.next_matching(|c| match c {
            Choice::UnOp(op) if mask.contains(op) => Some(op),
            _ => None,
        })
        .or_else(|| mask.iter().next())
    }

    fn gen_expr_kind(&mut self, weights: &Weights) -> Option<ExprKind> {
        let table = weights.expr_weights();
        self.next_matching(|c| match c {
            Choice::ExprKind(kind) if weight_of(table, kind) > 0.0 => Some(kind),
            _ => None,
        })
        .or_else(|| Self::simplest_kind(table))
    }

    fn gen_type_kind(&mut self, weights: &Weights) -> Option<TypeKind> {
        let table = weights.type_weights();
        self.next_matching(|c| match c {
            Choice::TypeKind(kind) if weight_of(table, kind) > 0.0 => Some(kind),
            _ => None,
        })
        .or_else(|| Self::simplest_kind(table))
    }

    fn gen_u64(&mut self, min: u64, max: u64) -> u64 {
        self.next_matching(|c| match c {
            Choice::U64(v) if (min..=max).contains(&v) => Some(v),
            _ => None,
        })
        .unwrap_or(min)
    }

    fn gen_double(&mut self, min: f64, max: f64) -> f64 {
        self.next_matching(|c| match c {
            Choice::Double(v) if v >= min && (v < max || v == min) => Some(v),
            _ => None,
        })
        .unwrap_or(min)
    }

    fn gen_bool(&mut self, _probability: f64) -> bool {
        self.next_matching(|c| match c {
            Choice::Bool(b) => Some(b),
            _ => None,
        })
        .unwrap_or(false)
    }

    fn gen_cv_qualifiers(&mut self, _const_prob: f64, _volatile_prob: f64) -> CvQualifiers {
        self.next_matching(|c| match c {
            Choice::Cv(cv) => Some(cv),
            _ => None,
        })
        .unwrap_or(CvQualifiers::NONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::{KindTable, WeightInfo};

    fn weights(table: KindTable<ExprKind>) -> Weights {
        Weights::at_depth(&table, &KindTable::default(), 0, None)
    }

    #[test]
    fn default_rng_respects_masks() {
        let mut rng = DefaultGeneratorRng::new(7);
        let mask: BinOpMask = [BinOp::Shl, BinOp::Shr].into_iter().collect();
        for _ in 0..200 {
            let op = rng.gen_bin_op(mask).unwrap();
            assert!(op.is_shift());
        }
        assert_eq!(rng.gen_un_op(UnOpMask::none()), None);
    }

    #[test]
    fn default_rng_never_picks_zero_weights() {
        let mut rng = DefaultGeneratorRng::new(11);
        let w = weights(
            KindTable::zeroed()
                .with(ExprKind::VariableExpr, WeightInfo::new(1.0, 0.0))
                .with(ExprKind::TernaryExpr, WeightInfo::new(3.0, 0.0)),
        );
        let mut seen_ternary = false;
        for _ in 0..500 {
            let kind = rng.gen_expr_kind(&w).unwrap();
            assert!(matches!(kind, ExprKind::VariableExpr | ExprKind::TernaryExpr));
            seen_ternary |= kind == ExprKind::TernaryExpr;
        }
        assert!(seen_ternary);
        assert_eq!(rng.gen_expr_kind(&Weights::zeroed()), None);
    }

    #[test]
    fn default_rng_ranges() {
        let mut rng = DefaultGeneratorRng::new(3);
        for _ in 0..500 {
            let v = rng.gen_u64(5, 9);
            assert!((5..=9).contains(&v));
            let d = rng.gen_double(-1.0, 1.0);
            assert!((-1.0..1.0).contains(&d));
        }
        assert_eq!(rng.gen_u64(4, 4), 4);
        assert_eq!(rng.gen_double(2.0, 2.0), 2.0);
        for _ in 0..100 {
            let d = rng.gen_double(-1e308, 1e308);
            assert!(d.is_finite() && (-1e308..=1e308).contains(&d));
        }
        assert!(!rng.gen_bool(0.0));
        assert!(rng.gen_bool(1.0));
        assert_eq!(rng.gen_cv_qualifiers(0.0, 0.0), CvQualifiers::NONE);
        assert_eq!(rng.gen_cv_qualifiers(1.0, 1.0), CvQualifiers::new(true, true));
    }

    #[test]
    fn same_seed_same_decisions() {
        let mut a = DefaultGeneratorRng::new(99);
        let mut b = DefaultGeneratorRng::new(99);
        let w = weights(KindTable::default());
        for _ in 0..100 {
            assert_eq!(a.gen_expr_kind(&w), b.gen_expr_kind(&w));
            assert_eq!(a.gen_u64(0, 1000), b.gen_u64(0, 1000));
            assert_eq!(a.gen_bin_op(BinOpMask::all()), b.gen_bin_op(BinOpMask::all()));
        }
    }

    #[test]
    fn recording_then_replaying_matches() {
        let mut recording = RecordingRng::new(DefaultGeneratorRng::new(5));
        let w = weights(KindTable::default());
        let original: Vec<_> = (0..20)
            .map(|_| {
                (
                    recording.gen_expr_kind(&w),
                    recording.gen_u64(0, 50),
                    recording.gen_bool(0.5),
                )
            })
            .collect();
        assert_eq!(recording.choices().len(), 60);

        let mut replay = ScriptedRng::new(recording.take_choices());
        let replayed: Vec<_> = (0..20)
            .map(|_| (replay.gen_expr_kind(&w), replay.gen_u64(0, 50), replay.gen_bool(0.5)))
            .collect();
        assert_eq!(replayed, original);
        assert_eq!(replay.remaining(), 0);
        assert_eq!(replay.mismatches(), 0);
    }

    #[test]
    fn scripted_rng_falls_back_to_simplest() {
        let w = weights(KindTable::default());
        let mut rng = ScriptedRng::new([
            Choice::ExprKind(ExprKind::DoubleConstant), // zero weight
            Choice::U64(5000),                          // out of range
            Choice::BinOp(BinOp::Mul),
        ]);
        assert_eq!(rng.gen_expr_kind(&w), Some(ExprKind::IntegerConstant));
        assert_eq!(rng.gen_u64(0, 1000), 0);
        let mask: BinOpMask = [BinOp::Plus].into_iter().collect();
        assert_eq!(rng.gen_bin_op(mask), Some(BinOp::Plus));
        assert_eq!(rng.mismatches(), 3);

        // Exhausted.
        assert_eq!(rng.gen_expr_kind(&w), Some(ExprKind::IntegerConstant));
        assert!(!rng.gen_bool(1.0));
        assert_eq!(rng.mismatches(), 3);
    }

    #[test]
    fn scripted_rng_prefers_terminal_kinds() {
        let w = weights(
            KindTable::zeroed()
                .with(ExprKind::UnaryExpr, WeightInfo::new(1.0, 0.0))
                .with(ExprKind::VariableExpr, WeightInfo::new(1.0, 0.0)),
        );
        assert_eq!(ScriptedRng::default().gen_expr_kind(&w), Some(ExprKind::VariableExpr));
    }
}
