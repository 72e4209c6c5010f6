//! C1: the numerical abstract domain — an integer-interval lattice plus a
//! set of linear equality/inequality constraints over `ZVariable`s (a
//! conjured or region-symbol value viewed as a numerical variable, per
//! the `get_as_zvariable` projection).

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Add;

use crate::ids::SymbolId;

/// A symbol viewed as a numerical variable in the linear-arithmetic domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZVariable(pub SymbolId);

/// A constant in the linear-arithmetic domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZNum(pub i128);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    NegInf,
    Value(i128),
    PosInf,
}

impl Bound {
    fn min(self, other: Bound) -> Bound {
        if self.le(other) { self } else { other }
    }

    fn max(self, other: Bound) -> Bound {
        if self.ge(other) { self } else { other }
    }

    fn le(self, other: Bound) -> bool {
        matches!(self.partial_cmp(&other), Some(Ordering::Less | Ordering::Equal))
    }

    fn ge(self, other: Bound) -> bool {
        matches!(self.partial_cmp(&other), Some(Ordering::Greater | Ordering::Equal))
    }
}

impl PartialOrd for Bound {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use Bound::*;
        Some(match (self, other) {
            (NegInf, NegInf) | (PosInf, PosInf) => Ordering::Equal,
            (NegInf, _) => Ordering::Less,
            (_, NegInf) => Ordering::Greater,
            (PosInf, _) => Ordering::Greater,
            (_, PosInf) => Ordering::Less,
            (Value(a), Value(b)) => a.cmp(b),
        })
    }
}

/// A closed interval `[lo, hi]`; `lo > hi` denotes the empty (bottom)
/// interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub lo: Bound,
    pub hi: Bound,
}

impl Interval {
    pub const TOP: Interval = Interval {
        lo: Bound::NegInf,
        hi: Bound::PosInf,
    };

    pub fn singleton(v: i128) -> Self {
        Interval {
            lo: Bound::Value(v),
            hi: Bound::Value(v),
        }
    }

    pub fn at_least(v: i128) -> Self {
        Interval {
            lo: Bound::Value(v),
            hi: Bound::PosInf,
        }
    }

    pub fn at_most(v: i128) -> Self {
        Interval {
            lo: Bound::NegInf,
            hi: Bound::Value(v),
        }
    }

    pub fn bottom() -> Self {
        Interval {
            lo: Bound::Value(1),
            hi: Bound::Value(0),
        }
    }

    pub fn is_bottom(&self) -> bool {
        matches!((self.lo, self.hi), (Bound::Value(l), Bound::Value(h)) if l > h)
    }

    pub fn leq(&self, other: &Interval) -> bool {
        if self.is_bottom() {
            return true;
        }
        other.lo.le(self.lo) && self.hi.le(other.hi)
    }

    pub fn join(&self, other: &Interval) -> Interval {
        if self.is_bottom() {
            return *other;
        }
        if other.is_bottom() {
            return *self;
        }
        Interval {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }

    pub fn meet(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        Interval {
            lo: self.lo.max(other.lo),
            hi: self.hi.min(other.hi),
        }
    }

    /// Standard interval widening: a bound that moved outward snaps to
    /// infinity, unless `thresholds` offers a tighter sound bound to snap
    /// to instead.
    pub fn widen(&self, next: &Interval, thresholds: &[i128]) -> Interval {
        if self.is_bottom() {
            return *next;
        }
        if next.is_bottom() {
            return *self;
        }
        let lo = if next.lo.ge(self.lo) {
            self.lo
        } else {
            thresholds
                .iter()
                .filter(|&&t| Bound::Value(t).le(next.lo))
                .map(|&t| Bound::Value(t))
                .fold(Bound::NegInf, |acc, b| acc.max(b))
        };
        let hi = if next.hi.le(self.hi) {
            self.hi
        } else {
            thresholds
                .iter()
                .filter(|&&t| next.hi.le(Bound::Value(t)))
                .map(|&t| Bound::Value(t))
                .fold(Bound::PosInf, |acc, b| acc.min(b))
        };
        Interval { lo, hi }
    }

    /// Narrows `self` (an infinite-ish bound from widening) towards the
    /// tighter bound `next` computed by the decreasing iteration.
    pub fn narrow(&self, next: &Interval) -> Interval {
        if self.is_bottom() || next.is_bottom() {
            return Interval::bottom();
        }
        let lo = if matches!(self.lo, Bound::NegInf) {
            next.lo
        } else {
            self.lo
        };
        let hi = if matches!(self.hi, Bound::PosInf) {
            next.hi
        } else {
            self.hi
        };
        Interval { lo, hi }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::NegInf => write!(f, "-inf"),
            Bound::Value(v) => write!(f, "{v}"),
            Bound::PosInf => write!(f, "+inf"),
        }
    }
}

/// Matches the debug-inspection checker's dump format: a
/// singleton prints bare, `⊥`/`T` stand for bottom/top, anything else
/// prints as `[lo, hi]`.
impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom() {
            return write!(f, "⊥");
        }
        if *self == Interval::TOP {
            return write!(f, "T");
        }
        if let (Bound::Value(lo), Bound::Value(hi)) = (self.lo, self.hi) {
            if lo == hi {
                return write!(f, "{lo}");
            }
        }
        write!(f, "[{}, {}]", self.lo, self.hi)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn negate(self) -> CompareOp {
        match self {
            CompareOp::Eq => CompareOp::Ne,
            CompareOp::Ne => CompareOp::Eq,
            CompareOp::Lt => CompareOp::Ge,
            CompareOp::Le => CompareOp::Gt,
            CompareOp::Gt => CompareOp::Le,
            CompareOp::Ge => CompareOp::Lt,
        }
    }
}

/// `sum(coeffs[v] * v) + constant`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ZLinearExpr {
    pub coeffs: BTreeMap<ZVariable, i128>,
    pub constant: i128,
}

impl ZLinearExpr {
    pub fn constant(c: i128) -> Self {
        Self {
            coeffs: BTreeMap::new(),
            constant: c,
        }
    }

    pub fn var(v: ZVariable) -> Self {
        let mut coeffs = BTreeMap::new();
        coeffs.insert(v, 1);
        Self {
            coeffs,
            constant: 0,
        }
    }

    pub fn scale(mut self, factor: i128) -> Self {
        for c in self.coeffs.values_mut() {
            *c *= factor;
        }
        self.constant *= factor;
        self
    }

    pub fn single_var(&self) -> Option<(ZVariable, i128)> {
        let mut iter = self.coeffs.iter().filter(|(_, &c)| c != 0);
        let first = iter.next()?;
        if iter.next().is_some() {
            return None;
        }
        Some((*first.0, *first.1))
    }
}

impl Add for ZLinearExpr {
    type Output = ZLinearExpr;

    fn add(mut self, rhs: ZLinearExpr) -> ZLinearExpr {
        for (v, c) in rhs.coeffs {
            *self.coeffs.entry(v).or_insert(0) += c;
        }
        self.coeffs.retain(|_, c| *c != 0);
        self.constant += rhs.constant;
        self
    }
}

/// `expr OP 0`, the canonical form `filter_condition`
/// produces and `add_zlinear_constraint` consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZLinearConstraint {
    pub expr: ZLinearExpr,
    pub op: CompareOp,
}

impl ZLinearConstraint {
    pub fn negate(&self) -> Self {
        Self {
            expr: self.expr.clone(),
            op: self.op.negate(),
        }
    }
}

/// The numerical domain threaded through program state: an interval per
/// `ZVariable` plus a conjunction of linear constraints, with an explicit
/// bottom flag.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericalDomain {
    intervals: BTreeMap<ZVariable, Interval>,
    constraints: BTreeSet<ZLinearConstraintKey>,
    bottom: bool,
}

/// `ZLinearConstraint` wrapped for `Ord`/`BTreeSet` use — constraints are
/// compared structurally so join/meet can be set operations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ZLinearConstraintKey(Vec<(ZVariable, i128)>, i128, u8);

fn constraint_key(c: &ZLinearConstraint) -> ZLinearConstraintKey {
    let terms: Vec<_> = c
        .expr
        .coeffs
        .iter()
        .map(|(&v, &coeff)| (v, coeff))
        .collect();
    let op_tag = match c.op {
        CompareOp::Eq => 0,
        CompareOp::Ne => 1,
        CompareOp::Lt => 2,
        CompareOp::Le => 3,
        CompareOp::Gt => 4,
        CompareOp::Ge => 5,
    };
    ZLinearConstraintKey(terms, c.expr.constant, op_tag)
}

impl Default for NumericalDomain {
    fn default() -> Self {
        Self::top()
    }
}

impl NumericalDomain {
    pub fn top() -> Self {
        Self {
            intervals: BTreeMap::new(),
            constraints: BTreeSet::new(),
            bottom: false,
        }
    }

    pub fn bottom() -> Self {
        Self {
            intervals: BTreeMap::new(),
            constraints: BTreeSet::new(),
            bottom: true,
        }
    }

    pub fn is_bottom(&self) -> bool {
        self.bottom
    }

    pub fn is_top(&self) -> bool {
        !self.bottom && self.intervals.is_empty() && self.constraints.is_empty()
    }

    pub fn set_to_bottom(&mut self) {
        self.intervals.clear();
        self.constraints.clear();
        self.bottom = true;
    }

    pub fn interval_of(&self, v: ZVariable) -> Interval {
        if self.bottom {
            return Interval::bottom();
        }
        self.intervals.get(&v).copied().unwrap_or(Interval::TOP)
    }

    pub fn set_interval(&self, v: ZVariable, interval: Interval) -> Self {
        if self.bottom {
            return self.clone();
        }
        let mut next = self.clone();
        if interval.is_bottom() {
            next.bottom = true;
            next.intervals.clear();
            next.constraints.clear();
            return next;
        }
        if matches!(interval, Interval::TOP) {
            next.intervals.remove(&v);
        } else {
            next.intervals.insert(v, interval);
        }
        next
    }

    /// Folds `constraint` in: refines the single-variable interval store
    /// directly when the constraint is `x OP constant`, and always keeps
    /// the constraint in the general conjunction for later `leq`/join use.
    pub fn add_constraint(&self, constraint: ZLinearConstraint) -> Self {
        if self.bottom {
            return self.clone();
        }
        let mut next = self.clone();
        if let Some((v, coeff)) = constraint.expr.single_var() {
            if coeff == 1 || coeff == -1 {
                let bound = -constraint.expr.constant / coeff;
                let refined = match (constraint.op, coeff) {
                    (CompareOp::Eq, _) => Interval::singleton(bound),
                    (CompareOp::Ge, 1) | (CompareOp::Le, -1) => Interval::at_least(bound),
                    (CompareOp::Le, 1) | (CompareOp::Ge, -1) => Interval::at_most(bound),
                    (CompareOp::Gt, 1) | (CompareOp::Lt, -1) => Interval::at_least(bound + 1),
                    (CompareOp::Lt, 1) | (CompareOp::Gt, -1) => Interval::at_most(bound - 1),
                    (CompareOp::Ne, _) => Interval::TOP,
                    _ => Interval::TOP,
                };
                let merged = next.interval_of(v).meet(&refined);
                return next.set_interval(v, merged);
            }
        }
        next.constraints.insert(constraint_key(&constraint));
        next
    }

    pub fn leq(&self, other: &NumericalDomain) -> bool {
        if self.bottom {
            return true;
        }
        if other.bottom {
            return false;
        }
        let vars = self.intervals.keys().chain(other.intervals.keys());
        for v in vars {
            if !self.interval_of(*v).leq(&other.interval_of(*v)) {
                return false;
            }
        }
        other.constraints.is_subset(&self.constraints)
    }

    pub fn join(&self, other: &NumericalDomain) -> Self {
        if self.bottom {
            return other.clone();
        }
        if other.bottom {
            return self.clone();
        }
        let mut intervals = BTreeMap::new();
        for v in self.intervals.keys().chain(other.intervals.keys()) {
            intervals.insert(*v, self.interval_of(*v).join(&other.interval_of(*v)));
        }
        intervals.retain(|_, i| !matches!(i, Interval::TOP));
        Self {
            intervals,
            constraints: self
                .constraints
                .intersection(&other.constraints)
                .cloned()
                .collect(),
            bottom: false,
        }
    }

    pub fn meet(&self, other: &NumericalDomain) -> Self {
        if self.bottom || other.bottom {
            return Self::bottom();
        }
        let mut intervals = BTreeMap::new();
        for v in self.intervals.keys().chain(other.intervals.keys()) {
            intervals.insert(*v, self.interval_of(*v).meet(&other.interval_of(*v)));
        }
        let mut result = Self {
            intervals,
            constraints: self.constraints.union(&other.constraints).cloned().collect(),
            bottom: false,
        };
        result.normalize();
        result
    }

    pub fn widen(&self, next: &NumericalDomain, thresholds: &[i128]) -> Self {
        if self.bottom {
            return next.clone();
        }
        if next.bottom {
            return self.clone();
        }
        let mut intervals = BTreeMap::new();
        for v in self.intervals.keys().chain(next.intervals.keys()) {
            intervals.insert(
                *v,
                self.interval_of(*v).widen(&next.interval_of(*v), thresholds),
            );
        }
        intervals.retain(|_, i| !matches!(i, Interval::TOP));
        Self {
            intervals,
            constraints: self
                .constraints
                .intersection(&next.constraints)
                .cloned()
                .collect(),
            bottom: false,
        }
    }

    pub fn narrow(&self, next: &NumericalDomain) -> Self {
        if self.bottom || next.bottom {
            return Self::bottom();
        }
        let mut intervals = self.intervals.clone();
        for (v, next_interval) in &next.intervals {
            let refined = self.interval_of(*v).narrow(next_interval);
            if matches!(refined, Interval::TOP) {
                intervals.remove(v);
            } else {
                intervals.insert(*v, refined);
            }
        }
        Self {
            intervals,
            constraints: self.constraints.union(&next.constraints).cloned().collect(),
            bottom: false,
        }
    }

    pub fn normalize(&mut self) {
        if self.bottom {
            self.intervals.clear();
            self.constraints.clear();
            return;
        }
        if self.intervals.values().any(Interval::is_bottom) {
            self.set_to_bottom();
        }
    }
}
