//! C3: the program state — an immutable, persistent map threaded through
//! the fixpoint engine. `stmt_sexpr`/`region_def` are sparse equality
//! caches keyed by `(entity, frame)`; the numerical domain is the one
//! abstract domain that actually carries quantitative information.
//!
//! The maps use the same intersection-on-join / agree-or-drop discipline
//! `NumericalDomain` already applies to its constraint set: a join keeps
//! only entries both operands agree on, which is trivially sound (the
//! result only asserts facts both predecessors independently established)
//! and keeps `self.leq(join(self, other))` true by construction — no
//! merge-symbol synthesis is needed at this layer.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::ids::{FrameId, LocCtxId, RegionId, StmtRef, SymbolId};
use crate::numeric::{NumericalDomain, ZLinearConstraint};
use crate::region::RegionManager;
use crate::symbol::SymbolManager;
use crate::types::SymType;

type StmtKey = (StmtRef, FrameId);
type RegionKey = (RegionId, FrameId);
type StmtMap = Rc<BTreeMap<StmtKey, SymbolId>>;
type RegionMap = Rc<BTreeMap<RegionKey, SymbolId>>;

/// `leq`/`join`/`widen`/`narrow` all factor through this shared merge
/// routine parameterized by how to resolve disagreements on a key present
/// in both maps; only the strategy differs between operators.
#[derive(Clone, Copy)]
enum MergeStrategy {
    /// Join/widen: keep a key only when both sides agree (intersection).
    AgreeOrDrop,
    /// Narrow: prefer the more refined (`next`) side's value, falling back
    /// to `self`'s when `next` doesn't have the key.
    PreferNext,
}

fn merge_maps<K: Ord + Clone, V: Clone + PartialEq>(
    a: &BTreeMap<K, V>,
    b: &BTreeMap<K, V>,
    strategy: MergeStrategy,
) -> BTreeMap<K, V> {
    match strategy {
        MergeStrategy::AgreeOrDrop => a
            .iter()
            .filter_map(|(k, v)| match b.get(k) {
                Some(v2) if v2 == v => Some((k.clone(), v.clone())),
                _ => None,
            })
            .collect(),
        MergeStrategy::PreferNext => {
            let mut out = a.clone();
            for (k, v) in b {
                out.insert(k.clone(), v.clone());
            }
            out
        }
    }
}

/// Whether every key `other` asserts is also asserted, identically, by
/// `self` — the ordering `leq` reduces to once bottom is handled.
fn agrees_with<K: Ord, V: PartialEq>(bigger: &BTreeMap<K, V>, smaller: &BTreeMap<K, V>) -> bool {
    smaller.iter().all(|(k, v)| bigger.get(k) == Some(v))
}

#[derive(Clone)]
pub struct ProgramState {
    stmt_sexpr: StmtMap,
    region_def: RegionMap,
    numerical: NumericalDomain,
    bottom: bool,
}

impl PartialEq for ProgramState {
    fn eq(&self, other: &Self) -> bool {
        if self.bottom != other.bottom {
            return false;
        }
        if self.bottom {
            return true;
        }
        (Rc::ptr_eq(&self.stmt_sexpr, &other.stmt_sexpr) || *self.stmt_sexpr == *other.stmt_sexpr)
            && (Rc::ptr_eq(&self.region_def, &other.region_def)
                || *self.region_def == *other.region_def)
            && self.numerical == other.numerical
    }
}

impl ProgramState {
    pub fn top() -> Self {
        Self {
            stmt_sexpr: Rc::new(BTreeMap::new()),
            region_def: Rc::new(BTreeMap::new()),
            numerical: NumericalDomain::top(),
            bottom: false,
        }
    }

    pub fn bottom() -> Self {
        Self {
            stmt_sexpr: Rc::new(BTreeMap::new()),
            region_def: Rc::new(BTreeMap::new()),
            numerical: NumericalDomain::bottom(),
            bottom: true,
        }
    }

    pub fn is_bottom(&self) -> bool {
        self.bottom
    }

    pub fn is_top(&self) -> bool {
        !self.bottom && self.stmt_sexpr.is_empty() && self.region_def.is_empty() && self.numerical.is_top()
    }

    pub fn set_to_bottom(&mut self) {
        *self = Self::bottom();
    }

    pub fn set_to_top(&mut self) {
        *self = Self::top();
    }

    pub fn get_stmt_sexpr(&self, stmt: StmtRef, frame: FrameId) -> Option<SymbolId> {
        if self.bottom {
            return None;
        }
        self.stmt_sexpr.get(&(stmt, frame)).copied()
    }

    pub fn set_stmt_sexpr(&self, stmt: StmtRef, frame: FrameId, sexpr: SymbolId) -> Self {
        if self.bottom {
            return self.clone();
        }
        let mut map = (*self.stmt_sexpr).clone();
        map.insert((stmt, frame), sexpr);
        Self {
            stmt_sexpr: Rc::new(map),
            region_def: self.region_def.clone(),
            numerical: self.numerical.clone(),
            bottom: false,
        }
    }

    /// Returns the memoized value of `stmt` if present, else conjures a
    /// fresh symbol tagged with `frame` — does not memoize
    /// the conjured value; the caller (the symbol resolver) decides
    /// whether and how to store it via `set_stmt_sexpr`.
    pub fn get_stmt_sexpr_or_conjured(
        &self,
        mgr: &mut SymbolManager<'_>,
        stmt: StmtRef,
        frame: FrameId,
        ty: SymType,
    ) -> SymbolId {
        if let Some(id) = self.get_stmt_sexpr(stmt, frame) {
            return id;
        }
        mgr.get_symbol_conjured(stmt, ty, frame, None)
    }

    pub fn get_region_def(&self, region: RegionId, frame: FrameId) -> Option<SymbolId> {
        if self.bottom {
            return None;
        }
        self.region_def.get(&(region, frame)).copied()
    }

    /// Stores `def` as the current value of `region` under `frame`.
    ///
    /// # Panics
    ///
    /// Panics (an analyzer-bug class invariant violation) if `def`'s type
    /// is not compatible with `region`'s `value_type` — the
    /// "assigning a sexpr of incompatible type to a region is a
    /// programmer error".
    pub fn set_region_def(
        &self,
        region_mgr: &RegionManager<'_>,
        symbol_mgr: &SymbolManager<'_>,
        region: RegionId,
        frame: FrameId,
        def: SymbolId,
    ) -> Self {
        if self.bottom {
            return self.clone();
        }
        let expected = region_mgr.get(region).value_type;
        let actual = symbol_mgr.get(def).ty();
        assert!(
            types_compatible(expected, actual),
            "region {region:?} expects {expected:?} but got a symbol of type {actual:?}"
        );
        let mut map = (*self.region_def).clone();
        map.insert((region, frame), def);
        Self {
            stmt_sexpr: self.stmt_sexpr.clone(),
            region_def: Rc::new(map),
            numerical: self.numerical.clone(),
            bottom: false,
        }
    }

    /// The region denoting `decl`'s storage — a thin convenience over
    /// `RegionManager::get_stack_region`; `frame` only participates in the
    /// `region_def` lookup, not region identity.
    pub fn get_region(
        region_mgr: &mut RegionManager<'_>,
        decl: crate::ids::DeclRef,
        value_type: SymType,
    ) -> RegionId {
        region_mgr.get_stack_region(decl, value_type)
    }

    pub fn get_zdom_ref(&self) -> &NumericalDomain {
        &self.numerical
    }

    pub fn add_zlinear_constraint(&self, constraint: ZLinearConstraint) -> Self {
        if self.bottom {
            return self.clone();
        }
        let mut next = self.clone();
        next.numerical = next.numerical.add_constraint(constraint);
        next.normalize();
        next
    }

    pub fn leq(&self, other: &ProgramState) -> bool {
        if self.bottom {
            return true;
        }
        if other.bottom {
            return false;
        }
        self.numerical.leq(&other.numerical)
            && agrees_with(&self.stmt_sexpr, &other.stmt_sexpr)
            && agrees_with(&self.region_def, &other.region_def)
    }

    fn merge(&self, other: &ProgramState, strategy: MergeStrategy, numerical: NumericalDomain) -> Self {
        let mut next = Self {
            stmt_sexpr: Rc::new(merge_maps(&self.stmt_sexpr, &other.stmt_sexpr, strategy)),
            region_def: Rc::new(merge_maps(&self.region_def, &other.region_def, strategy)),
            numerical,
            bottom: false,
        };
        next.normalize();
        next
    }

    pub fn join(&self, other: &ProgramState, _loc_ctx: LocCtxId) -> Self {
        if self.bottom {
            return other.clone();
        }
        if other.bottom {
            return self.clone();
        }
        self.merge(other, MergeStrategy::AgreeOrDrop, self.numerical.join(&other.numerical))
    }

    /// Used for the first `widening_delay` increasing iterations: an
    /// ordinary join, just invoked at a different point in the fixpoint
    /// engine's cycle-head loop.
    pub fn join_consecutive_iter(&self, other: &ProgramState, loc_ctx: LocCtxId) -> Self {
        self.join(other, loc_ctx)
    }

    /// Joins the "from outside the loop" and "loop-carried" contributions
    /// to a cycle head's incoming state before widening.
    pub fn join_at_loop_head(&self, other: &ProgramState) -> Self {
        self.join(other, LocCtxId(0))
    }

    pub fn meet(&self, other: &ProgramState) -> Self {
        if self.bottom || other.bottom {
            return Self::bottom();
        }
        let mut stmt_sexpr = (*self.stmt_sexpr).clone();
        let mut contradiction = false;
        for (k, v) in other.stmt_sexpr.iter() {
            match stmt_sexpr.get(k) {
                Some(existing) if existing != v => contradiction = true,
                _ => {
                    stmt_sexpr.insert(*k, *v);
                }
            }
        }
        let mut region_def = (*self.region_def).clone();
        for (k, v) in other.region_def.iter() {
            match region_def.get(k) {
                Some(existing) if existing != v => contradiction = true,
                _ => {
                    region_def.insert(*k, *v);
                }
            }
        }
        if contradiction {
            return Self::bottom();
        }
        let mut next = Self {
            stmt_sexpr: Rc::new(stmt_sexpr),
            region_def: Rc::new(region_def),
            numerical: self.numerical.meet(&other.numerical),
            bottom: false,
        };
        next.normalize();
        next
    }

    pub fn widen(&self, other: &ProgramState, loc_ctx: LocCtxId) -> Self {
        self.widen_with_threshold(other, loc_ctx, &[])
    }

    pub fn widen_with_threshold(&self, other: &ProgramState, _loc_ctx: LocCtxId, thresholds: &[i128]) -> Self {
        if self.bottom {
            return other.clone();
        }
        if other.bottom {
            return self.clone();
        }
        self.merge(
            other,
            MergeStrategy::AgreeOrDrop,
            self.numerical.widen(&other.numerical, thresholds),
        )
    }

    pub fn narrow(&self, other: &ProgramState) -> Self {
        if self.bottom || other.bottom {
            return Self::bottom();
        }
        self.merge(
            other,
            MergeStrategy::PreferNext,
            self.numerical.narrow(&other.numerical),
        )
    }

    /// Narrowing-with-threshold falls back to plain narrow: the
    /// interval domain doesn't special-case a threshold on the refining
    /// side (only widening snaps to one), matching the
    /// narrowing-with-threshold asymmetry note.
    pub fn narrow_with_threshold(&self, other: &ProgramState, _threshold: i128) -> Self {
        self.narrow(other)
    }

    pub fn normalize(&mut self) {
        self.numerical.normalize();
        if self.numerical.is_bottom() {
            self.set_to_bottom();
        }
    }
}

impl Default for ProgramState {
    fn default() -> Self {
        Self::top()
    }
}

fn types_compatible(expected: SymType, actual: SymType) -> bool {
    expected == actual || (expected.is_pointer() && actual.is_pointer())
}
