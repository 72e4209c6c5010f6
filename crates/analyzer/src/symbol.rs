//! C2 (symbol half): the symbolic-expression algebra and its interning
//! manager. Every node is a leaf (`ScalarInt`/`ScalarFloat`,
//! `RegionSymVal`/`RegionSymExtent`/`RegionAddr`/`SymbolConjured`) or a
//! composite over other interned nodes (`CastSym`, `UnarySymExpr`,
//! `BinarySymExpr`), matching the class hierarchy in
//! `include/dfa/symbol.hpp`.

use std::cell::RefCell;
use std::collections::HashMap;

use knight_core::Interner;

use crate::front_end::{BinOp, UnOp};
use crate::ids::{FrameId, LocCtxId, RegionId, StmtRef, SymbolId};
use crate::numeric::{CompareOp, ZLinearConstraint, ZLinearExpr, ZNum, ZVariable};
use crate::types::SymType;

#[derive(Debug, Clone, PartialEq)]
pub enum SymExpr {
    ScalarInt {
        value: i128,
        ty: SymType,
    },
    ScalarFloat {
        value: f64,
        ty: SymType,
    },
    RegionSymVal {
        region: RegionId,
        loc_ctx: LocCtxId,
        external: bool,
        ty: SymType,
    },
    RegionSymExtent {
        region: RegionId,
    },
    RegionAddr {
        region: RegionId,
    },
    SymbolConjured {
        stmt: StmtRef,
        ty: SymType,
        frame: FrameId,
        tag: Option<&'static str>,
    },
    CastSym {
        operand: SymbolId,
        src_ty: SymType,
        dst_ty: SymType,
    },
    UnarySymExpr {
        operand: SymbolId,
        op: UnOp,
        ty: SymType,
    },
    BinarySymExpr {
        lhs: SymbolId,
        rhs: SymbolId,
        op: BinOp,
        ty: SymType,
    },
}

impl SymExpr {
    pub fn ty(&self) -> SymType {
        match self {
            SymExpr::ScalarInt { ty, .. }
            | SymExpr::ScalarFloat { ty, .. }
            | SymExpr::RegionSymVal { ty, .. }
            | SymExpr::SymbolConjured { ty, .. }
            | SymExpr::CastSym { dst_ty: ty, .. }
            | SymExpr::UnarySymExpr { ty, .. }
            | SymExpr::BinarySymExpr { ty, .. } => *ty,
            SymExpr::RegionSymExtent { .. } => SymType::INT,
            SymExpr::RegionAddr { .. } => SymType::Pointer,
        }
    }

    /// Leaves are the variants with no symbolic-expression operands: the
    /// two scalar kinds and the three region/conjured "Sym" kinds.
    /// Composite kinds (`CastSym`, `UnarySymExpr`, `BinarySymExpr`) are
    /// never leaves.
    pub fn is_leaf(&self) -> bool {
        !matches!(
            self,
            SymExpr::CastSym { .. } | SymExpr::UnarySymExpr { .. } | SymExpr::BinarySymExpr { .. }
        )
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
enum SymExprKey {
    ScalarInt(i128, SymType),
    ScalarFloat(u64, SymType),
    RegionSymVal(RegionId, LocCtxId, bool, SymType),
    RegionSymExtent(RegionId),
    RegionAddr(RegionId),
    SymbolConjured(StmtRef, SymType, FrameId, Option<&'static str>),
    Cast(SymbolId, SymType, SymType),
    Unary(SymbolId, UnOp, SymType),
    Binary(SymbolId, SymbolId, BinOp, SymType),
}

pub struct SymbolManager<'a> {
    pool: Interner<'a, SymExprKey, SymExpr>,
    complexity_cache: RefCell<HashMap<SymbolId, u32>>,
}

impl<'a> SymbolManager<'a> {
    pub fn new(bump: &'a bumpalo::Bump) -> Self {
        Self {
            pool: Interner::new(bump),
            complexity_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: SymbolId) -> &'a SymExpr {
        self.pool.get(id)
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn get_scalar_int(&mut self, value: i128, ty: SymType) -> SymbolId {
        self.pool.intern(SymExprKey::ScalarInt(value, ty), || SymExpr::ScalarInt {
            value,
            ty,
        })
    }

    pub fn get_scalar_float(&mut self, value: f64, ty: SymType) -> SymbolId {
        self.pool.intern(
            SymExprKey::ScalarFloat(value.to_bits(), ty),
            || SymExpr::ScalarFloat { value, ty },
        )
    }

    pub fn get_region_sym_val(
        &mut self,
        region: RegionId,
        loc_ctx: LocCtxId,
        external: bool,
        ty: SymType,
    ) -> SymbolId {
        self.pool.intern(
            SymExprKey::RegionSymVal(region, loc_ctx, external, ty),
            || SymExpr::RegionSymVal {
                region,
                loc_ctx,
                external,
                ty,
            },
        )
    }

    pub fn get_region_sym_extent(&mut self, region: RegionId) -> SymbolId {
        self.pool
            .intern(SymExprKey::RegionSymExtent(region), || SymExpr::RegionSymExtent { region })
    }

    pub fn get_region_addr(&mut self, region: RegionId) -> SymbolId {
        self.pool
            .intern(SymExprKey::RegionAddr(region), || SymExpr::RegionAddr { region })
    }

    pub fn get_symbol_conjured(
        &mut self,
        stmt: StmtRef,
        ty: SymType,
        frame: FrameId,
        tag: Option<&'static str>,
    ) -> SymbolId {
        self.pool.intern(
            SymExprKey::SymbolConjured(stmt, ty, frame, tag),
            || SymExpr::SymbolConjured {
                stmt,
                ty,
                frame,
                tag,
            },
        )
    }

    pub fn get_cast_sym_expr(&mut self, operand: SymbolId, src_ty: SymType, dst_ty: SymType) -> SymbolId {
        if src_ty == dst_ty {
            return operand;
        }
        self.pool.intern(
            SymExprKey::Cast(operand, src_ty, dst_ty),
            || SymExpr::CastSym {
                operand,
                src_ty,
                dst_ty,
            },
        )
    }

    pub fn get_unary_sym_expr(&mut self, operand: SymbolId, op: UnOp, ty: SymType) -> SymbolId {
        self.pool
            .intern(SymExprKey::Unary(operand, op, ty), || SymExpr::UnarySymExpr {
                operand,
                op,
                ty,
            })
    }

    pub fn get_binary_sym_expr(&mut self, lhs: SymbolId, rhs: SymbolId, op: BinOp, ty: SymType) -> SymbolId {
        self.pool
            .intern(SymExprKey::Binary(lhs, rhs, op, ty), || SymExpr::BinarySymExpr {
                lhs,
                rhs,
                op,
                ty,
            })
    }

    /// `get_worst_complexity`: monotone under substructure; `+`/`-` are
    /// `max` of operand complexities (they don't blow up state size the
    /// way a product would), everything else composite is a product of
    /// `max(complexity, 1)`.
    pub fn complexity(&self, id: SymbolId) -> u32 {
        if let Some(&c) = self.complexity_cache.borrow().get(&id) {
            return c;
        }
        let c = match self.get(id) {
            SymExpr::ScalarInt { .. }
            | SymExpr::ScalarFloat { .. }
            | SymExpr::RegionSymVal { .. }
            | SymExpr::RegionSymExtent { .. }
            | SymExpr::RegionAddr { .. }
            | SymExpr::SymbolConjured { .. } => 1,
            SymExpr::CastSym { operand, .. } | SymExpr::UnarySymExpr { operand, .. } => {
                self.complexity(*operand)
            }
            SymExpr::BinarySymExpr { lhs, rhs, op, .. } => {
                let l = self.complexity(*lhs).max(1);
                let r = self.complexity(*rhs).max(1);
                if matches!(op, BinOp::Add | BinOp::Sub) {
                    l.max(r)
                } else {
                    l * r
                }
            }
        };
        self.complexity_cache.borrow_mut().insert(id, c);
        c
    }

    pub fn is_leaf(&self, id: SymbolId) -> bool {
        self.get(id).is_leaf()
    }
}

/// Projects `id` into a `ZVariable` iff it denotes a numerical symbol with
/// no further linear structure to unpack (a conjured value or a region's
/// current value).
pub fn as_zvariable(mgr: &SymbolManager<'_>, id: SymbolId) -> Option<ZVariable> {
    match mgr.get(id) {
        SymExpr::SymbolConjured { ty, .. } if ty.is_numerical() => Some(ZVariable(id)),
        SymExpr::RegionSymVal { ty, .. } if ty.is_numerical() => Some(ZVariable(id)),
        _ => None,
    }
}

pub fn as_znum(mgr: &SymbolManager<'_>, id: SymbolId) -> Option<ZNum> {
    match mgr.get(id) {
        SymExpr::ScalarInt { value, .. } => Some(ZNum(*value)),
        _ => None,
    }
}

/// Lifts `id` into the linear-arithmetic view, distributing over `+`/`-`
/// and scaling over multiplication by a constant; anything else (a
/// non-linear product, an unresolved cast, a pointer) returns `None`.
pub fn as_zexpr(mgr: &SymbolManager<'_>, id: SymbolId) -> Option<ZLinearExpr> {
    if let Some(n) = as_znum(mgr, id) {
        return Some(ZLinearExpr::constant(n.0));
    }
    if let Some(v) = as_zvariable(mgr, id) {
        return Some(ZLinearExpr::var(v));
    }
    match mgr.get(id) {
        SymExpr::BinarySymExpr { lhs, rhs, op, .. } => match op {
            BinOp::Add => {
                let l = as_zexpr(mgr, *lhs)?;
                let r = as_zexpr(mgr, *rhs)?;
                Some(l + r)
            }
            BinOp::Sub => {
                let l = as_zexpr(mgr, *lhs)?;
                let r = as_zexpr(mgr, *rhs)?.scale(-1);
                Some(l + r)
            }
            BinOp::Mul => {
                if let Some(n) = as_znum(mgr, *lhs) {
                    Some(as_zexpr(mgr, *rhs)?.scale(n.0))
                } else if let Some(n) = as_znum(mgr, *rhs) {
                    Some(as_zexpr(mgr, *lhs)?.scale(n.0))
                } else {
                    None
                }
            }
            _ => None,
        },
        SymExpr::CastSym { operand, .. } => as_zexpr(mgr, *operand),
        _ => None,
    }
}

/// Lifts a comparison `BinarySymExpr` into `lhs - rhs OP 0`; `negate`
/// flips the comparison (used when filtering the false branch of a
/// condition).
pub fn as_zconstraint(mgr: &SymbolManager<'_>, id: SymbolId, negate: bool) -> Option<ZLinearConstraint> {
    let SymExpr::BinarySymExpr { lhs, rhs, op, .. } = mgr.get(id) else {
        return None;
    };
    if !op.is_comparison() {
        return None;
    }
    let op = comparison_to_compare_op(*op);
    let l = as_zexpr(mgr, *lhs)?;
    let r = as_zexpr(mgr, *rhs)?.scale(-1);
    let expr = l + r;
    let op = if negate { op.negate() } else { op };
    Some(ZLinearConstraint { expr, op })
}

fn comparison_to_compare_op(op: BinOp) -> CompareOp {
    match op {
        BinOp::Eq => CompareOp::Eq,
        BinOp::Ne => CompareOp::Ne,
        BinOp::Lt => CompareOp::Lt,
        BinOp::Le => CompareOp::Le,
        BinOp::Gt => CompareOp::Gt,
        BinOp::Ge => CompareOp::Ge,
        _ => unreachable!("not a comparison opcode"),
    }
}
