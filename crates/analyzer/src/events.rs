//! Events published by the symbol resolver (C7) and consumed by other
//! registered analyses. Re-expresses the source's X-macro `EVENT_DEF`
//! table and mixin-based subscription as a fixed enum plus a dispatcher
//! that calls every registered analysis's `handle_event` in registration
//! order.

use crate::ids::{RegionId, SymbolId};
use crate::numeric::ZLinearExpr;
use crate::types::SymType;

/// How the left/right operand of a binary numerical assignment project
/// into the linear-arithmetic view — the resolver classifies this before
/// publishing so subscribers don't have to re-derive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandShape {
    VarVar,
    VarNum,
    NumVar,
    Other,
}

#[derive(Debug, Clone)]
pub enum Event {
    /// A numerical assignment `target := lhs op rhs` was resolved; `expr`
    /// is the linear-arithmetic lift of the right-hand side when one
    /// exists.
    LinearNumericalAssign {
        target: SymbolId,
        expr: Option<ZLinearExpr>,
        shape: OperandShape,
    },
    /// An int-to-int cast changing width was resolved.
    ZVarAssignZCast {
        target: SymbolId,
        operand: SymbolId,
        src_ty: SymType,
        dst_ty: SymType,
    },
    /// A pointer-typed assignment `region := value` was resolved. Only the
    /// assignment case is handled / §9 Open Question 1;
    /// this event exists so a pointer-aliasing analysis could subscribe
    /// later without changing the resolver.
    PointerAssign { region: RegionId, value: SymbolId },
}
