//! Small `Copy` id newtypes shared across modules, built on
//! [`knight_core::Id`] for the interned pools and hand-rolled for ids the
//! front end hands in (statements, declarations, CFG nodes, functions).

use knight_core::Id;

use crate::symbol::SymExpr;
use crate::region::MemRegion;

pub type SymbolId = Id<SymExpr>;
pub type RegionId = Id<MemRegion>;

macro_rules! index_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

index_id!(FrameId);
index_id!(LocCtxId);
index_id!(NodeId);
index_id!(FunctionId);
/// Identifies a registered analysis (the `(Kind, Name, Id,
/// Desc)` registration tuple).
index_id!(AnalysisId);
/// Identifies a registered checker.
index_id!(CheckerId);
/// Identifies a statement or expression from the front end's AST. Clang's
/// `Expr` derives from `Stmt`, so the original implementation uses a single
/// pointer type for both; `StmtRef` plays that role here.
index_id!(StmtRef);
index_id!(DeclRef);
