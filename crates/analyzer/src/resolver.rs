//! C7: the symbol resolver. The built-in `Analysis` that walks a
//! statement's syntactic shape and turns it into
//! `stmt_sexpr`/`region_def` updates, publishing events (`events.rs`) for
//! other analyses to react to rather than touching the numerical domain
//! directly — keeping the AST-to-symbol translation and the numeric
//! abstract semantics in separate, independently testable places.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::analysis::{Analysis, AnalysisContext};
use crate::events::{Event, OperandShape};
use crate::front_end::{BinOp, StmtKind, UnOp};
use crate::ids::{AnalysisId, DeclRef, RegionId, StmtRef, SymbolId};
use crate::numeric::{CompareOp, ZLinearConstraint, ZLinearExpr};
use crate::state::ProgramState;
use crate::symbol::{as_zconstraint, as_zexpr, as_znum, as_zvariable};
use crate::types::SymType;

pub const SYMBOL_RESOLVER_ID: AnalysisId = AnalysisId(0);

#[derive(Default)]
pub struct SymbolResolverAnalysis {
    /// Remembers each declaration's declared type so later references
    /// (`&x`, `x++`) can reconstruct `x`'s region without needing every
    /// `DeclRefExpr` to repeat it.
    decl_types: RefCell<BTreeMap<DeclRef, SymType>>,
}

impl SymbolResolverAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    fn decl_type(&self, decl: DeclRef) -> SymType {
        self.decl_types.borrow().get(&decl).copied().unwrap_or(SymType::INT)
    }

    fn region_of(&self, ctx: &mut AnalysisContext<'_, '_>, expr: StmtRef) -> Option<RegionId> {
        match ctx.provider().stmt_kind(expr) {
            StmtKind::DeclRefExpr { decl } => {
                let ty = self.decl_type(decl);
                Some(ctx.region_mgr.get_stack_region(decl, ty))
            }
            StmtKind::ImplicitCast { operand, .. } => self.region_of(ctx, operand),
            _ => None,
        }
    }

    fn classify_shape(mgr: &crate::symbol::SymbolManager<'_>, lhs: SymbolId, rhs: SymbolId) -> OperandShape {
        let lhs_var = as_zvariable(mgr, lhs).is_some();
        let rhs_var = as_zvariable(mgr, rhs).is_some();
        let lhs_num = as_znum(mgr, lhs).is_some();
        let rhs_num = as_znum(mgr, rhs).is_some();
        if lhs_var && rhs_var {
            OperandShape::VarVar
        } else if lhs_var && rhs_num {
            OperandShape::VarNum
        } else if lhs_num && rhs_var {
            OperandShape::NumVar
        } else {
            OperandShape::Other
        }
    }

    /// Forms `lhs op rhs`, classifies the operand shapes, and publishes a
    /// `LinearNumericalAssign` event. Returns the symbol the statement's
    /// value resolves to: the binary expression itself when its worst-case
    /// complexity is low enough to keep exactly, otherwise a fresh
    /// conjured symbol standing in for it — in which case the conjured
    /// symbol is also linked back to the expression by an equality
    /// constraint, since a conjured symbol carries no definition of its
    /// own.
    fn publish_numeric_assign(
        &self,
        ctx: &mut AnalysisContext<'_, '_>,
        stmt: StmtRef,
        lhs: SymbolId,
        rhs: SymbolId,
        op: BinOp,
        ty: SymType,
    ) -> SymbolId {
        let bin = ctx.symbol_mgr.get_binary_sym_expr(lhs, rhs, op, ty);
        let shape = Self::classify_shape(ctx.symbol_mgr, lhs, rhs);
        let expr = as_zexpr(ctx.symbol_mgr, bin);
        let frame = ctx.frame();
        let target = if ctx.symbol_mgr.complexity(bin) <= 1 {
            bin
        } else {
            ctx.symbol_mgr.get_symbol_conjured(stmt, ty, frame, Some("numeric_assign"))
        };
        ctx.publish(Event::LinearNumericalAssign {
            target,
            expr: expr.clone(),
            shape,
        });
        if target != bin {
            if let (Some(v), Some(e)) = (as_zvariable(ctx.symbol_mgr, target), expr) {
                let constraint = ZLinearConstraint {
                    expr: ZLinearExpr::var(v) + e.scale(-1),
                    op: CompareOp::Eq,
                };
                let state = ctx.state().clone().add_zlinear_constraint(constraint);
                ctx.set_state(state);
            }
        }
        target
    }

    fn resolve_load(&self, ctx: &mut AnalysisContext<'_, '_>, stmt: StmtRef, operand: StmtRef, src_ty: SymType) {
        let frame = ctx.frame();
        let Some(region) = self.region_of(ctx, operand) else {
            tracing::warn!(target: "knight_analyzer::resolver", ?stmt, "load of a non-region lvalue; conjuring");
            let sym = ctx
                .symbol_mgr
                .get_symbol_conjured(stmt, src_ty, frame, Some("unmodelled_load"));
            let state = ctx.state().clone().set_stmt_sexpr(stmt, frame, sym);
            ctx.set_state(state);
            return;
        };
        let state = ctx.state().clone();
        let def = match state.get_region_def(region, frame) {
            Some(def) => def,
            None => {
                let loc_ctx = ctx.loc_ctx();
                ctx.symbol_mgr.get_region_sym_val(region, loc_ctx, false, src_ty)
            }
        };
        ctx.set_state(state.set_stmt_sexpr(stmt, frame, def));
    }

    fn resolve_cast(
        &self,
        ctx: &mut AnalysisContext<'_, '_>,
        stmt: StmtRef,
        operand: StmtRef,
        src_ty: SymType,
        dst_ty: SymType,
    ) {
        let frame = ctx.frame();
        let state = ctx.state().clone();
        let operand_sym = state.get_stmt_sexpr_or_conjured(ctx.symbol_mgr, operand, frame, src_ty);
        let target = if src_ty.is_integral() && dst_ty.is_integral() && src_ty.width() != dst_ty.width() {
            let cast = ctx.symbol_mgr.get_cast_sym_expr(operand_sym, src_ty, dst_ty);
            ctx.publish(Event::ZVarAssignZCast {
                target: cast,
                operand: operand_sym,
                src_ty,
                dst_ty,
            });
            cast
        } else {
            operand_sym
        };
        ctx.set_state(state.set_stmt_sexpr(stmt, frame, target));
    }

    /// Direct or compound store into `lhs`'s lvalue.
    fn resolve_assignment(
        &self,
        ctx: &mut AnalysisContext<'_, '_>,
        stmt: StmtRef,
        lhs: StmtRef,
        rhs: StmtRef,
        op: BinOp,
        ty: SymType,
    ) {
        let frame = ctx.frame();
        let Some(region) = self.region_of(ctx, lhs) else {
            tracing::warn!(target: "knight_analyzer::resolver", ?stmt, "assignment to a non-region lvalue; conjuring");
            let sym = ctx
                .symbol_mgr
                .get_symbol_conjured(stmt, ty, frame, Some("unmodelled_assign"));
            let state = ctx.state().clone().set_stmt_sexpr(stmt, frame, sym);
            ctx.set_state(state);
            return;
        };
        let state = ctx.state().clone();
        let rhs_val = state.get_stmt_sexpr_or_conjured(ctx.symbol_mgr, rhs, frame, ty);

        let new_val = if op.is_compound_assignment() {
            let current = match state.get_region_def(region, frame) {
                Some(def) => def,
                None => {
                    let loc_ctx = ctx.loc_ctx();
                    ctx.symbol_mgr.get_region_sym_val(region, loc_ctx, false, ty)
                }
            };
            self.publish_numeric_assign(ctx, stmt, current, rhs_val, op.underlying_arith(), ty)
        } else {
            rhs_val
        };

        // `publish_numeric_assign` may have added a constraint to the
        // current state (the compound-assign case); re-read it rather
        // than reusing the snapshot taken before that call.
        let state = ctx.state().clone();
        let state = state.set_region_def(ctx.region_mgr, ctx.symbol_mgr, region, frame, new_val);
        ctx.set_state(state.set_stmt_sexpr(stmt, frame, new_val));
    }

    fn resolve_unary(&self, ctx: &mut AnalysisContext<'_, '_>, stmt: StmtRef, op: UnOp, operand: StmtRef, ty: SymType) {
        let frame = ctx.frame();
        match op {
            UnOp::Not => {
                let state = ctx.state().clone();
                let x = state.get_stmt_sexpr_or_conjured(ctx.symbol_mgr, operand, frame, ty);
                let zero = ctx.symbol_mgr.get_scalar_int(0, ty);
                let target = self.publish_numeric_assign(ctx, stmt, x, zero, BinOp::Eq, ty);
                let state = ctx.state().clone().set_stmt_sexpr(stmt, frame, target);
                ctx.set_state(state);
            }
            UnOp::Plus | UnOp::Minus => {
                let state = ctx.state().clone();
                let x = state.get_stmt_sexpr_or_conjured(ctx.symbol_mgr, operand, frame, ty);
                let zero = ctx.symbol_mgr.get_scalar_int(0, ty);
                let bin_op = if op == UnOp::Plus { BinOp::Add } else { BinOp::Sub };
                let target = self.publish_numeric_assign(ctx, stmt, zero, x, bin_op, ty);
                let state = ctx.state().clone().set_stmt_sexpr(stmt, frame, target);
                ctx.set_state(state);
            }
            UnOp::PreInc | UnOp::PostInc | UnOp::PreDec | UnOp::PostDec => {
                let Some(region) = self.region_of(ctx, operand) else {
                    tracing::warn!(target: "knight_analyzer::resolver", ?stmt, "increment of a non-region lvalue; conjuring");
                    let sym = ctx.symbol_mgr.get_symbol_conjured(stmt, ty, frame, None);
                    let state = ctx.state().clone().set_stmt_sexpr(stmt, frame, sym);
                    ctx.set_state(state);
                    return;
                };
                let state = ctx.state().clone();
                let current = match state.get_region_def(region, frame) {
                    Some(def) => def,
                    None => {
                        let loc_ctx = ctx.loc_ctx();
                        ctx.symbol_mgr.get_region_sym_val(region, loc_ctx, false, ty)
                    }
                };
                let one = ctx.symbol_mgr.get_scalar_int(1, ty);
                let arith = if matches!(op, UnOp::PreInc | UnOp::PostInc) {
                    BinOp::Add
                } else {
                    BinOp::Sub
                };
                let target = self.publish_numeric_assign(ctx, stmt, current, one, arith, ty);
                let state = ctx.state().clone();
                let state = state.set_region_def(ctx.region_mgr, ctx.symbol_mgr, region, frame, target);
                // A post-increment's value is the pre-update one; a
                // pre-increment's is the updated one. Both write `target`
                // into the region regardless.
                let value = if matches!(op, UnOp::PostInc | UnOp::PostDec) {
                    current
                } else {
                    target
                };
                ctx.set_state(state.set_stmt_sexpr(stmt, frame, value));
            }
            UnOp::AddrOf => match self.region_of(ctx, operand) {
                Some(region) => {
                    let addr = ctx.symbol_mgr.get_region_addr(region);
                    let state = ctx.state().clone().set_stmt_sexpr(stmt, frame, addr);
                    ctx.set_state(state);
                }
                None => {
                    tracing::warn!(target: "knight_analyzer::resolver", ?stmt, "address-of a non-region operand; conjuring");
                    let sym = ctx.symbol_mgr.get_symbol_conjured(stmt, ty, frame, None);
                    let state = ctx.state().clone().set_stmt_sexpr(stmt, frame, sym);
                    ctx.set_state(state);
                }
            },
        }
    }

    fn resolve_var_decl(&self, ctx: &mut AnalysisContext<'_, '_>, stmt: StmtRef, var: DeclRef, init: Option<StmtRef>, ty: SymType) {
        self.decl_types.borrow_mut().insert(var, ty);
        let frame = ctx.frame();
        let region = ctx.region_mgr.get_stack_region(var, ty);
        let Some(init) = init else { return };
        let state = ctx.state().clone();
        let init_val = state.get_stmt_sexpr_or_conjured(ctx.symbol_mgr, init, frame, ty);
        let state = state.set_region_def(ctx.region_mgr, ctx.symbol_mgr, region, frame, init_val);
        ctx.set_state(state.set_stmt_sexpr(stmt, frame, init_val));
    }

    /// Ties `target`'s value to `expr` in `state` by an equality
    /// constraint, the same device `publish_numeric_assign` uses to keep
    /// a conjured symbol's algebraic meaning alive across a join.
    fn tie_to_expr(state: ProgramState, target: SymbolId, mgr: &crate::symbol::SymbolManager<'_>, expr: Option<ZLinearExpr>) -> ProgramState {
        match (as_zvariable(mgr, target), expr) {
            (Some(v), Some(e)) => state.add_zlinear_constraint(ZLinearConstraint {
                expr: ZLinearExpr::var(v) + e.scale(-1),
                op: CompareOp::Eq,
            }),
            _ => state,
        }
    }

    /// `c = cond ? then : else`. When both arms already resolve to the
    /// same symbol there is nothing to merge; otherwise a single
    /// conjured symbol stands for `c` in both arms, tied back to each
    /// arm's algebraic value by an equality constraint so the post-join
    /// numerical domain still carries the join of both arms' intervals
    /// instead of losing the value entirely (a naive join of two
    /// disagreeing `stmt_sexpr` entries drops the entry outright).
    fn resolve_conditional(
        &self,
        ctx: &mut AnalysisContext<'_, '_>,
        stmt: StmtRef,
        then_branch: StmtRef,
        else_branch: StmtRef,
        ty: SymType,
    ) {
        let frame = ctx.frame();
        let base = ctx.state().clone();
        let then_val = base.get_stmt_sexpr_or_conjured(ctx.symbol_mgr, then_branch, frame, ty);
        let else_val = base.get_stmt_sexpr_or_conjured(ctx.symbol_mgr, else_branch, frame, ty);
        if then_val == else_val {
            ctx.set_state(base.set_stmt_sexpr(stmt, frame, then_val));
            return;
        }
        let target = ctx.symbol_mgr.get_symbol_conjured(stmt, ty, frame, Some("conditional"));
        let then_expr = as_zexpr(ctx.symbol_mgr, then_val);
        let else_expr = as_zexpr(ctx.symbol_mgr, else_val);
        let state_true = Self::tie_to_expr(base.clone(), target, ctx.symbol_mgr, then_expr).set_stmt_sexpr(stmt, frame, target);
        let state_false = Self::tie_to_expr(base, target, ctx.symbol_mgr, else_expr).set_stmt_sexpr(stmt, frame, target);
        let loc_ctx = ctx.loc_ctx();
        ctx.set_state(state_true.join(&state_false, loc_ctx));
    }

    /// Lifts the already-memoized value of `cond` into the condition
    /// filter a branch-condition predecessor requires: a
    /// variable gets a `!= 0`/`== 0` predicate, a constant short-circuits
    /// to bottom on contradiction, and a comparison adds the (possibly
    /// negated) linear constraint.
    fn filter(&self, ctx: &mut AnalysisContext<'_, '_>, cond: StmtRef, is_true_branch: bool) {
        let frame = ctx.frame();
        let state = ctx.state().clone();
        let Some(cond_sym) = state.get_stmt_sexpr(cond, frame) else {
            return;
        };
        if let Some(n) = as_znum(ctx.symbol_mgr, cond_sym) {
            if (n.0 == 0) == is_true_branch {
                ctx.set_state(ProgramState::bottom());
            }
            return;
        }
        if let Some(v) = as_zvariable(ctx.symbol_mgr, cond_sym) {
            let constraint = ZLinearConstraint {
                expr: ZLinearExpr::var(v),
                op: if is_true_branch { CompareOp::Ne } else { CompareOp::Eq },
            };
            ctx.set_state(state.add_zlinear_constraint(constraint));
            return;
        }
        if let Some(constraint) = as_zconstraint(ctx.symbol_mgr, cond_sym, !is_true_branch) {
            ctx.set_state(state.add_zlinear_constraint(constraint));
        }
    }
}

impl Analysis for SymbolResolverAnalysis {
    fn id(&self) -> AnalysisId {
        SYMBOL_RESOLVER_ID
    }

    fn name(&self) -> &'static str {
        "core.SymbolResolver"
    }

    fn description(&self) -> &'static str {
        "Translates statements into symbolic expressions and region updates"
    }

    fn filter_condition(&self, ctx: &mut AnalysisContext<'_, '_>, cond: StmtRef, is_true_branch: bool) {
        self.filter(ctx, cond, is_true_branch);
    }

    fn eval_stmt(&self, ctx: &mut AnalysisContext<'_, '_>) {
        let Some(stmt) = ctx.stmt() else { return };
        let frame = ctx.frame();
        match ctx.provider().stmt_kind(stmt) {
            StmtKind::IntegerLiteral { value, ty } => {
                let sym = ctx.symbol_mgr.get_scalar_int(value, ty);
                let state = ctx.state().clone().set_stmt_sexpr(stmt, frame, sym);
                ctx.set_state(state);
            }
            StmtKind::DeclRefExpr { .. } => {
                // An lvalue reference is only meaningful once loaded or
                // addressed; those consult `region_of` directly and never
                // need this expression's own `stmt_sexpr` entry.
            }
            StmtKind::ImplicitCast {
                operand,
                is_loading_lvalue,
                src_ty,
                dst_ty,
            } => {
                if is_loading_lvalue {
                    self.resolve_load(ctx, stmt, operand, src_ty);
                } else {
                    self.resolve_cast(ctx, stmt, operand, src_ty, dst_ty);
                }
            }
            StmtKind::UnaryOperator { op, operand, ty } => {
                self.resolve_unary(ctx, stmt, op, operand, ty);
            }
            StmtKind::BinaryOperator { op, lhs, rhs, ty } => {
                if op.is_assignment() {
                    self.resolve_assignment(ctx, stmt, lhs, rhs, op, ty);
                } else if ty.is_pointer() {
                    tracing::warn!(target: "knight_analyzer::resolver", ?stmt, "pointer binary operator has no linear-constraint model; forming symbol only");
                    let state = ctx.state().clone();
                    let lhs_val = state.get_stmt_sexpr_or_conjured(ctx.symbol_mgr, lhs, frame, ty);
                    let rhs_val = state.get_stmt_sexpr_or_conjured(ctx.symbol_mgr, rhs, frame, ty);
                    let bin = ctx.symbol_mgr.get_binary_sym_expr(lhs_val, rhs_val, op, ty);
                    let state = ctx.state().clone().set_stmt_sexpr(stmt, frame, bin);
                    ctx.set_state(state);
                } else {
                    let state = ctx.state().clone();
                    let lhs_val = state.get_stmt_sexpr_or_conjured(ctx.symbol_mgr, lhs, frame, ty);
                    let rhs_val = state.get_stmt_sexpr_or_conjured(ctx.symbol_mgr, rhs, frame, ty);
                    let target = self.publish_numeric_assign(ctx, stmt, lhs_val, rhs_val, op, ty);
                    let state = ctx.state().clone().set_stmt_sexpr(stmt, frame, target);
                    ctx.set_state(state);
                }
            }
            StmtKind::ConditionalOperator {
                then_branch,
                else_branch,
                ty,
                ..
            } => {
                self.resolve_conditional(ctx, stmt, then_branch, else_branch, ty);
            }
            StmtKind::VarDecl { var, init, ty } => {
                self.resolve_var_decl(ctx, stmt, var, init, ty);
            }
            StmtKind::DeclStmt { decls } => {
                for decl_stmt in decls {
                    if let StmtKind::VarDecl { var, init, ty } = ctx.provider().stmt_kind(decl_stmt) {
                        self.resolve_var_decl(ctx, decl_stmt, var, init, ty);
                    }
                }
            }
            StmtKind::CallExpr { ty, .. } => {
                // Calls are opaque to the symbol resolver; a checker that
                // recognizes a particular callee (e.g. the debug
                // inspection checker) reads the pre-call state directly
                // rather than relying on this conjured value.
                let sym = ctx.symbol_mgr.get_symbol_conjured(stmt, ty, frame, Some("call"));
                let state = ctx.state().clone().set_stmt_sexpr(stmt, frame, sym);
                ctx.set_state(state);
            }
            StmtKind::Opaque => {
                tracing::warn!(target: "knight_analyzer::resolver", ?stmt, "unmodelled construct; state left unchanged");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{FrameId, LocCtxId};
    use crate::front_end::synthetic::SyntheticProgram;
    use crate::region::RegionManager;
    use crate::symbol::{SymExpr, SymbolManager};

    #[test]
    fn integer_literal_memoizes_scalar() {
        let bump = bumpalo::Bump::new();
        let mut prog = SyntheticProgram::new();
        let stmt = prog.fresh_stmt(StmtKind::IntegerLiteral {
            value: 10,
            ty: SymType::INT,
        });
        let mut symbol_mgr = SymbolManager::new(&bump);
        let mut region_mgr = RegionManager::new(&bump);
        let resolver = SymbolResolverAnalysis::new();
        let mut ctx = AnalysisContext::new(
            &prog,
            &mut symbol_mgr,
            &mut region_mgr,
            FrameId(0),
            LocCtxId(0),
            Some(stmt),
            ProgramState::top(),
        );
        resolver.eval_stmt(&mut ctx);
        let state = ctx.take_state();
        let sym = state.get_stmt_sexpr(stmt, FrameId(0)).unwrap();
        assert!(matches!(symbol_mgr.get(sym), SymExpr::ScalarInt { value: 10, .. }));
    }

    #[test]
    fn load_of_undefined_region_conjures_a_region_sym_val() {
        let bump = bumpalo::Bump::new();
        let mut prog = SyntheticProgram::new();
        let decl = DeclRef(0);
        let decl_ref = prog.fresh_stmt(StmtKind::DeclRefExpr { decl });
        let load = prog.fresh_stmt(StmtKind::ImplicitCast {
            operand: decl_ref,
            is_loading_lvalue: true,
            src_ty: SymType::INT,
            dst_ty: SymType::INT,
        });

        let mut symbol_mgr = SymbolManager::new(&bump);
        let mut region_mgr = RegionManager::new(&bump);
        let resolver = SymbolResolverAnalysis::new();
        resolver.decl_types.borrow_mut().insert(decl, SymType::INT);

        let mut ctx = AnalysisContext::new(
            &prog,
            &mut symbol_mgr,
            &mut region_mgr,
            FrameId(0),
            LocCtxId(0),
            Some(load),
            ProgramState::top(),
        );
        resolver.eval_stmt(&mut ctx);
        let state = ctx.take_state();
        let sym = state.get_stmt_sexpr(load, FrameId(0));
        assert!(sym.is_some());
        assert!(matches!(symbol_mgr.get(sym.unwrap()), SymExpr::RegionSymVal { .. }));
    }

    #[test]
    fn assignment_stores_into_region_and_memoizes_value() {
        let bump = bumpalo::Bump::new();
        let mut prog = SyntheticProgram::new();
        let decl = DeclRef(0);
        let lhs_ref = prog.fresh_stmt(StmtKind::DeclRefExpr { decl });
        let rhs_lit = prog.fresh_stmt(StmtKind::IntegerLiteral {
            value: 42,
            ty: SymType::INT,
        });
        let assign = prog.fresh_stmt(StmtKind::BinaryOperator {
            op: BinOp::Assign,
            lhs: lhs_ref,
            rhs: rhs_lit,
            ty: SymType::INT,
        });

        let mut symbol_mgr = SymbolManager::new(&bump);
        let mut region_mgr = RegionManager::new(&bump);
        let resolver = SymbolResolverAnalysis::new();
        resolver.decl_types.borrow_mut().insert(decl, SymType::INT);
        let region = region_mgr.get_stack_region(decl, SymType::INT);

        // Resolve the rhs literal first so it has a memoized `stmt_sexpr`.
        let mut ctx = AnalysisContext::new(
            &prog,
            &mut symbol_mgr,
            &mut region_mgr,
            FrameId(0),
            LocCtxId(0),
            Some(rhs_lit),
            ProgramState::top(),
        );
        resolver.eval_stmt(&mut ctx);
        let state = ctx.take_state();

        let mut ctx = AnalysisContext::new(
            &prog,
            &mut symbol_mgr,
            &mut region_mgr,
            FrameId(0),
            LocCtxId(0),
            Some(assign),
            state,
        );
        resolver.eval_stmt(&mut ctx);
        let state = ctx.take_state();

        let stored = state.get_region_def(region, FrameId(0)).unwrap();
        assert!(matches!(symbol_mgr.get(stored), SymExpr::ScalarInt { value: 42, .. }));
        assert_eq!(state.get_stmt_sexpr(assign, FrameId(0)), Some(stored));
    }

    #[test]
    fn pointer_binary_operator_still_forms_and_memoizes_a_symbol() {
        let bump = bumpalo::Bump::new();
        let mut prog = SyntheticProgram::new();
        let lhs = prog.fresh_stmt(StmtKind::IntegerLiteral {
            value: 0,
            ty: SymType::Pointer,
        });
        let rhs = prog.fresh_stmt(StmtKind::IntegerLiteral {
            value: 4,
            ty: SymType::INT,
        });
        let add = prog.fresh_stmt(StmtKind::BinaryOperator {
            op: BinOp::Add,
            lhs,
            rhs,
            ty: SymType::Pointer,
        });

        let mut symbol_mgr = SymbolManager::new(&bump);
        let mut region_mgr = RegionManager::new(&bump);
        let resolver = SymbolResolverAnalysis::new();

        let mut ctx = AnalysisContext::new(
            &prog,
            &mut symbol_mgr,
            &mut region_mgr,
            FrameId(0),
            LocCtxId(0),
            Some(lhs),
            ProgramState::top(),
        );
        resolver.eval_stmt(&mut ctx);
        let state = ctx.take_state();

        let mut ctx = AnalysisContext::new(
            &prog,
            &mut symbol_mgr,
            &mut region_mgr,
            FrameId(0),
            LocCtxId(0),
            Some(add),
            state,
        );
        resolver.eval_stmt(&mut ctx);
        let state = ctx.take_state();

        let sym = state.get_stmt_sexpr(add, FrameId(0));
        assert!(sym.is_some(), "pointer binary op must still memoize a stmt_sexpr");
        assert!(matches!(symbol_mgr.get(sym.unwrap()), SymExpr::BinarySymExpr { .. }));
    }
}
