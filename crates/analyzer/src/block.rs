//! C6: the block execution engine. Two pieces the fixpoint engine (C5)
//! composes per WTO vertex: `transfer_edge`, the branch-condition filter
//! applied to one predecessor's contribution, and `exec_node`, which runs a node's statements pre →
//! eval → post,
//! producing the node's post-state plus the per-statement snapshot maps
//! the checker replay (driven from the fixpoint engine) consumes after
//! convergence.
//!
//! Grounded on `analyzer/src/core/engine/block_engine.cpp`'s `exec_cfg_stmt`
//! shape.

use std::collections::BTreeMap;

use crate::analysis::{AnalysisManager, StmtPhase};
use crate::front_end::{AstCfgProvider, Cfg, CfgElement};
use crate::ids::{FrameId, LocCtxId, NodeId, StmtRef};
use crate::region::RegionManager;
use crate::state::ProgramState;
use crate::symbol::SymbolManager;

/// The result of executing one node: the state flowing to its successors,
/// plus the pre/post snapshot of every statement it contains.
pub struct BlockResult {
    pub post_state: ProgramState,
    pub stmt_pre: BTreeMap<StmtRef, ProgramState>,
    pub stmt_post: BTreeMap<StmtRef, ProgramState>,
}

pub struct BlockExecutionEngine;

impl BlockExecutionEngine {
    /// `transfer_edge(pred, succ, post[pred])`: applies the
    /// branch-condition filter when `pred` is a two-way branch with a
    /// `last_condition`, else passes `pred_post` through unchanged. Called
    /// once per qualifying predecessor edge by the fixpoint engine, which
    /// joins the results to form a node's `pre` state — a node with several
    /// predecessors gets one filtered contribution per incoming edge, not
    /// one filter applied to an already-joined state.
    #[allow(clippy::too_many_arguments)]
    pub fn transfer_edge(
        analyses: &AnalysisManager,
        provider: &dyn AstCfgProvider,
        symbol_mgr: &mut SymbolManager<'_>,
        region_mgr: &mut RegionManager<'_>,
        cfg: &Cfg,
        pred: NodeId,
        succ: NodeId,
        frame: FrameId,
        loc_ctx: LocCtxId,
        pred_post: ProgramState,
    ) -> ProgramState {
        let pred_node = cfg.node(pred);
        if pred_node.successors.len() != 2 {
            return pred_post;
        }
        let Some(cond) = pred_node.last_condition else {
            return pred_post;
        };
        let is_true_branch = pred_node.successors[0] == succ;
        analyses.run_for_condition_filter(
            provider,
            symbol_mgr,
            region_mgr,
            frame,
            loc_ctx,
            cond,
            is_true_branch,
            pred_post,
        )
    }

    /// `transfer_node(node, pre)`: runs `node`'s elements in
    /// order starting from the already-filtered-and-joined `pre` state.
    #[allow(clippy::too_many_arguments)]
    pub fn exec_node(
        analyses: &AnalysisManager,
        provider: &dyn AstCfgProvider,
        symbol_mgr: &mut SymbolManager<'_>,
        region_mgr: &mut RegionManager<'_>,
        cfg: &Cfg,
        node: NodeId,
        frame: FrameId,
        loc_ctx: LocCtxId,
        pre: ProgramState,
    ) -> BlockResult {
        let mut state = pre;
        let mut stmt_pre = BTreeMap::new();
        let mut stmt_post = BTreeMap::new();

        for element in cfg.node(node).elements.clone() {
            match element {
                CfgElement::Statement(stmt) => {
                    stmt_pre.insert(stmt, state.clone());
                    state = analyses.run_for_stmt(
                        provider, symbol_mgr, region_mgr, frame, loc_ctx, stmt, state,
                        StmtPhase::Pre,
                    );
                    state = analyses.run_for_stmt(
                        provider, symbol_mgr, region_mgr, frame, loc_ctx, stmt, state,
                        StmtPhase::Eval,
                    );
                    state = analyses.run_for_stmt(
                        provider, symbol_mgr, region_mgr, frame, loc_ctx, stmt, state,
                        StmtPhase::Post,
                    );
                    stmt_post.insert(stmt, state.clone());
                }
                CfgElement::Initializer
                | CfgElement::ScopeBegin
                | CfgElement::ScopeEnd
                | CfgElement::NewAllocator
                | CfgElement::LifetimeEnds => {
                    // Extension points  lists alongside
                    // `Statement` but that no registered analysis needs
                    // yet; left as no-ops.
                }
                CfgElement::Constructor
                | CfgElement::Destructor
                | CfgElement::CleanupFunction
                | CfgElement::LoopExit => {
                    tracing::warn!(
                        target: "knight_analyzer::block",
                        ?node,
                        ?element,
                        "unmodelled CFG element; state left unchanged"
                    );
                }
            }
        }

        BlockResult {
            post_state: state,
            stmt_pre,
            stmt_post,
        }
    }

    /// Convenience for a node with at most one predecessor: folds
    /// `transfer_edge` over it (if any) and runs `exec_node` — the common
    /// case most CFG nodes outside a join point hit.
    #[allow(clippy::too_many_arguments)]
    pub fn exec_node_with_unique_pred(
        analyses: &AnalysisManager,
        provider: &dyn AstCfgProvider,
        symbol_mgr: &mut SymbolManager<'_>,
        region_mgr: &mut RegionManager<'_>,
        cfg: &Cfg,
        node: NodeId,
        frame: FrameId,
        loc_ctx: LocCtxId,
        incoming: ProgramState,
    ) -> BlockResult {
        let pre = match cfg.unique_pred(node) {
            Some(pred) => Self::transfer_edge(
                analyses, provider, symbol_mgr, region_mgr, cfg, pred, node, frame, loc_ctx,
                incoming,
            ),
            None => incoming,
        };
        Self::exec_node(
            analyses, provider, symbol_mgr, region_mgr, cfg, node, frame, loc_ctx, pre,
        )
    }
}
