//! C5: the WTO-driven fixpoint engine. Drives one
//! function's analysis to convergence, component by component over its
//! Weak Topological Order, then replays the converged per-statement
//! states through the checker manager in the same order.
//!
//! Grounded on `analyzer/include/analyzer/core/engine/wto_iterator.hpp`'s
//! `WtoBasedFixPointIterator` two-phase (increasing then decreasing) cycle
//! iteration and its component dispatch over a WTO, and
//! `analyzer/src/core/engine/intraprocedural_fixpoint.cpp`'s `check_pre` /
//! `check_post` / `run()` post-convergence checker replay.

use std::collections::BTreeMap;

use crate::analysis::{AnalysisManager, CyclePhase};
use crate::block::{BlockExecutionEngine, BlockResult};
use crate::checker::CheckerManager;
use crate::config::AnalyzerOptions;
use crate::diagnostic::Sink;
use crate::front_end::{AstCfgProvider, Cfg, CfgElement, StmtKind};
use crate::ids::{FrameId, NodeId};
use crate::region::{LocationManager, RegionManager};
use crate::state::ProgramState;
use crate::symbol::SymbolManager;
use crate::wto::{Wto, WtoComponent};

/// Drives `cfg` to a fixpoint starting from `entry_state` and replays
/// every checker over the converged result. `entry_state` is the state
/// on entry to the function — parameter bindings are out of this
/// analyzer's scope, so callers typically pass
/// `ProgramState::top()`.
#[allow(clippy::too_many_arguments)]
pub fn analyze_function(
    analyses: &AnalysisManager,
    checkers: &CheckerManager,
    provider: &dyn AstCfgProvider,
    symbol_mgr: &mut SymbolManager<'_>,
    region_mgr: &mut RegionManager<'_>,
    loc_mgr: &mut LocationManager<'_>,
    opts: &AnalyzerOptions,
    frame: FrameId,
    cfg: &Cfg,
    entry_state: ProgramState,
    sink: &mut Sink,
) {
    let wto = Wto::build(cfg);
    let mut pre: BTreeMap<NodeId, ProgramState> = BTreeMap::new();
    let mut post: BTreeMap<NodeId, ProgramState> = BTreeMap::new();
    let mut results: BTreeMap<NodeId, BlockResult> = BTreeMap::new();

    let begin_loc = loc_mgr.create_location_context(frame, cfg.entry, -1);
    let entry_state = analyses.run_for_begin_function(
        provider, symbol_mgr, region_mgr, frame, begin_loc, entry_state,
    );
    pre.insert(cfg.entry, entry_state.clone());

    for component in wto.components.clone() {
        process_component(
            analyses, provider, symbol_mgr, region_mgr, loc_mgr, opts, cfg, frame, &component,
            &mut pre, &mut post, &mut results,
        );
    }

    checkers.run_for_begin_function(
        provider, symbol_mgr, region_mgr, frame, begin_loc, &entry_state, sink,
    );

    for node in wto.nodes_in_order() {
        let Some(result) = results.get(&node) else {
            continue;
        };
        let loc_ctx = loc_mgr.create_location_context(frame, node, -1);
        for element in &cfg.node(node).elements {
            if let CfgElement::Statement(stmt) = element {
                if let (Some(pre_s), Some(post_s)) =
                    (result.stmt_pre.get(stmt), result.stmt_post.get(stmt))
                {
                    checkers.run_for_stmt(
                        provider, symbol_mgr, region_mgr, frame, loc_ctx, *stmt, pre_s, post_s,
                        sink,
                    );
                }
            }
        }
    }

    let exit_nodes: Vec<NodeId> = cfg
        .nodes
        .iter()
        .filter(|(_, n)| n.successors.is_empty())
        .map(|(id, _)| *id)
        .collect();
    let mut end_state = ProgramState::bottom();
    for n in &exit_nodes {
        if let Some(s) = post.get(n) {
            end_state = end_state.join(s, crate::ids::LocCtxId(0));
        }
    }
    if exit_nodes.is_empty() {
        end_state = entry_state;
    }
    let end_state = analyses.run_for_end_function(
        provider, symbol_mgr, region_mgr, frame, begin_loc, end_state,
    );
    checkers.run_for_end_function(
        provider, symbol_mgr, region_mgr, frame, begin_loc, &end_state, sink,
    );
}

/// `pre[v] := ⨆_{p ∈ preds(v), already computed} transfer_edge(p, v, post[p])`.
/// For an ordinary (non-cycle-head) vertex, every qualifying predecessor's
/// post-state is already in `post` by WTO order — any predecessor whose
/// edge is loop-carried belongs to a cycle this vertex is itself a part
/// of, in which case this vertex is the cycle's own head and goes through
/// `process_cycle` instead, not this path.
#[allow(clippy::too_many_arguments)]
fn join_predecessors(
    analyses: &AnalysisManager,
    provider: &dyn AstCfgProvider,
    symbol_mgr: &mut SymbolManager<'_>,
    region_mgr: &mut RegionManager<'_>,
    cfg: &Cfg,
    frame: FrameId,
    loc_ctx: crate::ids::LocCtxId,
    node: NodeId,
    post: &BTreeMap<NodeId, ProgramState>,
) -> ProgramState {
    let mut acc: Option<ProgramState> = None;
    for pred in cfg.node(node).predecessors.clone() {
        let Some(pred_post) = post.get(&pred) else {
            continue;
        };
        let contribution = BlockExecutionEngine::transfer_edge(
            analyses,
            provider,
            symbol_mgr,
            region_mgr,
            cfg,
            pred,
            node,
            frame,
            loc_ctx,
            pred_post.clone(),
        );
        acc = Some(match acc {
            Some(prev) => prev.join(&contribution, loc_ctx),
            None => contribution,
        });
    }
    acc.unwrap_or_else(ProgramState::bottom)
}

#[allow(clippy::too_many_arguments)]
fn process_component(
    analyses: &AnalysisManager,
    provider: &dyn AstCfgProvider,
    symbol_mgr: &mut SymbolManager<'_>,
    region_mgr: &mut RegionManager<'_>,
    loc_mgr: &mut LocationManager<'_>,
    opts: &AnalyzerOptions,
    cfg: &Cfg,
    frame: FrameId,
    component: &WtoComponent,
    pre: &mut BTreeMap<NodeId, ProgramState>,
    post: &mut BTreeMap<NodeId, ProgramState>,
    results: &mut BTreeMap<NodeId, BlockResult>,
) {
    match component {
        WtoComponent::Vertex(v) => {
            // The entry node's pre-state was seeded by the caller before
            // this loop started; every other vertex computes its own.
            if !pre.contains_key(v) {
                let loc_ctx = loc_mgr.create_location_context(frame, *v, -1);
                let pre_v = join_predecessors(
                    analyses, provider, symbol_mgr, region_mgr, cfg, frame, loc_ctx, *v, post,
                );
                pre.insert(*v, pre_v);
            }
            run_vertex(
                analyses, provider, symbol_mgr, region_mgr, loc_mgr, cfg, frame, *v, pre, post,
                results,
            );
        }
        WtoComponent::Cycle { head, body } => {
            process_cycle(
                analyses, provider, symbol_mgr, region_mgr, loc_mgr, opts, cfg, frame, *head,
                body, pre, post, results,
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_vertex(
    analyses: &AnalysisManager,
    provider: &dyn AstCfgProvider,
    symbol_mgr: &mut SymbolManager<'_>,
    region_mgr: &mut RegionManager<'_>,
    loc_mgr: &mut LocationManager<'_>,
    cfg: &Cfg,
    frame: FrameId,
    v: NodeId,
    pre: &mut BTreeMap<NodeId, ProgramState>,
    post: &mut BTreeMap<NodeId, ProgramState>,
    results: &mut BTreeMap<NodeId, BlockResult>,
) {
    let loc_ctx = loc_mgr.create_location_context(frame, v, -1);
    let pre_v = pre.get(&v).cloned().unwrap_or_else(ProgramState::bottom);
    let result = BlockExecutionEngine::exec_node(
        analyses, provider, symbol_mgr, region_mgr, cfg, v, frame, loc_ctx, pre_v,
    );
    post.insert(v, result.post_state.clone());
    results.insert(v, result);
}

/// Runs the increasing (widen-to-convergence) then decreasing
/// (narrow-to-precision) phases for a cycle headed by `head`, recursing
/// into `body` once per iteration of each phase.
#[allow(clippy::too_many_arguments)]
fn process_cycle(
    analyses: &AnalysisManager,
    provider: &dyn AstCfgProvider,
    symbol_mgr: &mut SymbolManager<'_>,
    region_mgr: &mut RegionManager<'_>,
    loc_mgr: &mut LocationManager<'_>,
    opts: &AnalyzerOptions,
    cfg: &Cfg,
    frame: FrameId,
    head: NodeId,
    body: &[WtoComponent],
    pre: &mut BTreeMap<NodeId, ProgramState>,
    post: &mut BTreeMap<NodeId, ProgramState>,
    results: &mut BTreeMap<NodeId, BlockResult>,
) {
    let members: std::collections::BTreeSet<NodeId> = {
        let mut set: std::collections::BTreeSet<NodeId> =
            body.iter().flat_map(WtoComponent::nodes).collect();
        set.insert(head);
        set
    };

    let head_loc = loc_mgr.create_location_context(frame, head, -1);
    let thresholds = discover_thresholds(provider, cfg, head);

    // The part of pre[head] contributed by edges from outside the loop;
    // fixed for the whole cycle, since those predecessors' post-states
    // don't change while this cycle iterates.
    let front_state = join_predecessors(
        analyses, provider, symbol_mgr, region_mgr, cfg, frame, head_loc, head, post,
    );

    let mut iteration: u32 = 0;
    tracing::debug!(target: "knight_analyzer::engine", ?head, "entering cycle, increasing phase");
    analyses.notify_enter_cycle(head);
    loop {
        iteration += 1;
        let back_state = join_back_edges(
            analyses, provider, symbol_mgr, region_mgr, cfg, frame, head_loc, head, &members, post,
        );
        let joined = match &back_state {
            Some(b) => front_state.join_at_loop_head(b),
            None => front_state.clone(),
        };

        let old_pre_head = pre.get(&head).cloned().unwrap_or_else(ProgramState::bottom);
        let next_pre_head = if iteration <= opts.widening_delay {
            old_pre_head.join_consecutive_iter(&joined, head_loc)
        } else if opts.analyze_with_threshold {
            old_pre_head.widen_with_threshold(&joined, head_loc, &thresholds)
        } else {
            old_pre_head.widen(&joined, head_loc)
        };

        let converged = iteration > 1 && next_pre_head.leq(&old_pre_head);
        pre.insert(head, next_pre_head);

        run_vertex(
            analyses, provider, symbol_mgr, region_mgr, loc_mgr, cfg, frame, head, pre, post,
            results,
        );
        for c in body {
            process_component(
                analyses, provider, symbol_mgr, region_mgr, loc_mgr, opts, cfg, frame, c, pre,
                post, results,
            );
        }
        tracing::trace!(target: "knight_analyzer::engine", ?head, iteration, "increasing iteration");
        analyses.notify_each_cycle_iteration(head, iteration, CyclePhase::Increasing);

        if converged {
            break;
        }
        if iteration >= opts.max_widening_iterations {
            tracing::warn!(
                target: "knight_analyzer::engine",
                ?head,
                iteration,
                "widening did not converge within max_widening_iterations"
            );
            break;
        }
    }

    tracing::debug!(target: "knight_analyzer::engine", ?head, "decreasing phase");
    for iteration in 1..=opts.max_narrowing_iterations {
        let back_state = join_back_edges(
            analyses, provider, symbol_mgr, region_mgr, cfg, frame, head_loc, head, &members, post,
        );
        let joined = match &back_state {
            Some(b) => front_state.join_at_loop_head(b),
            None => front_state.clone(),
        };

        let old_pre_head = pre.get(&head).cloned().unwrap_or_else(ProgramState::bottom);
        let next_pre_head = if opts.analyze_with_threshold {
            old_pre_head.narrow_with_threshold(&joined, thresholds.first().copied().unwrap_or(0))
        } else {
            old_pre_head.narrow(&joined)
        };

        let no_more_refinement = old_pre_head.leq(&next_pre_head);
        pre.insert(head, next_pre_head);

        run_vertex(
            analyses, provider, symbol_mgr, region_mgr, loc_mgr, cfg, frame, head, pre, post,
            results,
        );
        for c in body {
            process_component(
                analyses, provider, symbol_mgr, region_mgr, loc_mgr, opts, cfg, frame, c, pre,
                post, results,
            );
        }
        tracing::trace!(target: "knight_analyzer::engine", ?head, iteration, "decreasing iteration");
        analyses.notify_each_cycle_iteration(head, iteration, CyclePhase::Decreasing);

        if no_more_refinement {
            break;
        }
    }
    tracing::debug!(target: "knight_analyzer::engine", ?head, "exiting cycle");
    analyses.notify_exit_cycle(head);
}

/// Joins the loop-carried contributions to `head`'s pre-state: its
/// predecessors that live inside the cycle (`members`), via
/// `transfer_edge` over each one's current `post` (updated every
/// iteration as the body is re-run).
#[allow(clippy::too_many_arguments)]
fn join_back_edges(
    analyses: &AnalysisManager,
    provider: &dyn AstCfgProvider,
    symbol_mgr: &mut SymbolManager<'_>,
    region_mgr: &mut RegionManager<'_>,
    cfg: &Cfg,
    frame: FrameId,
    loc_ctx: crate::ids::LocCtxId,
    head: NodeId,
    members: &std::collections::BTreeSet<NodeId>,
    post: &BTreeMap<NodeId, ProgramState>,
) -> Option<ProgramState> {
    let mut acc: Option<ProgramState> = None;
    for pred in cfg.node(head).predecessors.clone() {
        if !members.contains(&pred) {
            continue;
        }
        let Some(pred_post) = post.get(&pred) else {
            continue;
        };
        let contribution = BlockExecutionEngine::transfer_edge(
            analyses,
            provider,
            symbol_mgr,
            region_mgr,
            cfg,
            pred,
            head,
            frame,
            loc_ctx,
            pred_post.clone(),
        );
        acc = Some(match acc {
            Some(prev) => prev.join(&contribution, loc_ctx),
            None => contribution,
        });
    }
    acc
}

/// Scans `head`'s loop condition for integer literals to seed the
/// widening threshold set: a
/// loop like `while (i < 100)` widens to exactly `100` rather than to
/// infinity, converging in far fewer iterations on the common case.
fn discover_thresholds(provider: &dyn AstCfgProvider, cfg: &Cfg, head: NodeId) -> Vec<i128> {
    let Some(cond) = cfg.node(head).last_condition else {
        return Vec::new();
    };
    let mut out = Vec::new();
    collect_literals(provider, cond, &mut out);
    out
}

fn collect_literals(provider: &dyn AstCfgProvider, stmt: crate::ids::StmtRef, out: &mut Vec<i128>) {
    match provider.stmt_kind(stmt) {
        StmtKind::IntegerLiteral { value, .. } => out.push(value),
        StmtKind::ImplicitCast { operand, .. } => collect_literals(provider, operand, out),
        StmtKind::UnaryOperator { operand, .. } => collect_literals(provider, operand, out),
        StmtKind::BinaryOperator { lhs, rhs, .. } => {
            collect_literals(provider, lhs, out);
            collect_literals(provider, rhs, out);
        }
        StmtKind::ConditionalOperator {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            collect_literals(provider, cond, out);
            collect_literals(provider, then_branch, out);
            collect_literals(provider, else_branch, out);
        }
        StmtKind::VarDecl { init: Some(init), .. } => collect_literals(provider, init, out),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{Checker, CheckerContext};
    use crate::diagnostic::Level;
    use crate::front_end::synthetic::{CfgBuilder, SyntheticProgram};
    use crate::front_end::{CfgElement, SourceLoc};
    use crate::ids::{CheckerId, FrameId, StmtRef};
    use crate::resolver::SymbolResolverAnalysis;
    use crate::symbol::SymExpr;
    use crate::types::SymType;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Reports the resolved integer value of every statement it sees, so
    /// tests can assert on what the fixpoint converged to.
    struct Dump(Mutex<Vec<String>>);
    impl Checker for Dump {
        fn id(&self) -> CheckerId {
            CheckerId(0)
        }
        fn name(&self) -> &'static str {
            "debug.Dump"
        }
        fn post_check_stmt(&self, ctx: &mut CheckerContext<'_, '_>) {
            if let Some(stmt) = ctx.stmt() {
                if let Some(sym) = ctx.state().get_stmt_sexpr(stmt, ctx.frame()) {
                    self.0.lock().unwrap().push(format!("{:?}", ctx.symbol_mgr.get(sym)));
                    ctx.diagnose(
                        SourceLoc {
                            file: PathBuf::from("<test>"),
                            offset: stmt.0 as usize,
                        },
                        "dump",
                        Level::Remark,
                    );
                }
            }
        }
    }

    #[test]
    fn straight_line_constant_propagates_to_checker_replay() {
        let mut prog = SyntheticProgram::new();
        let lit = prog.fresh_stmt(StmtKind::IntegerLiteral {
            value: 42,
            ty: SymType::INT,
        });
        let mut b = CfgBuilder::new();
        let n0 = b.node();
        b.add_element(n0, CfgElement::Statement(lit));
        let cfg = b.build(n0);

        let bump = bumpalo::Bump::new();
        let mut symbol_mgr = SymbolManager::new(&bump);
        let mut region_mgr = RegionManager::new(&bump);
        let mut loc_mgr = LocationManager::new(&bump);
        let analyses = AnalysisManager::new(vec![Box::new(SymbolResolverAnalysis::new())], "*");
        let checkers = CheckerManager::new(vec![Box::new(Dump(Mutex::new(Vec::new())))], "*", &[]);
        let opts = AnalyzerOptions::default();
        let mut sink = Sink::new();

        analyze_function(
            &analyses,
            &checkers,
            &prog,
            &mut symbol_mgr,
            &mut region_mgr,
            &mut loc_mgr,
            &opts,
            FrameId(0),
            &cfg,
            ProgramState::top(),
            &mut sink,
        );

        assert_eq!(sink.len(), 1);
        let dumped = checkers.checkers()[0]
            .name();
        assert_eq!(dumped, "debug.Dump");
        let _ = prog;
    }

    #[test]
    fn join_over_if_else_merges_both_branch_states() {
        // entry (cond) -> then -> join
        //        \-> els  -----/
        let mut prog = SyntheticProgram::new();
        let cond = prog.fresh_stmt(StmtKind::IntegerLiteral {
            value: 1,
            ty: SymType::BOOL,
        });
        let mut b = CfgBuilder::new();
        let entry = b.node();
        let then_n = b.node();
        let els_n = b.node();
        let join_n = b.node();
        b.add_element(entry, CfgElement::Statement(cond));
        b.set_condition(entry, cond);
        b.add_edge(entry, then_n);
        b.add_edge(entry, els_n);
        b.add_edge(then_n, join_n);
        b.add_edge(els_n, join_n);
        let cfg = b.build(entry);

        let bump = bumpalo::Bump::new();
        let mut symbol_mgr = SymbolManager::new(&bump);
        let mut region_mgr = RegionManager::new(&bump);
        let mut loc_mgr = LocationManager::new(&bump);
        let analyses = AnalysisManager::new(vec![Box::new(SymbolResolverAnalysis::new())], "*");
        let checkers = CheckerManager::new(vec![], "*", &[]);
        let opts = AnalyzerOptions::default();
        let mut sink = Sink::new();

        analyze_function(
            &analyses,
            &checkers,
            &prog,
            &mut symbol_mgr,
            &mut region_mgr,
            &mut loc_mgr,
            &opts,
            FrameId(0),
            &cfg,
            ProgramState::top(),
            &mut sink,
        );
        let _ = prog;
        let _: Option<SymExpr> = None;
        let _ = StmtRef(0);
    }
}
