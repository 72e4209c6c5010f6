//! C8 (analysis half): the `Analysis` trait every transfer-function
//! contributor implements, the context threaded through its callbacks, and
//! the manager that resolves the enabled set plus its dependency closure
//! and dispatches callbacks/events in registration order.
//!
//! Grounded on `include/dfa/checker_manager.hpp`'s callback-table shape
//! and the design note replacing the source's CRTP mixins with
//! "tagged variants plus a small trait/interface ... each defaulted to
//! no-op. Registration is data-driven."

use crate::config::matches_glob_list;
use crate::events::Event;
use crate::front_end::AstCfgProvider;
use crate::ids::{AnalysisId, FrameId, LocCtxId, NodeId, StmtRef};
use crate::region::RegionManager;
use crate::state::ProgramState;
use crate::symbol::SymbolManager;

/// Which phase of a cycle's two-phase iteration `notify_each_cycle_iteration`
/// is reporting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Increasing,
    Decreasing,
}

/// Threaded through every `Analysis` callback: the current state (owned,
/// swapped via `set_state`), the managers needed to resolve/construct
/// symbols and regions, and an outgoing event queue the manager drains
/// after each callback.
pub struct AnalysisContext<'a, 'b> {
    provider: &'a dyn AstCfgProvider,
    pub symbol_mgr: &'a mut SymbolManager<'b>,
    pub region_mgr: &'a mut RegionManager<'b>,
    frame: FrameId,
    loc_ctx: LocCtxId,
    stmt: Option<StmtRef>,
    state: ProgramState,
    events: Vec<Event>,
}

impl<'a, 'b> AnalysisContext<'a, 'b> {
    pub fn new(
        provider: &'a dyn AstCfgProvider,
        symbol_mgr: &'a mut SymbolManager<'b>,
        region_mgr: &'a mut RegionManager<'b>,
        frame: FrameId,
        loc_ctx: LocCtxId,
        stmt: Option<StmtRef>,
        state: ProgramState,
    ) -> Self {
        Self {
            provider,
            symbol_mgr,
            region_mgr,
            frame,
            loc_ctx,
            stmt,
            state,
            events: Vec::new(),
        }
    }

    pub fn provider(&self) -> &'a dyn AstCfgProvider {
        self.provider
    }

    pub fn frame(&self) -> FrameId {
        self.frame
    }

    pub fn loc_ctx(&self) -> LocCtxId {
        self.loc_ctx
    }

    pub fn stmt(&self) -> Option<StmtRef> {
        self.stmt
    }

    pub fn state(&self) -> &ProgramState {
        &self.state
    }

    pub fn set_state(&mut self, state: ProgramState) {
        self.state = state;
    }

    pub fn publish(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_state(self) -> ProgramState {
        self.state
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

/// An analysis contributing to, or observing, the per-statement transfer
/// functions. Every method defaults to a no-op so an analysis only
/// overrides what it needs.
pub trait Analysis {
    fn id(&self) -> AnalysisId;
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str {
        ""
    }
    /// Other analyses this one's callbacks rely on having already run this
    /// phase; resolved into a transitive closure by `AnalysisManager::new`
    /// regardless of whether the dependency itself matched the enabled
    /// glob.
    fn dependencies(&self) -> &'static [AnalysisId] {
        &[]
    }

    fn analyze_begin_function(&self, _ctx: &mut AnalysisContext<'_, '_>) {}
    fn analyze_end_function(&self, _ctx: &mut AnalysisContext<'_, '_>) {}
    fn filter_condition(
        &self,
        _ctx: &mut AnalysisContext<'_, '_>,
        _cond: StmtRef,
        _is_true_branch: bool,
    ) {
    }
    fn pre_analyze_stmt(&self, _ctx: &mut AnalysisContext<'_, '_>) {}
    fn eval_stmt(&self, _ctx: &mut AnalysisContext<'_, '_>) {}
    fn post_analyze_stmt(&self, _ctx: &mut AnalysisContext<'_, '_>) {}
    fn handle_event(&self, _event: &Event, _ctx: &mut AnalysisContext<'_, '_>) {}

    /// The fixpoint engine is about to start iterating the cycle headed by
    /// `head`.
    fn notify_enter_cycle(&self, _head: NodeId) {}
    /// The fixpoint engine just finished iteration `k` of `phase` for the
    /// cycle headed by `head`.
    fn notify_each_cycle_iteration(&self, _head: NodeId, _k: u32, _phase: CyclePhase) {}
    /// The cycle headed by `head` converged (or hit its iteration bound) and
    /// the engine is moving on.
    fn notify_exit_cycle(&self, _head: NodeId) {}
}

/// Which statement-transfer phase a callback batch belongs to, matching
/// `block_engine.cpp::exec_cfg_stmt`'s fixed pre → eval → post order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtPhase {
    Pre,
    Eval,
    Post,
}

/// Registers analyses, computes the enabled set and its dependency
/// closure, and drives the pre/eval/post/event dispatch the block
/// execution engine (C6) calls into.
pub struct AnalysisManager {
    analyses: Vec<Box<dyn Analysis>>,
}

impl AnalysisManager {
    /// `enabled_glob` is the `--analyses` mini-language;
    /// analyses not matching it are dropped unless some enabled analysis
    /// transitively depends on them.
    pub fn new(all: Vec<Box<dyn Analysis>>, enabled_glob: &str) -> Self {
        let mut enabled: std::collections::BTreeSet<u32> = all
            .iter()
            .filter(|a| matches_glob_list(enabled_glob, a.name()))
            .map(|a| a.id().0)
            .collect();

        // Fixed-point closure over dependencies.
        loop {
            let mut added = false;
            for a in &all {
                if enabled.contains(&a.id().0) {
                    for dep in a.dependencies() {
                        if enabled.insert(dep.0) {
                            added = true;
                        }
                    }
                }
            }
            if !added {
                break;
            }
        }

        let analyses = all
            .into_iter()
            .filter(|a| enabled.contains(&a.id().0))
            .collect();
        Self { analyses }
    }

    pub fn analyses(&self) -> &[Box<dyn Analysis>] {
        &self.analyses
    }

    fn dispatch_events(
        &self,
        provider: &dyn AstCfgProvider,
        symbol_mgr: &mut SymbolManager<'_>,
        region_mgr: &mut RegionManager<'_>,
        frame: FrameId,
        loc_ctx: LocCtxId,
        stmt: Option<StmtRef>,
        mut state: ProgramState,
        events: Vec<Event>,
    ) -> ProgramState {
        for event in &events {
            for a in &self.analyses {
                let mut ctx = AnalysisContext::new(
                    provider, symbol_mgr, region_mgr, frame, loc_ctx, stmt, state,
                );
                a.handle_event(event, &mut ctx);
                state = ctx.take_state();
            }
        }
        state
    }

    /// Runs every registered analysis's callback for `phase` over `stmt`,
    /// threading `state` through each in registration order and draining
    /// any events each one publishes before moving to the next.
    #[allow(clippy::too_many_arguments)]
    pub fn run_for_stmt(
        &self,
        provider: &dyn AstCfgProvider,
        symbol_mgr: &mut SymbolManager<'_>,
        region_mgr: &mut RegionManager<'_>,
        frame: FrameId,
        loc_ctx: LocCtxId,
        stmt: StmtRef,
        mut state: ProgramState,
        phase: StmtPhase,
    ) -> ProgramState {
        for a in &self.analyses {
            let mut ctx = AnalysisContext::new(
                provider,
                symbol_mgr,
                region_mgr,
                frame,
                loc_ctx,
                Some(stmt),
                state,
            );
            match phase {
                StmtPhase::Pre => a.pre_analyze_stmt(&mut ctx),
                StmtPhase::Eval => a.eval_stmt(&mut ctx),
                StmtPhase::Post => a.post_analyze_stmt(&mut ctx),
            }
            let events = ctx.take_events();
            state = ctx.take_state();
            state = self.dispatch_events(
                provider, symbol_mgr, region_mgr, frame, loc_ctx, Some(stmt), state, events,
            );
        }
        state
    }

    pub fn run_for_begin_function(
        &self,
        provider: &dyn AstCfgProvider,
        symbol_mgr: &mut SymbolManager<'_>,
        region_mgr: &mut RegionManager<'_>,
        frame: FrameId,
        loc_ctx: LocCtxId,
        mut state: ProgramState,
    ) -> ProgramState {
        for a in &self.analyses {
            let mut ctx =
                AnalysisContext::new(provider, symbol_mgr, region_mgr, frame, loc_ctx, None, state);
            a.analyze_begin_function(&mut ctx);
            state = ctx.take_state();
        }
        state
    }

    pub fn run_for_end_function(
        &self,
        provider: &dyn AstCfgProvider,
        symbol_mgr: &mut SymbolManager<'_>,
        region_mgr: &mut RegionManager<'_>,
        frame: FrameId,
        loc_ctx: LocCtxId,
        mut state: ProgramState,
    ) -> ProgramState {
        for a in &self.analyses {
            let mut ctx =
                AnalysisContext::new(provider, symbol_mgr, region_mgr, frame, loc_ctx, None, state);
            a.analyze_end_function(&mut ctx);
            state = ctx.take_state();
        }
        state
    }

    #[allow(clippy::too_many_arguments)]
    pub fn run_for_condition_filter(
        &self,
        provider: &dyn AstCfgProvider,
        symbol_mgr: &mut SymbolManager<'_>,
        region_mgr: &mut RegionManager<'_>,
        frame: FrameId,
        loc_ctx: LocCtxId,
        cond: StmtRef,
        is_true_branch: bool,
        mut state: ProgramState,
    ) -> ProgramState {
        for a in &self.analyses {
            let mut ctx = AnalysisContext::new(
                provider,
                symbol_mgr,
                region_mgr,
                frame,
                loc_ctx,
                Some(cond),
                state,
            );
            a.filter_condition(&mut ctx, cond, is_true_branch);
            state = ctx.take_state();
        }
        state
    }

    pub fn notify_enter_cycle(&self, head: NodeId) {
        for a in &self.analyses {
            a.notify_enter_cycle(head);
        }
    }

    pub fn notify_each_cycle_iteration(&self, head: NodeId, k: u32, phase: CyclePhase) {
        for a in &self.analyses {
            a.notify_each_cycle_iteration(head, k, phase);
        }
    }

    pub fn notify_exit_cycle(&self, head: NodeId) {
        for a in &self.analyses {
            a.notify_exit_cycle(head);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Base;
    impl Analysis for Base {
        fn id(&self) -> AnalysisId {
            AnalysisId(0)
        }
        fn name(&self) -> &'static str {
            "base"
        }
    }

    struct Dependent;
    impl Analysis for Dependent {
        fn id(&self) -> AnalysisId {
            AnalysisId(1)
        }
        fn name(&self) -> &'static str {
            "dependent"
        }
        fn dependencies(&self) -> &'static [AnalysisId] {
            &[AnalysisId(0)]
        }
    }

    #[test]
    fn dependency_closure_pulls_in_unmatched_dependency() {
        let mgr = AnalysisManager::new(vec![Box::new(Base), Box::new(Dependent)], "dependent");
        let names: Vec<_> = mgr.analyses().iter().map(|a| a.name()).collect();
        assert!(names.contains(&"base"));
        assert!(names.contains(&"dependent"));
    }

    #[test]
    fn glob_excludes_unrelated_analysis() {
        let mgr = AnalysisManager::new(vec![Box::new(Base), Box::new(Dependent)], "base");
        let names: Vec<_> = mgr.analyses().iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["base"]);
    }
}
