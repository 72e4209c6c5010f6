//! C8 (checker half): the `Checker` trait a diagnostic-producing consumer
//! implements, the read-only context threaded through its callbacks, and
//! the manager that resolves the enabled set and dispatches the
//! post-convergence replay.
//!
//! Grounded on `include/dfa/checker_manager.hpp`'s `CheckerCallBack`
//! registration shape: checkers expose the parallel callbacks
//! `pre/post_check_stmt(stmt, ctx)`, `check_begin_function`,
//! `check_end_function`, and fire only after the fixpoint has
//! converged, in WTO order.

use std::collections::BTreeSet;

use crate::config::matches_glob_list;
use crate::diagnostic::{Diagnostic, Level, Sink};
use crate::front_end::{AstCfgProvider, SourceLoc};
use crate::ids::{AnalysisId, CheckerId, FrameId, LocCtxId, StmtRef};
use crate::region::RegionManager;
use crate::state::ProgramState;
use crate::symbol::SymbolManager;

/// Threaded through every `Checker` callback. Unlike `AnalysisContext`, the
/// state here is borrowed and immutable — checkers consume analysis
/// outputs, they never update them.
pub struct CheckerContext<'a, 'b> {
    provider: &'a dyn AstCfgProvider,
    pub symbol_mgr: &'a SymbolManager<'b>,
    pub region_mgr: &'a RegionManager<'b>,
    frame: FrameId,
    loc_ctx: LocCtxId,
    stmt: Option<StmtRef>,
    state: &'a ProgramState,
    checker_name: &'static str,
    sink: &'a mut Sink,
}

impl<'a, 'b> CheckerContext<'a, 'b> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: &'a dyn AstCfgProvider,
        symbol_mgr: &'a SymbolManager<'b>,
        region_mgr: &'a RegionManager<'b>,
        frame: FrameId,
        loc_ctx: LocCtxId,
        stmt: Option<StmtRef>,
        state: &'a ProgramState,
        checker_name: &'static str,
        sink: &'a mut Sink,
    ) -> Self {
        Self {
            provider,
            symbol_mgr,
            region_mgr,
            frame,
            loc_ctx,
            stmt,
            state,
            checker_name,
            sink,
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
        self.state
    }

    /// Where the statement this callback was invoked for came from, falling
    /// back to the enclosing function's file when there is no statement
    /// (e.g. `check_begin_function`).
    pub fn location(&self, function_file: &std::path::Path) -> SourceLoc {
        match self.stmt {
            Some(stmt) => self.provider.stmt_location(stmt),
            None => SourceLoc {
                file: function_file.to_path_buf(),
                offset: 0,
            },
        }
    }

    /// Raises a diagnostic attributed to this checker.
    pub fn diagnose(&mut self, location: SourceLoc, message: impl Into<String>, level: Level) {
        self.sink.report(Diagnostic {
            checker: self.checker_name.to_string(),
            level,
            file: location.file,
            offset: location.offset,
            message: message.into(),
            fix_its: Vec::new(),
        });
    }
}

/// A checker: observes converged per-statement states and the begin/end of
/// a function, and raises diagnostics. Every method defaults to a no-op so
/// a checker only overrides what it needs, mirroring `Analysis`.
pub trait Checker {
    fn id(&self) -> CheckerId;
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str {
        ""
    }
    /// Analyses this checker reads state from; not enforced as a hard
    /// precondition (a missing analysis just means `state.get_*` returns
    /// nothing useful), but surfaced so `CheckerManager::new` can warn when
    /// a checker is enabled without the analysis it depends on.
    fn dependencies(&self) -> &'static [AnalysisId] {
        &[]
    }

    fn check_begin_function(&self, _ctx: &mut CheckerContext<'_, '_>) {}
    fn check_end_function(&self, _ctx: &mut CheckerContext<'_, '_>) {}
    fn pre_check_stmt(&self, _ctx: &mut CheckerContext<'_, '_>) {}
    fn post_check_stmt(&self, _ctx: &mut CheckerContext<'_, '_>) {}
}

/// Registers checkers, computes the enabled set, and drives the
/// post-convergence pre/post/begin/end replay the fixpoint engine (C5)
/// calls into once a function's WTO iteration has converged.
pub struct CheckerManager {
    checkers: Vec<Box<dyn Checker>>,
}

impl CheckerManager {
    /// `enabled_glob` is the `--checkers` mini-language.
    /// `enabled_analyses` is the analysis id set `AnalysisManager` resolved
    /// for this run; a checker whose declared dependency isn't in it is
    /// still registered, degrading gracefully rather than being dropped,
    /// but logged.
    pub fn new(
        all: Vec<Box<dyn Checker>>,
        enabled_glob: &str,
        enabled_analyses: &[AnalysisId],
    ) -> Self {
        let enabled_analyses: BTreeSet<u32> = enabled_analyses.iter().map(|a| a.0).collect();
        let checkers: Vec<Box<dyn Checker>> = all
            .into_iter()
            .filter(|c| matches_glob_list(enabled_glob, c.name()))
            .collect();
        for c in &checkers {
            for dep in c.dependencies() {
                if !enabled_analyses.contains(&dep.0) {
                    tracing::warn!(
                        checker = c.name(),
                        analysis = dep.0,
                        "checker enabled without its declared analysis dependency"
                    );
                }
            }
        }
        Self { checkers }
    }

    pub fn checkers(&self) -> &[Box<dyn Checker>] {
        &self.checkers
    }

    #[allow(clippy::too_many_arguments)]
    pub fn run_for_begin_function(
        &self,
        provider: &dyn AstCfgProvider,
        symbol_mgr: &SymbolManager<'_>,
        region_mgr: &RegionManager<'_>,
        frame: FrameId,
        loc_ctx: LocCtxId,
        state: &ProgramState,
        sink: &mut Sink,
    ) {
        for c in &self.checkers {
            let mut ctx = CheckerContext::new(
                provider, symbol_mgr, region_mgr, frame, loc_ctx, None, state, c.name(), sink,
            );
            c.check_begin_function(&mut ctx);
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn run_for_end_function(
        &self,
        provider: &dyn AstCfgProvider,
        symbol_mgr: &SymbolManager<'_>,
        region_mgr: &RegionManager<'_>,
        frame: FrameId,
        loc_ctx: LocCtxId,
        state: &ProgramState,
        sink: &mut Sink,
    ) {
        for c in &self.checkers {
            let mut ctx = CheckerContext::new(
                provider, symbol_mgr, region_mgr, frame, loc_ctx, None, state, c.name(), sink,
            );
            c.check_end_function(&mut ctx);
        }
    }

    /// Replays a statement's memoized pre- and post-states against every
    /// registered checker, in registration order.
    #[allow(clippy::too_many_arguments)]
    pub fn run_for_stmt(
        &self,
        provider: &dyn AstCfgProvider,
        symbol_mgr: &SymbolManager<'_>,
        region_mgr: &RegionManager<'_>,
        frame: FrameId,
        loc_ctx: LocCtxId,
        stmt: StmtRef,
        pre_state: &ProgramState,
        post_state: &ProgramState,
        sink: &mut Sink,
    ) {
        for c in &self.checkers {
            let mut ctx = CheckerContext::new(
                provider,
                symbol_mgr,
                region_mgr,
                frame,
                loc_ctx,
                Some(stmt),
                pre_state,
                c.name(),
                sink,
            );
            c.pre_check_stmt(&mut ctx);
        }
        for c in &self.checkers {
            let mut ctx = CheckerContext::new(
                provider,
                symbol_mgr,
                region_mgr,
                frame,
                loc_ctx,
                Some(stmt),
                post_state,
                c.name(),
                sink,
            );
            c.post_check_stmt(&mut ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front_end::synthetic::SyntheticProgram;
    use std::path::PathBuf;

    struct Flags;
    impl Checker for Flags {
        fn id(&self) -> CheckerId {
            CheckerId(0)
        }
        fn name(&self) -> &'static str {
            "debug.Flags"
        }
        fn pre_check_stmt(&self, ctx: &mut CheckerContext<'_, '_>) {
            ctx.diagnose(
                SourceLoc {
                    file: PathBuf::from("a.c"),
                    offset: 1,
                },
                "hit",
                Level::Remark,
            );
        }
    }

    #[test]
    fn glob_filters_checkers_by_name() {
        let mgr = CheckerManager::new(vec![Box::new(Flags)], "-*", &[]);
        assert!(mgr.checkers().is_empty());
    }

    #[test]
    fn enabled_checker_reports_through_the_sink() {
        let provider = SyntheticProgram::new();
        let bump = bumpalo::Bump::new();
        let symbol_mgr = SymbolManager::new(&bump);
        let region_mgr = RegionManager::new(&bump);
        let mgr = CheckerManager::new(vec![Box::new(Flags)], "*", &[]);
        let mut sink = Sink::new();
        let state = ProgramState::top();
        mgr.run_for_stmt(
            &provider,
            &symbol_mgr,
            &region_mgr,
            FrameId(0),
            LocCtxId(0),
            StmtRef(0),
            &state,
            &state,
            &mut sink,
        );
        assert_eq!(sink.len(), 1);
    }
}
