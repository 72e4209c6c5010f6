//! An abstract-interpretation based static analyzer for C/C++, built on a
//! pre-existing front end. Given anything that implements
//! [`front_end::AstCfgProvider`] — a real parser/CFG builder, or the
//! in-crate [`front_end::synthetic`] one used by tests — this crate runs a
//! WTO-driven fixpoint over each function, then replays its registered
//! checkers over the converged result, producing a sorted, deduplicated
//! [`diagnostic::Sink`].
//!
//! ```ignore
//! let sink = knight_analyzer::analyze_program(&provider, &KnightOptions::default());
//! for diag in sink.diagnostics() {
//!     println!("{}:{}: {}", diag.file.display(), diag.offset, diag.message);
//! }
//! ```

pub mod analysis;
pub mod block;
pub mod checker;
pub mod cli;
pub mod config;
pub mod diagnostic;
pub mod engine;
pub mod error;
pub mod events;
pub mod front_end;
pub mod ids;
pub mod inspection;
pub mod numeric;
pub mod region;
pub mod resolver;
pub mod state;
pub mod symbol;
pub mod telemetry;
pub mod types;
pub mod wto;

pub use analysis::{Analysis, AnalysisContext, AnalysisManager};
pub use checker::{Checker, CheckerContext, CheckerManager};
pub use config::{AnalyzerOptions, KnightOptions, KnightOptionsOverride};
pub use diagnostic::{Diagnostic, FixIt, FixItSet, Level, Sink};
pub use error::{KnightError, Result};
pub use front_end::{AstCfgProvider, Cfg};
pub use state::ProgramState;

use bumpalo::Bump;

use crate::ids::{DeclRef, FrameId};
use crate::region::{FrameManager, LocationManager, RegionManager};
use crate::resolver::SymbolResolverAnalysis;
use crate::symbol::SymbolManager;

/// The built-in analyses and checkers every run registers, before the
/// `--checkers`/`--analyses` globs filter them. A real deployment may grow
/// more of each; only the ones the end-to-end scenarios exercise
/// ship here.
fn builtin_analyses() -> Vec<Box<dyn Analysis>> {
    vec![Box::new(SymbolResolverAnalysis::new())]
}

fn builtin_checkers() -> Vec<Box<dyn Checker>> {
    vec![Box::new(inspection::InspectionChecker::new())]
}

/// Runs every function `provider` exposes to a fixpoint and returns the
/// diagnostics every enabled checker raised, sorted and deduplicated.
pub fn analyze_program(provider: &dyn AstCfgProvider, opts: &KnightOptions) -> Sink {
    let bump = Bump::new();
    let mut symbol_mgr = SymbolManager::new(&bump);
    let mut region_mgr = RegionManager::new(&bump);
    let mut frame_mgr = FrameManager::new(&bump);
    let mut loc_mgr = LocationManager::new(&bump);

    let analyses = AnalysisManager::new(builtin_analyses(), &opts.analyses);
    let enabled_analysis_ids: Vec<_> = analyses.analyses().iter().map(|a| a.id()).collect();
    let checkers = CheckerManager::new(builtin_checkers(), &opts.checkers, &enabled_analysis_ids);

    let mut sink = Sink::new();
    for function in provider.functions() {
        let _span = telemetry::function_span(provider.function_name(function)).entered();
        let frame: FrameId = frame_mgr.top_frame(DeclRef(function.0));
        let cfg = provider.cfg(function);
        engine::analyze_function(
            &analyses,
            &checkers,
            provider,
            &mut symbol_mgr,
            &mut region_mgr,
            &mut loc_mgr,
            &opts.analyzer_opts,
            frame,
            cfg,
            ProgramState::top(),
            &mut sink,
        );
    }
    sink
}
