//! A built-in debugging checker: recognizes the `dump`/`reach` call
//! expressions the end-to-end scenarios drive the engine with and
//! turns them into diagnostics carrying the analyzer's actual findings,
//! rather than requiring a real checker under test.
//!
//! Grounded on `include/dfa/checker/debug/inspection.hpp`'s
//! `InspectionChecker`, which dispatches on a call's callee name
//! (`knight_dump_zval` / `knight_reachable` there) to either dump the
//! numerical interval of an argument or report branch reachability.

use crate::checker::{Checker, CheckerContext};
use crate::diagnostic::Level;
use crate::front_end::StmtKind;
use crate::ids::{AnalysisId, CheckerId};
use crate::resolver::SYMBOL_RESOLVER_ID;
use crate::symbol::{as_znum, as_zvariable};

pub const INSPECTION_CHECKER_ID: CheckerId = CheckerId(0);

#[derive(Default)]
pub struct InspectionChecker;

impl InspectionChecker {
    pub fn new() -> Self {
        Self
    }

    fn dump_zval(&self, ctx: &mut CheckerContext<'_, '_>, arg: crate::ids::StmtRef) {
        let loc = ctx.provider().stmt_location(arg);
        let Some(sym) = ctx.state().get_stmt_sexpr(arg, ctx.frame()) else {
            ctx.diagnose(loc, "T", Level::Remark);
            return;
        };
        if !ctx.symbol_mgr.get(sym).ty().is_numerical() {
            return;
        }
        let zdom = ctx.state().get_zdom_ref();
        if zdom.is_bottom() {
            ctx.diagnose(loc, "\u{22a5}", Level::Remark);
            return;
        }
        if let Some(n) = as_znum(ctx.symbol_mgr, sym) {
            ctx.diagnose(loc, n.0.to_string(), Level::Remark);
            return;
        }
        let Some(v) = as_zvariable(ctx.symbol_mgr, sym) else {
            ctx.diagnose(loc, "T", Level::Remark);
            return;
        };
        let interval = zdom.interval_of(v);
        ctx.diagnose(loc, interval.to_string(), Level::Remark);
    }

    fn dump_reachability(&self, ctx: &mut CheckerContext<'_, '_>, call: crate::ids::StmtRef) {
        let loc = ctx.provider().stmt_location(call);
        let message = if ctx.state().is_bottom() {
            "Unreachable"
        } else {
            "Reachable"
        };
        ctx.diagnose(loc, message, Level::Remark);
    }
}

impl Checker for InspectionChecker {
    fn id(&self) -> CheckerId {
        INSPECTION_CHECKER_ID
    }

    fn name(&self) -> &'static str {
        "debug.Inspection"
    }

    fn description(&self) -> &'static str {
        "Reports dump(x)/reach() calls with the analyzer's current findings"
    }

    fn dependencies(&self) -> &'static [AnalysisId] {
        &[SYMBOL_RESOLVER_ID]
    }

    fn post_check_stmt(&self, ctx: &mut CheckerContext<'_, '_>) {
        let Some(stmt) = ctx.stmt() else { return };
        let StmtKind::CallExpr { callee, args, .. } = ctx.provider().stmt_kind(stmt) else {
            return;
        };
        match callee.as_str() {
            "dump" => {
                if let Some(&arg) = args.first() {
                    self.dump_zval(ctx, arg);
                }
            }
            "reach" => self.dump_reachability(ctx, stmt),
            _ => {}
        }
    }
}
