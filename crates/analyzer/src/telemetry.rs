//! Structured logging setup. Grounded on the LSP binary's
//! `tracing_subscriber::fmt()` / `EnvFilter::from_default_env()` idiom
//! (`lsp/src/main.rs`); the per-translation-unit and per-function spans
//! below are this crate's own addition, following `tracing`'s span
//! convention the rest of the crate already logs under (`knight_analyzer::*`
//! targets in `engine.rs`, `block.rs`, `resolver.rs`).

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the
/// default; with neither set, only this crate's own `info`-and-above
/// events are shown.
pub fn init(verbose: bool) {
    let default_directive = if verbose { "knight_analyzer=debug" } else { "knight_analyzer=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// A span covering the whole analysis of one translation unit.
pub fn tu_span(file: &Path) -> tracing::Span {
    tracing::info_span!("translation_unit", file = %file.display())
}

/// A span covering the fixpoint analysis of a single function, nested
/// under its enclosing translation-unit span.
pub fn function_span(name: &str) -> tracing::Span {
    tracing::info_span!("function", name)
}
