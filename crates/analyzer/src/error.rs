//! Error taxonomy.
//!
//! Analyses never throw: a statement that cannot be modelled precisely
//! either leaves the state unchanged or conjures a fresh symbol, and a
//! branch the incoming state already contradicts becomes bottom. The
//! variants below cover only the cases that actually abort a run: bad
//! configuration, missing input, a front-end compile failure, or an
//! analyzer invariant violation. `UnmodelledConstruct` and
//! `UnreachableBranch` from the taxonomy are not represented here because
//! they are not failures the caller reacts to by unwinding — they are
//! logged (`tracing::warn!`) or represented structurally as a bottom state,
//! respectively.

use std::fmt;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, KnightError>;

#[derive(Debug)]
pub enum KnightError {
    /// Bad CLI flag combination, bad `-Xc` option, or an unparseable glob.
    Configuration(String),
    /// No source file or directory was given on the command line.
    NoInputFiles,
    /// The overlay configuration file could not be read or parsed.
    OverlayFile { path: PathBuf, message: String },
    /// A positional input path does not exist or is not readable.
    InputMissing(PathBuf),
    /// The front end failed to produce a CFG/AST for a translation unit.
    /// The analyzer continues with the remaining translation units; this
    /// variant is collected, not necessarily propagated with `?`.
    CompileFailure { file: PathBuf, message: String },
    /// An analyzer invariant was violated: a non-interned node reached a
    /// keying operation, a symbolic expression of the wrong type was
    /// assigned into a region, an ancestor relation was misused, or the
    /// WTO visited a node unreachable from the entry block.
    AnalyzerBug(String),
}

impl fmt::Display for KnightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnightError::Configuration(msg) => write!(f, "configuration error: {msg}"),
            KnightError::NoInputFiles => write!(f, "no input files given"),
            KnightError::OverlayFile { path, message } => {
                write!(f, "overlay file {}: {message}", path.display())
            }
            KnightError::InputMissing(path) => {
                write!(f, "input missing: {}", path.display())
            }
            KnightError::CompileFailure { file, message } => {
                write!(f, "compile failure in {}: {message}", file.display())
            }
            KnightError::AnalyzerBug(msg) => write!(f, "analyzer bug: {msg}"),
        }
    }
}

impl std::error::Error for KnightError {}

impl KnightError {
    /// The CLI exit code this error's taxonomy entry normatively maps to.
    /// `CompileFailure` maps to the normative exit code 6 even though a run
    /// with compile failures still finishes processing the remaining TUs.
    pub fn exit_code(&self) -> i32 {
        match self {
            KnightError::Configuration(_) => 1,
            KnightError::NoInputFiles => 4,
            KnightError::OverlayFile { .. } => 3,
            KnightError::InputMissing(_) => 5,
            KnightError::CompileFailure { .. } => 6,
            KnightError::AnalyzerBug(_) => 1,
        }
    }
}

/// Asserts an analyzer invariant, returning `AnalyzerBug` rather than
/// panicking in release builds; panics immediately in debug builds so
/// invariant violations are caught close to their source during
/// development. Mirrors the source's `knight_assert_msg` which aborts in
/// all builds; here we additionally surface it as a catchable error for
/// release builds rather than aborting the whole run.
#[macro_export]
macro_rules! knight_assert {
    ($cond:expr, $($msg:tt)+) => {
        if !$cond {
            let message = format!($($msg)+);
            debug_assert!(false, "{message}");
            return Err($crate::error::KnightError::AnalyzerBug(message));
        }
    };
}
