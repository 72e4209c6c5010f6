//! Command-line surface: the flat set of flags the options loader
//! (`config.rs`) resolves against, plus a `completions` subcommand for
//! shell integration.
//!
//! Grounded on the compiler crate's `clap::Parser` + `Subcommand` +
//! `clap_complete::generate` pattern (`crates/compiler/src/main.rs`).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(name = "knight")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A static analyzer for C/C++ built on abstract interpretation", long_about = None)]
pub struct Cli {
    /// Source files (or directories) to analyze.
    pub paths: Vec<PathBuf>,

    /// Glob of checkers to enable, e.g. `alpha.*,-alpha.Debug`.
    #[arg(long)]
    pub checkers: Option<String>,

    /// Glob of analyses to enable, e.g. `core.*`.
    #[arg(long)]
    pub analyses: Option<String>,

    /// Layered configuration overlay file (TOML).
    #[arg(long, value_name = "FILE")]
    pub overlay_file: Option<PathBuf>,

    /// Colorize diagnostic output.
    #[arg(long = "use-color")]
    pub use_color: bool,

    /// Print each function's CFG to stdout before analyzing it.
    #[arg(long = "view-cfg")]
    pub view_cfg: bool,

    /// Write a `.dot` dump of each function's CFG next to its source file.
    #[arg(long = "dump-cfg")]
    pub dump_cfg: bool,

    /// Apply any fix-its emitted alongside diagnostics.
    #[arg(long = "try-fix")]
    pub try_fix: bool,

    /// List every registered checker and exit.
    #[arg(long = "list-checkers")]
    pub list_checkers: bool,

    /// List every registered analysis and exit.
    #[arg(long = "list-analyses")]
    pub list_analyses: bool,

    /// Passthrough analyzer-option overrides, e.g. `-Xc widening_delay=2`.
    #[arg(short = 'X', long = "xc", value_name = "KEY=VALUE")]
    pub xc: Vec<String>,

    /// Verbose (debug-level) logging.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn print_completions(shell: Shell) {
    let mut cmd = <Cli as clap::CommandFactory>::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}
