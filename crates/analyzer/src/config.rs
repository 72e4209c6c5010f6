//! Layered configuration: defaults, an optional TOML config file, and
//! command-line overrides, in that increasing-priority order.
//!
//! Mirrors `include/tooling/options.hpp`'s three-provider shape
//! (`Default`, `CommandLine`, `ConfigFile`) from the original implementation,
//! re-expressed with `serde`/`toml` the way the teacher loads `LintConfig`
//! (`compiler/src/lint.rs::LintConfig::from_toml`) rather than hand-rolling
//! a parser.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{KnightError, Result};

/// Which layer last set a given checker option; exposed for
/// `--list-checkers`-style introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSource {
    Default,
    ConfigFile,
    CommandLine,
}

impl OptionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            OptionSource::Default => "default",
            OptionSource::ConfigFile => "config-file",
            OptionSource::CommandLine => "command-line",
        }
    }
}

/// A checker/analysis-specific option value, loaded from TOML or `-Xc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckOptVal {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Knobs steering the fixpoint engine's widening/narrowing behavior.
/// Defaults for `widening_delay` and
/// `max_unrolling_iterations` are taken directly from
/// `analyzer/include/analyzer/core/analyzer_options.hpp`; the remaining
/// defaults are this implementation's own choice (see DESIGN.md, Open
/// Question 1 resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerOptions {
    pub widening_delay: u32,
    pub max_widening_iterations: u32,
    pub max_narrowing_iterations: u32,
    pub max_unrolling_iterations: u32,
    pub analyze_with_threshold: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            widening_delay: 1,
            max_widening_iterations: 10,
            max_narrowing_iterations: 10,
            max_unrolling_iterations: 7,
            analyze_with_threshold: true,
        }
    }
}

/// Top-level options surface, assembled from defaults, an optional config
/// file, and command-line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnightOptions {
    /// Comma-separated checker glob; `*` enables all, a `-` prefix on an
    /// element disables that (sub-)glob.
    pub checkers: String,
    /// Same mini-language as `checkers`, over registered analyses.
    pub analyses: String,
    pub header_extensions: Vec<String>,
    pub impl_extensions: Vec<String>,
    pub check_opts: BTreeMap<String, CheckOptVal>,
    pub use_color: bool,
    pub view_cfg: bool,
    pub dump_cfg: bool,
    pub try_fix: bool,
    pub analyzer_opts: AnalyzerOptions,
}

impl Default for KnightOptions {
    fn default() -> Self {
        Self {
            checkers: "*".to_string(),
            analyses: "*".to_string(),
            header_extensions: vec!["h", "hh", "hpp", "hxx"]
                .into_iter()
                .map(String::from)
                .collect(),
            impl_extensions: vec!["c", "cc", "cpp", "cxx"]
                .into_iter()
                .map(String::from)
                .collect(),
            check_opts: BTreeMap::new(),
            use_color: false,
            view_cfg: false,
            dump_cfg: false,
            try_fix: false,
            analyzer_opts: AnalyzerOptions::default(),
        }
    }
}

impl KnightOptions {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text)
            .map_err(|e| KnightError::Configuration(format!("invalid config file: {e}")))
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            KnightError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    /// Merges `other` on top of `self`, with `other`'s fields winning
    /// (used to layer a config file over the built-in defaults, and then
    /// command-line flags over the result).
    pub fn merge(mut self, other: KnightOptionsOverride) -> Self {
        if let Some(v) = other.checkers {
            self.checkers = v;
        }
        if let Some(v) = other.analyses {
            self.analyses = v;
        }
        if let Some(v) = other.use_color {
            self.use_color = v;
        }
        if let Some(v) = other.view_cfg {
            self.view_cfg = v;
        }
        if let Some(v) = other.dump_cfg {
            self.dump_cfg = v;
        }
        if let Some(v) = other.try_fix {
            self.try_fix = v;
        }
        for (k, v) in other.check_opts {
            apply_analyzer_opt(&mut self.analyzer_opts, &k, &v);
            self.check_opts.insert(k, v);
        }
        self
    }
}

/// Lets `-Xc key=value` reach past the generic checker-option bag and
/// into `AnalyzerOptions` when `key` names one of its fields, so
/// `-Xc widening_delay=2` actually changes engine behavior rather than
/// only being recorded for introspection.
fn apply_analyzer_opt(opts: &mut AnalyzerOptions, key: &str, val: &CheckOptVal) {
    match (key, val) {
        ("widening_delay", CheckOptVal::Int(i)) => opts.widening_delay = *i as u32,
        ("max_widening_iterations", CheckOptVal::Int(i)) => opts.max_widening_iterations = *i as u32,
        ("max_narrowing_iterations", CheckOptVal::Int(i)) => opts.max_narrowing_iterations = *i as u32,
        ("max_unrolling_iterations", CheckOptVal::Int(i)) => opts.max_unrolling_iterations = *i as u32,
        ("analyze_with_threshold", CheckOptVal::Bool(b)) => opts.analyze_with_threshold = *b,
        _ => {}
    }
}

/// A sparse set of command-line overrides; only the fields the user
/// actually passed are `Some`, so `KnightOptions::merge` can tell a
/// command-line override apart from a value that merely matches the
/// default.
#[derive(Debug, Clone, Default)]
pub struct KnightOptionsOverride {
    pub checkers: Option<String>,
    pub analyses: Option<String>,
    pub use_color: Option<bool>,
    pub view_cfg: Option<bool>,
    pub dump_cfg: Option<bool>,
    pub try_fix: Option<bool>,
    pub check_opts: BTreeMap<String, CheckOptVal>,
}

impl KnightOptionsOverride {
    /// Builds the override layer from a parsed CLI, including `-Xc
    /// key=value` passthrough options.
    pub fn from_cli(cli: &crate::cli::Cli) -> Result<Self> {
        let mut check_opts = BTreeMap::new();
        for entry in &cli.xc {
            let (key, value) = entry.split_once('=').ok_or_else(|| {
                KnightError::Configuration(format!("-Xc option `{entry}` is not KEY=VALUE"))
            })?;
            check_opts.insert(key.to_string(), parse_check_opt_val(value));
        }
        Ok(Self {
            checkers: cli.checkers.clone(),
            analyses: cli.analyses.clone(),
            use_color: cli.use_color.then_some(true),
            view_cfg: cli.view_cfg.then_some(true),
            dump_cfg: cli.dump_cfg.then_some(true),
            try_fix: cli.try_fix.then_some(true),
            check_opts,
        })
    }
}

fn parse_check_opt_val(value: &str) -> CheckOptVal {
    if let Ok(b) = value.parse::<bool>() {
        CheckOptVal::Bool(b)
    } else if let Ok(i) = value.parse::<i64>() {
        CheckOptVal::Int(i)
    } else {
        CheckOptVal::Str(value.to_string())
    }
}

/// Parses the checks/analyses mini-language: a comma-separated list of
/// globs, `*` meaning "all", and a leading `-` meaning "disable this
/// (sub-)glob", evaluated left to right so a later entry can re-enable
/// what an earlier one disabled. Grounded on
/// `include/tooling/cl_opts.hpp`'s description of the `--checks` flag.
pub fn matches_glob_list(spec: &str, name: &str) -> bool {
    let mut enabled = false;
    for raw in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (negate, pattern) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        if glob_match(pattern, name) {
            enabled = !negate;
        }
    }
    enabled
}

fn glob_match(pattern: &str, name: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    // Only `*` as a wildcard is supported, matching the original's glob
    // vocabulary; translate to an anchored regex.
    let mut regex_src = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => regex_src.push_str(".*"),
            c if regex::escape(&c.to_string()) != c.to_string() => {
                regex_src.push_str(&regex::escape(&c.to_string()))
            }
            c => regex_src.push(c),
        }
    }
    regex_src.push('$');
    regex::Regex::new(&regex_src)
        .map(|re| re.is_match(name))
        .unwrap_or(false)
}
