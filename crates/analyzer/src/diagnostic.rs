//! Diagnostics: the only user-visible output a checker produces.
//!
//! Mirrors `src/tooling/diagnostic.cpp`: diagnostics accumulate as raised,
//! are stable-sorted by `(file, offset, name, message)`, and deduplicated by
//! equality on that same key before being handed to a renderer. Fix-it
//! hints are collected separately per file and conflict (rather than
//! silently overlap) when two hints touch the same byte range.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Note,
    Remark,
    Warning,
    Error,
    Fatal,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Note => "note",
            Level::Remark => "remark",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

/// A single replacement within a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixIt {
    pub file: PathBuf,
    pub offset: usize,
    pub length: usize,
    pub replacement: String,
}

impl FixIt {
    fn overlaps(&self, other: &FixIt) -> bool {
        self.file == other.file
            && self.offset < other.offset + other.length
            && other.offset < self.offset + self.length
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub checker: String,
    pub level: Level,
    pub file: PathBuf,
    pub offset: usize,
    pub message: String,
    pub fix_its: Vec<FixIt>,
}

/// The key diagnostics are sorted and deduplicated on, matching
/// `diagnostic.cpp`'s anonymous `Less`/`Equal` functors exactly
/// (`FilePath`, `FileOffset`, `DiagnosticName`, `Message`).
fn dedup_key(d: &Diagnostic) -> (&Path, usize, &str, &str) {
    (&d.file, d.offset, d.checker.as_str(), d.message.as_str())
}

/// Accumulates diagnostics raised during a run and produces the final,
/// sorted, deduplicated set a renderer consumes.
#[derive(Debug, Default)]
pub struct Sink {
    diagnostics: Vec<Diagnostic>,
}

impl Sink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Stable-sorts by the dedup key, then removes adjacent duplicates,
    /// mirroring `take_diags()`'s `std::stable_sort` + `std::unique`.
    pub fn take_sorted_deduped(&mut self) -> Vec<Diagnostic> {
        let mut diags = std::mem::take(&mut self.diagnostics);
        diags.sort_by(|a, b| cmp_by_key(a, b));
        diags.dedup_by(|a, b| dedup_key(a) == dedup_key(b));
        diags
    }
}

fn cmp_by_key(a: &Diagnostic, b: &Diagnostic) -> Ordering {
    dedup_key(a).cmp(&dedup_key(b))
}

/// Collects fix-it hints per file and rejects ones overlapping a hint
/// already accepted, matching `emitCodeContext`'s conflict handling.
#[derive(Debug, Default)]
pub struct FixItSet {
    by_file: BTreeMap<PathBuf, Vec<FixIt>>,
}

impl FixItSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `Err` with the conflicting hint when `hint` overlaps a hint
    /// already accepted for the same file; the run's diagnostics are
    /// unaffected, only this specific fix is dropped from application.
    pub fn add(&mut self, hint: FixIt) -> Result<(), FixIt> {
        let existing = self.by_file.entry(hint.file.clone()).or_default();
        if let Some(conflict) = existing.iter().find(|h| h.overlaps(&hint)) {
            return Err(conflict.clone());
        }
        existing.push(hint);
        Ok(())
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.by_file.keys().map(PathBuf::as_path)
    }

    /// Applies all accepted hints for `file` to `source`, offset-adjusting
    /// as replacements change the text's length, processing hints in
    /// ascending offset order (any later hint's offset is naturally
    /// computed against original-source offsets, matching how the
    /// original stores offsets as absolute byte positions in the
    /// pre-rewrite source).
    pub fn apply(&self, file: &Path, source: &str) -> Option<String> {
        let hints = self.by_file.get(file)?;
        let mut sorted = hints.clone();
        sorted.sort_by_key(|h| h.offset);
        let mut out = String::with_capacity(source.len());
        let mut cursor = 0usize;
        for hint in &sorted {
            out.push_str(&source[cursor..hint.offset]);
            out.push_str(&hint.replacement);
            cursor = hint.offset + hint.length;
        }
        out.push_str(&source[cursor..]);
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(checker: &str, file: &str, offset: usize, message: &str) -> Diagnostic {
        Diagnostic {
            checker: checker.to_string(),
            level: Level::Warning,
            file: PathBuf::from(file),
            offset,
            message: message.to_string(),
            fix_its: Vec::new(),
        }
    }

    #[test]
    fn sink_sorts_and_dedupes_by_file_offset_name_message() {
        let mut sink = Sink::new();
        sink.report(diag("core.DivideZero", "b.c", 5, "m"));
        sink.report(diag("core.DivideZero", "a.c", 10, "m"));
        sink.report(diag("core.DivideZero", "a.c", 10, "m")); // exact duplicate
        sink.report(diag("core.DivideZero", "a.c", 1, "m"));

        let out = sink.take_sorted_deduped();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].file, PathBuf::from("a.c"));
        assert_eq!(out[0].offset, 1);
        assert_eq!(out[1].offset, 10);
        assert_eq!(out[2].file, PathBuf::from("b.c"));
    }

    #[test]
    fn fixit_set_rejects_overlapping_hints() {
        let mut set = FixItSet::new();
        let a = FixIt {
            file: PathBuf::from("a.c"),
            offset: 10,
            length: 5,
            replacement: "x".into(),
        };
        let b = FixIt {
            file: PathBuf::from("a.c"),
            offset: 12,
            length: 5,
            replacement: "y".into(),
        };
        assert!(set.add(a).is_ok());
        assert_eq!(set.add(b).unwrap_err().offset, 10);
    }

    #[test]
    fn fixit_set_applies_non_overlapping_hints_in_order() {
        let mut set = FixItSet::new();
        set.add(FixIt {
            file: PathBuf::from("a.c"),
            offset: 4,
            length: 1,
            replacement: "ZERO".into(),
        })
        .unwrap();
        set.add(FixIt {
            file: PathBuf::from("a.c"),
            offset: 0,
            length: 3,
            replacement: "int".into(),
        })
        .unwrap();

        let rewritten = set.apply(Path::new("a.c"), "var a=1;").unwrap();
        assert_eq!(rewritten, "int a=ZERO;");
    }

    #[test]
    fn fixit_set_applies_against_a_real_file_on_disk() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "var a=1;").unwrap();
        let path = file.path().to_path_buf();

        let mut set = FixItSet::new();
        set.add(FixIt {
            file: path.clone(),
            offset: 0,
            length: 3,
            replacement: "int".into(),
        })
        .unwrap();

        let source = std::fs::read_to_string(&path).unwrap();
        let rewritten = set.apply(&path, &source).unwrap();
        assert_eq!(rewritten, "int a=1;");
    }
}
