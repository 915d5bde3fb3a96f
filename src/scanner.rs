// SPDX-License-Identifier: AGPL-3.0-or-later
//! Defect scanner: walks a working copy and reports findings per file

use crate::catalog::{DefectCatalog, DefectKind, KindFilter, Severity};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directories never descended into during discovery.
const SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    "venv",
    ".venv",
    "dist",
    "build",
    ".idea",
    "target",
];

/// File extensions considered source code.
const SOURCE_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "jsx", "tsx", "java", "go", "rs", "c", "cpp", "h",
];

/// Block-introducing keywords that require a trailing ':' terminator.
const BLOCK_KEYWORDS: &[&str] = &[
    "async def ",
    "def ",
    "class ",
    "if ",
    "elif ",
    "for ",
    "while ",
    "except ",
    "with ",
];

/// Bare keywords that introduce a block on their own.
const BARE_BLOCK_KEYWORDS: &[&str] = &["else", "try", "finally"];

/// One detected defect instance at a specific file and line.
///
/// Immutable once created; consumed by the fix engine within the same
/// iteration and re-derived fresh on the next scan pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Path relative to the working copy root.
    pub file: PathBuf,
    pub kind: DefectKind,
    /// 1-based line number.
    pub line: usize,
    /// The matched line, trimmed of surrounding whitespace.
    pub snippet: String,
    pub description: String,
    pub severity: Severity,
}

/// Result of one scan pass over a working copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub root: PathBuf,
    pub files_scanned: usize,
    /// Files skipped because they could not be read or decoded.
    pub files_skipped: usize,
    pub findings: Vec<Finding>,
}

impl ScanResult {
    pub fn summary(&self) -> String {
        let mut by_kind: Vec<(DefectKind, usize)> = DefectKind::ALL
            .iter()
            .map(|k| (*k, self.findings.iter().filter(|f| f.kind == *k).count()))
            .collect();
        by_kind.retain(|(_, n)| *n > 0);

        let breakdown = by_kind
            .iter()
            .map(|(k, n)| format!("{} {}", n, k))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Scanned {} files ({} skipped): {} findings{}",
            self.files_scanned,
            self.files_skipped,
            self.findings.len(),
            if breakdown.is_empty() {
                String::new()
            } else {
                format!(" ({})", breakdown)
            }
        )
    }
}

/// Working-copy scanner.
///
/// Each `scan` call is one independent pass: file contents are re-read
/// fresh so rewrites from the previous iteration are observed, and the
/// traversal order is deterministic (sorted by file name, then line).
pub struct Scanner {
    catalog: DefectCatalog,
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            catalog: DefectCatalog::new(),
        }
    }

    pub fn catalog(&self) -> &DefectCatalog {
        &self.catalog
    }

    /// Run one scan pass over the working copy rooted at `root`.
    pub fn scan(&self, root: &Path, filter: &KindFilter) -> ScanResult {
        let mut findings = Vec::new();
        let mut files_scanned = 0;
        let mut files_skipped = 0;

        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_str().unwrap_or("");
                !(e.file_type().is_dir() && SKIP_DIRS.contains(&name))
            })
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !SOURCE_EXTENSIONS.contains(&extension) {
                continue;
            }

            let content = match fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    // SCAN_IO_ERROR: recorded and skipped, never fatal.
                    warn!("Skipping unreadable file {}: {}", path.display(), e);
                    files_skipped += 1;
                    continue;
                }
            };

            files_scanned += 1;
            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            self.scan_content(&relative, &content, filter, &mut findings);
        }

        debug!(
            "Scan pass over {} complete: {} findings",
            root.display(),
            findings.len()
        );

        ScanResult {
            root: root.to_path_buf(),
            files_scanned,
            files_skipped,
            findings,
        }
    }

    /// Pure per-file detection: content in, zero-or-more findings out.
    fn scan_content(
        &self,
        file: &Path,
        content: &str,
        filter: &KindFilter,
        findings: &mut Vec<Finding>,
    ) {
        // One report per (line, kind), as in a single linter pass.
        let mut seen: HashSet<(usize, DefectKind)> = HashSet::new();
        let mut push = |findings: &mut Vec<Finding>,
                        line: usize,
                        kind: DefectKind,
                        snippet: &str,
                        description: String| {
            if filter.allows(kind) && seen.insert((line, kind)) {
                findings.push(Finding {
                    file: file.to_path_buf(),
                    kind,
                    line,
                    snippet: snippet.trim().to_string(),
                    description,
                    severity: kind.severity(),
                });
            }
        };

        for (idx, line) in content.lines().enumerate() {
            let line_num = idx + 1;
            let stripped = line.trim();
            if stripped.is_empty() || stripped.starts_with('#') {
                continue;
            }

            if let Some(description) = missing_block_terminator(line) {
                push(findings, line_num, DefectKind::Syntax, line, description);
            }

            if let Some(description) = bad_indentation(line) {
                push(
                    findings,
                    line_num,
                    DefectKind::Indentation,
                    line,
                    description,
                );
            }

            for pattern in self.catalog.patterns() {
                if pattern.pattern.is_match(line) {
                    push(
                        findings,
                        line_num,
                        pattern.kind,
                        line,
                        pattern.description.to_string(),
                    );
                }
            }
        }
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Detect a block-introducing line missing its ':' terminator.
///
/// Lines containing a '#' are skipped entirely: the terminator may be
/// hiding inside the comment, and guessing wrong would corrupt the line.
fn missing_block_terminator(line: &str) -> Option<String> {
    if line.contains('#') {
        return None;
    }
    let stripped = line.trim_start();
    let ends_terminated = line.trim_end().ends_with(':');

    for keyword in BLOCK_KEYWORDS {
        if stripped.starts_with(keyword) && !ends_terminated {
            return Some(format!(
                "Missing colon after {} statement",
                keyword.trim_end()
            ));
        }
    }
    for keyword in BARE_BLOCK_KEYWORDS {
        if stripped.trim_end() == *keyword {
            return Some(format!("Missing colon after {} statement", keyword));
        }
    }
    None
}

/// Detect tab or mixed-character indentation.
fn bad_indentation(line: &str) -> Option<String> {
    if line.starts_with('\t') {
        return Some("Tab indentation found (use spaces)".to_string());
    }
    let leading: String = line.chars().take_while(|c| c.is_whitespace()).collect();
    if leading.contains(' ') && leading.contains('\t') {
        return Some("Mixed tab and space indentation".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scan_fixture(files: &[(&str, &str)]) -> ScanResult {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        Scanner::new().scan(dir.path(), &KindFilter::all())
    }

    #[test]
    fn test_detects_unused_import() {
        let result = scan_fixture(&[("app.py", "import os\nvalue = 1\n")]);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].kind, DefectKind::Linting);
        assert_eq!(result.findings[0].line, 1);
        assert_eq!(result.findings[0].snippet, "import os");
    }

    #[test]
    fn test_detects_debug_print() {
        let result = scan_fixture(&[("app.py", "value = 1\nprint(value)\n")]);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].kind, DefectKind::Linting);
        assert_eq!(result.findings[0].line, 2);
    }

    #[test]
    fn test_detects_missing_colon() {
        let result = scan_fixture(&[("app.py", "def compute(x)\n    return x\n")]);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].kind, DefectKind::Syntax);
        assert_eq!(result.findings[0].line, 1);
    }

    #[test]
    fn test_terminated_block_is_clean() {
        let result = scan_fixture(&[("app.py", "def compute(x):\n    return x\n")]);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_commented_line_not_flagged_for_syntax() {
        let result = scan_fixture(&[("app.py", "if ready  # fires later\n")]);
        assert!(result
            .findings
            .iter()
            .all(|f| f.kind != DefectKind::Syntax));
    }

    #[test]
    fn test_detects_tab_indentation() {
        let result = scan_fixture(&[("app.py", "def f():\n\treturn 1\n")]);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].kind, DefectKind::Indentation);
        assert_eq!(result.findings[0].line, 2);
    }

    #[test]
    fn test_detects_confused_comprehension() {
        let result = scan_fixture(&[("app.py", "pairs = [x for x in data for y]\n")]);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].kind, DefectKind::TypeError);
    }

    #[test]
    fn test_detects_incomplete_import() {
        let result = scan_fixture(&[("app.py", "from models import\n")]);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].kind, DefectKind::Import);
    }

    #[test]
    fn test_kind_filter_suppresses_findings() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.py"), "import os\n").unwrap();
        let filter = KindFilter::without(vec![DefectKind::Linting]);
        let result = Scanner::new().scan(dir.path(), &filter);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_non_source_files_ignored() {
        let result = scan_fixture(&[("notes.txt", "import os\n")]);
        assert_eq!(result.files_scanned, 0);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_unreadable_file_skipped_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.py"), [0xff, 0xfe, 0x00, 0xff]).unwrap();
        fs::write(dir.path().join("ok.py"), "import os\n").unwrap();
        let result = Scanner::new().scan(dir.path(), &KindFilter::all());
        assert_eq!(result.files_skipped, 1);
        assert_eq!(result.files_scanned, 1);
        assert_eq!(result.findings.len(), 1);
    }

    #[test]
    fn test_deterministic_file_then_line_order() {
        let content_b = "import os\n";
        let content_a = "import sys\nprint(1)\n";
        let first = scan_fixture(&[("b.py", content_b), ("a.py", content_a)]);
        let second = scan_fixture(&[("a.py", content_a), ("b.py", content_b)]);

        let order: Vec<(String, usize)> = first
            .findings
            .iter()
            .map(|f| (f.file.display().to_string(), f.line))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a.py".to_string(), 1),
                ("a.py".to_string(), 2),
                ("b.py".to_string(), 1)
            ]
        );
        let order2: Vec<(String, usize)> = second
            .findings
            .iter()
            .map(|f| (f.file.display().to_string(), f.line))
            .collect();
        assert_eq!(order, order2);
    }

    #[test]
    fn test_dedup_per_line_and_kind() {
        // A line matching two LINTING patterns is reported once.
        let result = scan_fixture(&[("app.py", "print(compute(x))\n")]);
        assert_eq!(
            result
                .findings
                .iter()
                .filter(|f| f.kind == DefectKind::Linting)
                .count(),
            1
        );
    }
}
