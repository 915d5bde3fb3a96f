// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fix engine: applies kind-specific textual rewrites to findings

use crate::catalog::DefectKind;
use crate::scanner::Finding;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Outcome of one fix attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixStatus {
    Fixed,
    Failed,
}

/// One attempted repair for a finding.
///
/// Appended to the run's cumulative fix history and never mutated; a
/// failed attempt is recorded as-is rather than retried in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fix {
    pub file: std::path::PathBuf,
    pub kind: DefectKind,
    pub line: usize,
    pub commit_message: String,
    pub detail: String,
    pub status: FixStatus,
}

impl Fix {
    pub fn is_fixed(&self) -> bool {
        self.status == FixStatus::Fixed
    }
}

/// The rewrite selected for a finding.
enum Rewrite {
    /// Blank the line. The line itself is kept (emptied, not removed) so
    /// line numbers from the same scan pass stay valid for later fixes.
    Blank,
    /// Replace the line with new text.
    Replace(String),
    /// No safe mechanical rewrite exists for this kind.
    Unsafe(&'static str),
}

/// Applies the closed kind → rewrite mapping and persists the result.
pub struct FixEngine;

impl FixEngine {
    pub fn new() -> Self {
        Self
    }

    /// Attempt to fix one finding in place.
    ///
    /// Never escalates: any internal error (unreadable file, stale line,
    /// unsafe rewrite) is absorbed into a `Failed` fix record and the
    /// healing loop continues.
    pub fn apply(&self, root: &Path, finding: &Finding, dry_run: bool) -> Fix {
        let (status, detail) = match self.try_apply(root, finding, dry_run) {
            Ok(detail) => (FixStatus::Fixed, detail),
            Err(detail) => (FixStatus::Failed, detail),
        };

        debug!(
            "Fix {:?} for {} at {}:{} ({})",
            status,
            finding.kind,
            finding.file.display(),
            finding.line,
            detail
        );

        let file_name = finding
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| finding.file.display().to_string());

        Fix {
            file: finding.file.clone(),
            kind: finding.kind,
            line: finding.line,
            commit_message: format!(
                "[AI-AGENT] Fix {} in {} line {}",
                finding.kind, file_name, finding.line
            ),
            detail,
            status,
        }
    }

    fn try_apply(
        &self,
        root: &Path,
        finding: &Finding,
        dry_run: bool,
    ) -> Result<String, String> {
        let path = root.join(&finding.file);
        let content = fs::read_to_string(&path)
            .map_err(|e| format!("could not read {}: {}", path.display(), e))?;

        let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
        let idx = finding.line.checked_sub(1).ok_or("invalid line number 0")?;
        let current = lines
            .get(idx)
            .ok_or_else(|| format!("line {} no longer exists", finding.line))?;

        // Guard against stale findings: the line must still carry the
        // text the scanner matched, or the rewrite could hit the wrong code.
        if current.trim() != finding.snippet {
            return Err(format!(
                "line {} changed since scan; refusing to rewrite",
                finding.line
            ));
        }

        // The rewrite is computed from the full current line so leading
        // indentation survives.
        let detail;
        match select_rewrite(finding.kind, current) {
            Rewrite::Blank => {
                detail = match finding.kind {
                    DefectKind::Import => "removed the incomplete import",
                    _ => "removed the offending statement",
                };
                lines[idx].clear();
            }
            Rewrite::Replace(text) => {
                detail = match finding.kind {
                    DefectKind::Syntax => "added the missing ':' terminator",
                    _ => "replaced tabs with 4 spaces",
                };
                lines[idx] = text;
            }
            Rewrite::Unsafe(reason) => return Err(reason.to_string()),
        }

        if dry_run {
            return Ok(format!("would have {} (dry-run)", detail));
        }

        let mut output = lines.join("\n");
        if content.ends_with('\n') {
            output.push('\n');
        }
        fs::write(&path, output)
            .map_err(|e| format!("could not write {}: {}", path.display(), e))?;

        Ok(detail.to_string())
    }
}

impl Default for FixEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// The closed mapping from defect kind to rewrite rule.
fn select_rewrite(kind: DefectKind, line: &str) -> Rewrite {
    match kind {
        DefectKind::Linting => Rewrite::Blank,
        DefectKind::Import => Rewrite::Blank,
        DefectKind::Syntax => Rewrite::Replace(format!("{}:", line.trim_end())),
        DefectKind::Indentation => Rewrite::Replace(line.replace('\t', "    ")),
        // The confused-comprehension heuristic has no rewrite that is
        // guaranteed to preserve intent.
        DefectKind::TypeError => Rewrite::Unsafe("manual review required"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::KindFilter;
    use crate::scanner::Scanner;
    use std::fs;

    fn single_finding(dir: &Path, name: &str, content: &str) -> Finding {
        fs::write(dir.join(name), content).unwrap();
        let result = Scanner::new().scan(dir, &KindFilter::all());
        assert_eq!(result.findings.len(), 1, "fixture must yield one finding");
        result.findings[0].clone()
    }

    #[test]
    fn test_linting_fix_blanks_line() {
        let dir = tempfile::tempdir().unwrap();
        let finding = single_finding(dir.path(), "app.py", "import os\nvalue = 1\n");
        let fix = FixEngine::new().apply(dir.path(), &finding, false);
        assert_eq!(fix.status, FixStatus::Fixed);
        let content = fs::read_to_string(dir.path().join("app.py")).unwrap();
        assert_eq!(content, "\nvalue = 1\n");
    }

    #[test]
    fn test_syntax_fix_appends_colon() {
        let dir = tempfile::tempdir().unwrap();
        let finding = single_finding(dir.path(), "app.py", "def compute(x)\n    return x\n");
        let fix = FixEngine::new().apply(dir.path(), &finding, false);
        assert_eq!(fix.status, FixStatus::Fixed);
        let content = fs::read_to_string(dir.path().join("app.py")).unwrap();
        assert!(content.starts_with("def compute(x):\n"));
    }

    #[test]
    fn test_indentation_fix_expands_tabs() {
        let dir = tempfile::tempdir().unwrap();
        let finding = single_finding(dir.path(), "app.py", "def f():\n\treturn 1\n");
        let fix = FixEngine::new().apply(dir.path(), &finding, false);
        assert_eq!(fix.status, FixStatus::Fixed);
        let content = fs::read_to_string(dir.path().join("app.py")).unwrap();
        assert_eq!(content, "def f():\n    return 1\n");
    }

    #[test]
    fn test_type_error_fix_fails_safely() {
        let dir = tempfile::tempdir().unwrap();
        let original = "pairs = [x for x in data for y]\n";
        let finding = single_finding(dir.path(), "app.py", original);
        let fix = FixEngine::new().apply(dir.path(), &finding, false);
        assert_eq!(fix.status, FixStatus::Failed);
        assert!(fix.detail.contains("manual review"));
        // The file is untouched.
        let content = fs::read_to_string(dir.path().join("app.py")).unwrap();
        assert_eq!(content, original);
    }

    #[test]
    fn test_stale_finding_refused() {
        let dir = tempfile::tempdir().unwrap();
        let finding = single_finding(dir.path(), "app.py", "import os\n");
        fs::write(dir.path().join("app.py"), "import shutil\n").unwrap();
        let fix = FixEngine::new().apply(dir.path(), &finding, false);
        assert_eq!(fix.status, FixStatus::Failed);
        assert!(fix.detail.contains("changed since scan"));
    }

    #[test]
    fn test_dry_run_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let original = "import os\n";
        let finding = single_finding(dir.path(), "app.py", original);
        let fix = FixEngine::new().apply(dir.path(), &finding, true);
        assert_eq!(fix.status, FixStatus::Fixed);
        assert!(fix.detail.contains("dry-run"));
        let content = fs::read_to_string(dir.path().join("app.py")).unwrap();
        assert_eq!(content, original);
    }

    #[test]
    fn test_fix_is_idempotent_per_kind() {
        let fixtures: &[&str] = &[
            "import os\n",
            "def compute(x)\n    return x\n",
            "def f():\n\treturn 1\n",
            "from models import\n",
        ];
        for content in fixtures {
            let dir = tempfile::tempdir().unwrap();
            let finding = single_finding(dir.path(), "app.py", content);
            let fix = FixEngine::new().apply(dir.path(), &finding, false);
            assert_eq!(fix.status, FixStatus::Fixed);

            let rescan = Scanner::new().scan(dir.path(), &KindFilter::all());
            assert!(
                !rescan.findings.contains(&finding),
                "fix for {:?} did not remove the finding",
                finding.kind
            );
        }
    }

    #[test]
    fn test_commit_message_shape() {
        let dir = tempfile::tempdir().unwrap();
        let finding = single_finding(dir.path(), "app.py", "import os\n");
        let fix = FixEngine::new().apply(dir.path(), &finding, false);
        assert_eq!(fix.commit_message, "[AI-AGENT] Fix LINTING in app.py line 1");
    }
}
