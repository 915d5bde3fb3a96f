// SPDX-License-Identifier: AGPL-3.0-or-later
//! Defect catalog: the closed set of defect kinds and their detection patterns

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The closed set of defect classes the agent recognizes.
///
/// Detection and repair are both dispatched on this enum; there is no
/// open-ended plugin surface, so every kind can be tested exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DefectKind {
    Linting,
    Syntax,
    TypeError,
    Indentation,
    Import,
}

impl DefectKind {
    pub const ALL: [DefectKind; 5] = [
        DefectKind::Linting,
        DefectKind::Syntax,
        DefectKind::TypeError,
        DefectKind::Indentation,
        DefectKind::Import,
    ];

    /// Severity assigned to findings of this kind.
    pub fn severity(self) -> Severity {
        match self {
            DefectKind::Syntax | DefectKind::TypeError => Severity::High,
            DefectKind::Import => Severity::Medium,
            DefectKind::Linting | DefectKind::Indentation => Severity::Low,
        }
    }

    /// One-line description of the mechanical repair for this kind.
    pub fn fix_strategy(self) -> &'static str {
        match self {
            DefectKind::Linting => "delete the offending statement line",
            DefectKind::Syntax => "insert the missing ':' block terminator",
            DefectKind::TypeError => "no safe mechanical rewrite; flagged for manual review",
            DefectKind::Indentation => "replace tabs with 4 spaces",
            DefectKind::Import => "delete the dangling import line",
        }
    }
}

impl std::fmt::Display for DefectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefectKind::Linting => write!(f, "LINTING"),
            DefectKind::Syntax => write!(f, "SYNTAX"),
            DefectKind::TypeError => write!(f, "TYPE_ERROR"),
            DefectKind::Indentation => write!(f, "INDENTATION"),
            DefectKind::Import => write!(f, "IMPORT"),
        }
    }
}

impl std::str::FromStr for DefectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "linting" | "lint" => Ok(DefectKind::Linting),
            "syntax" => Ok(DefectKind::Syntax),
            "type_error" | "type" => Ok(DefectKind::TypeError),
            "indentation" | "indent" => Ok(DefectKind::Indentation),
            "import" => Ok(DefectKind::Import),
            _ => Err(format!("Unknown defect kind: {}", s)),
        }
    }
}

/// Finding severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// Per-kind enable/disable filter for a run.
#[derive(Debug, Clone, Default)]
pub struct KindFilter {
    disabled: Vec<DefectKind>,
}

impl KindFilter {
    /// All kinds enabled.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn without(disabled: Vec<DefectKind>) -> Self {
        Self { disabled }
    }

    pub fn disable(&mut self, kind: DefectKind) {
        if !self.disabled.contains(&kind) {
            self.disabled.push(kind);
        }
    }

    pub fn allows(&self, kind: DefectKind) -> bool {
        !self.disabled.contains(&kind)
    }
}

/// A single line-level detection pattern.
#[derive(Debug)]
pub struct DefectPattern {
    pub kind: DefectKind,
    pub pattern: Regex,
    pub description: &'static str,
}

/// The regex-based half of the detection rules.
///
/// SYNTAX and INDENTATION are detected structurally by the scanner; the
/// catalog carries the line patterns for the remaining kinds.
pub struct DefectCatalog {
    patterns: Vec<DefectPattern>,
}

impl DefectCatalog {
    pub fn new() -> Self {
        let table: &[(DefectKind, &str, &str)] = &[
            (
                DefectKind::Linting,
                r"^import (os|sys|math|random|numpy|pandas)\s*$",
                "Unused import statement",
            ),
            (
                DefectKind::Linting,
                r"\bprint\(.+\)",
                "Debug print statement found",
            ),
            (
                DefectKind::TypeError,
                r"for\s+\w+\s+in\s+\w+\s+for\s+",
                "Confused list comprehension",
            ),
            (
                DefectKind::Import,
                r"^import\s*$",
                "Incomplete import statement",
            ),
            (
                DefectKind::Import,
                r"^from\s+\S+\s+import\s*$",
                "Incomplete from import",
            ),
        ];

        let patterns = table
            .iter()
            .map(|(kind, re, description)| DefectPattern {
                kind: *kind,
                // Patterns are compile-time constants; a failure here is a bug.
                pattern: Regex::new(re).unwrap(),
                description,
            })
            .collect();

        Self { patterns }
    }

    pub fn patterns(&self) -> &[DefectPattern] {
        &self.patterns
    }

    pub fn for_kind(&self, kind: DefectKind) -> impl Iterator<Item = &DefectPattern> {
        self.patterns.iter().filter(move |p| p.kind == kind)
    }
}

impl Default for DefectCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("linting".parse::<DefectKind>(), Ok(DefectKind::Linting));
        assert_eq!("TYPE_ERROR".parse::<DefectKind>(), Ok(DefectKind::TypeError));
        assert_eq!("indent".parse::<DefectKind>(), Ok(DefectKind::Indentation));
        assert!("bogus".parse::<DefectKind>().is_err());
    }

    #[test]
    fn test_kind_display_roundtrip() {
        for kind in DefectKind::ALL {
            assert_eq!(kind.to_string().parse::<DefectKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_filter_allows() {
        let mut filter = KindFilter::all();
        assert!(filter.allows(DefectKind::Syntax));
        filter.disable(DefectKind::Syntax);
        assert!(!filter.allows(DefectKind::Syntax));
        assert!(filter.allows(DefectKind::Linting));
    }

    #[test]
    fn test_catalog_patterns_compile() {
        let catalog = DefectCatalog::new();
        assert!(!catalog.patterns().is_empty());
        assert!(catalog.for_kind(DefectKind::Linting).count() >= 2);
        assert_eq!(catalog.for_kind(DefectKind::TypeError).count(), 1);
    }

    #[test]
    fn test_linting_pattern_matches() {
        let catalog = DefectCatalog::new();
        let hit = catalog
            .for_kind(DefectKind::Linting)
            .any(|p| p.pattern.is_match("import os"));
        assert!(hit);
        let miss = catalog
            .for_kind(DefectKind::Linting)
            .any(|p| p.pattern.is_match("import requests"));
        assert!(!miss);
    }
}
