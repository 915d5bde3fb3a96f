// SPDX-License-Identifier: AGPL-3.0-or-later
//! Pipeline simulation: per-iteration pass/fail verdicts standing in for CI

use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of one validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStatus {
    Running,
    Passed,
    Failed,
}

impl PipelineStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStatus::Passed | PipelineStatus::Failed)
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, PipelineStatus::Passed)
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStatus::Running => write!(f, "RUNNING"),
            PipelineStatus::Passed => write!(f, "PASSED"),
            PipelineStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Record of one simulated pipeline run. One per healing-loop iteration,
/// appended to the run history and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    /// 1-based iteration index.
    pub iteration: usize,
    pub status: PipelineStatus,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of the working copy handed to the evaluator after a fix pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineState {
    /// Findings from the current iteration that remain unresolved.
    pub outstanding_findings: usize,
    /// Fix attempts from the current iteration that failed.
    pub failed_fixes: usize,
}

/// Capability the healing loop consumes to obtain a verdict.
///
/// Real CI integration lives behind this seam; the core only ever calls
/// `evaluate`. Evaluator errors are absorbed by the loop as a FAILED
/// verdict for that iteration, never a run abort.
pub trait PipelineEvaluator {
    fn evaluate(&self, state: &PipelineState) -> Result<PipelineStatus>;
}

/// The built-in, pure verdict function: green iff nothing is left broken.
pub struct SimulatedPipeline;

impl PipelineEvaluator for SimulatedPipeline {
    fn evaluate(&self, state: &PipelineState) -> Result<PipelineStatus> {
        if state.outstanding_findings == 0 && state.failed_fixes == 0 {
            Ok(PipelineStatus::Passed)
        } else {
            Ok(PipelineStatus::Failed)
        }
    }
}
