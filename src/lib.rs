// SPDX-License-Identifier: AGPL-3.0-or-later
//! cicd-healer: autonomous CI failure detection and repair
//!
//! This crate provides:
//! - Source scanning for a closed catalog of common defects
//! - Mechanical fix application per defect kind
//! - A simulated pipeline standing in for real CI
//! - A bounded scan → fix → simulate healing loop with scoring

pub mod acquire;
pub mod agent;
pub mod catalog;
pub mod fixer;
pub mod pipeline;
pub mod publish;
pub mod scanner;
pub mod score;

use std::path::Path;
use thiserror::Error;
use tracing::warn;

pub use acquire::{LocalAcquirer, SourceAcquirer, WorkingCopy};
pub use agent::{
    AnalysisResult, CancelFlag, HealRequest, HealingLoop, LoopReport, RunOptions, RunOutcome,
    DEFAULT_MAX_ITERATIONS,
};
pub use catalog::{DefectCatalog, DefectKind, KindFilter, Severity};
pub use fixer::{Fix, FixEngine, FixStatus};
pub use pipeline::{
    PipelineEvaluator, PipelineRun, PipelineState, PipelineStatus, SimulatedPipeline,
};
pub use publish::{branch_name, NoopPublisher, PushOutcome, Publisher};
pub use scanner::{Finding, ScanResult, Scanner};
pub use score::score;

#[derive(Error, Debug)]
pub enum HealerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
    #[error("Acquire failed: {0}")]
    AcquireFailed(String),
    #[error("Publish failed: {0}")]
    PublishFailed(String),
    #[error("Fix failed: {0}")]
    FixFailed(String),
    #[error("Simulation error: {0}")]
    Simulation(String),
}

pub type Result<T> = std::result::Result<T, HealerError>;

/// Main entry point for the healing library.
///
/// Owns the scanner, fix engine, and pipeline evaluator; callers supply
/// the acquire and publish capabilities per run.
pub struct HealingAgent {
    pub scanner: Scanner,
    pub fixer: FixEngine,
    evaluator: Box<dyn PipelineEvaluator>,
}

impl HealingAgent {
    /// Create an agent backed by the built-in simulated pipeline.
    pub fn new() -> Self {
        Self::with_evaluator(Box::new(SimulatedPipeline))
    }

    /// Create an agent with a custom pipeline evaluator.
    pub fn with_evaluator(evaluator: Box<dyn PipelineEvaluator>) -> Self {
        Self {
            scanner: Scanner::new(),
            fixer: FixEngine::new(),
            evaluator,
        }
    }

    /// Scan a working copy without fixing anything.
    pub fn scan(&self, root: &Path, filter: &KindFilter) -> ScanResult {
        self.scanner.scan(root, filter)
    }

    /// One scan followed by one fix attempt per finding.
    pub fn fix_pass(&self, root: &Path, filter: &KindFilter, dry_run: bool) -> (ScanResult, Vec<Fix>) {
        let scan = self.scanner.scan(root, filter);
        let fixes = scan
            .findings
            .iter()
            .map(|finding| self.fixer.apply(root, finding, dry_run))
            .collect();
        (scan, fixes)
    }

    /// Run the healing loop to termination over a local working copy.
    pub fn run_loop(&self, root: &Path, options: &RunOptions) -> LoopReport {
        HealingLoop::new(&self.scanner, &self.fixer, self.evaluator.as_ref()).run(root, options)
    }

    /// Full run: acquire the working copy, heal it, publish, and report.
    ///
    /// Acquisition failures abort the run; publish failures do not, and
    /// are reflected in the result's `push_status` instead.
    pub fn heal(
        &self,
        request: &HealRequest,
        acquirer: &dyn SourceAcquirer,
        publisher: &dyn Publisher,
    ) -> Result<AnalysisResult> {
        let copy = acquirer.materialize(&request.repo, request.token.as_deref())?;
        let report = self.run_loop(copy.root(), &request.options);

        let branch = branch_name(&request.team_name, &request.leader_name);
        let push = match publisher.publish(&copy, &branch) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Publish failed for branch {}: {}", branch, e);
                PushOutcome::failed(e)
            }
        };

        Ok(AnalysisResult::finalize(request, branch, push, report))
    }
}

impl Default for HealingAgent {
    fn default() -> Self {
        Self::new()
    }
}
