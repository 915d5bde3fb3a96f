// SPDX-License-Identifier: AGPL-3.0-or-later
//! Healing loop: the bounded scan → fix → simulate controller

use crate::catalog::KindFilter;
use crate::fixer::{Fix, FixEngine, FixStatus};
use crate::pipeline::{PipelineEvaluator, PipelineRun, PipelineState, PipelineStatus};
use crate::scanner::Scanner;
use crate::score::score;
use crate::publish::PushOutcome;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default iteration budget for a run.
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// States of the healing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Ready,
    Scanning,
    Fixing,
    Simulating,
    Done,
}

impl LoopState {
    /// Check whether the loop may move from this state to `target`.
    pub fn can_transition_to(self, target: LoopState) -> bool {
        matches!(
            (self, target),
            (LoopState::Ready, LoopState::Scanning)
                | (LoopState::Ready, LoopState::Done)
                | (LoopState::Scanning, LoopState::Fixing)
                | (LoopState::Fixing, LoopState::Simulating)
                | (LoopState::Simulating, LoopState::Scanning)
                | (LoopState::Simulating, LoopState::Done)
        )
    }
}

/// Terminal outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunOutcome {
    /// The pipeline went green within the iteration budget.
    Passed,
    /// The budget ran out with the pipeline still red.
    Exhausted,
    /// The caller cancelled the run between iterations.
    Cancelled,
    /// The budget was zero; no iteration ever started.
    NotRun,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Passed => write!(f, "PASSED"),
            RunOutcome::Exhausted => write!(f, "EXHAUSTED"),
            RunOutcome::Cancelled => write!(f, "CANCELLED"),
            RunOutcome::NotRun => write!(f, "NOT_RUN"),
        }
    }
}

/// Cooperative cancellation flag, checked between iterations (never
/// mid-fix, so a cancelled run leaves no half-applied rewrite behind).
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-run tuning knobs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub max_iterations: usize,
    pub filter: KindFilter,
    pub cancel: CancelFlag,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            filter: KindFilter::all(),
            cancel: CancelFlag::new(),
        }
    }
}

/// Everything needed to drive one full run.
#[derive(Debug, Clone)]
pub struct HealRequest {
    /// Repository identity (URL or local path, depending on the acquirer).
    pub repo: String,
    pub team_name: String,
    pub leader_name: String,
    pub token: Option<String>,
    pub options: RunOptions,
}

impl HealRequest {
    pub fn for_repo(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            team_name: "team".to_string(),
            leader_name: "lead".to_string(),
            token: None,
            options: RunOptions::default(),
        }
    }
}

/// Raw history accumulated by the loop, before finalization.
#[derive(Debug, Clone)]
pub struct LoopReport {
    pub outcome: RunOutcome,
    pub total_findings: usize,
    pub fixes: Vec<Fix>,
    pub pipeline_runs: Vec<PipelineRun>,
    pub elapsed_secs: f64,
}

/// The terminal record of one invocation: the sole externally visible
/// artifact of a run. Constructed once, at loop termination; score and
/// pipeline status are derived here and nowhere else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub repo: String,
    pub team_name: String,
    pub leader_name: String,
    pub branch_name: String,
    pub branch_url: Option<String>,
    pub push_status: String,
    pub total_failures_detected: usize,
    pub total_fixes_applied: usize,
    /// Status of the last pipeline run; `None` when no iteration ran.
    pub pipeline_status: Option<PipelineStatus>,
    pub outcome: RunOutcome,
    pub total_iterations: usize,
    pub total_time_taken: f64,
    pub score: u32,
    pub fixes: Vec<Fix>,
    pub pipeline_runs: Vec<PipelineRun>,
}

impl AnalysisResult {
    /// Finalize a run: derive score and pipeline status from the loop
    /// history and fold in the publish outcome.
    pub fn finalize(
        request: &HealRequest,
        branch_name: String,
        push: PushOutcome,
        report: LoopReport,
    ) -> Self {
        Self {
            repo: request.repo.clone(),
            team_name: request.team_name.clone(),
            leader_name: request.leader_name.clone(),
            branch_name,
            branch_url: push.branch_url,
            push_status: push.push_status,
            total_failures_detected: report.total_findings,
            // Failed attempts count too; see the score module.
            total_fixes_applied: report.fixes.len(),
            pipeline_status: report.pipeline_runs.last().map(|run| run.status),
            outcome: report.outcome,
            total_iterations: report.pipeline_runs.len(),
            total_time_taken: report.elapsed_secs,
            score: score(report.fixes.len(), report.elapsed_secs),
            fixes: report.fixes,
            pipeline_runs: report.pipeline_runs,
        }
    }
}

/// Drives scan → fix → simulate cycles until the pipeline passes, the
/// iteration budget runs out, or the caller cancels.
///
/// Strictly sequential: fixes mutate a single working copy in place, so
/// iterations never overlap and findings are repaired in scan order.
pub struct HealingLoop<'a> {
    scanner: &'a Scanner,
    fixer: &'a FixEngine,
    evaluator: &'a dyn PipelineEvaluator,
}

impl<'a> HealingLoop<'a> {
    pub fn new(
        scanner: &'a Scanner,
        fixer: &'a FixEngine,
        evaluator: &'a dyn PipelineEvaluator,
    ) -> Self {
        Self {
            scanner,
            fixer,
            evaluator,
        }
    }

    /// Run the loop to termination over the working copy at `root`.
    pub fn run(&self, root: &Path, options: &RunOptions) -> LoopReport {
        let started = Instant::now();
        let mut state = LoopState::Ready;
        let mut fixes: Vec<Fix> = Vec::new();
        let mut pipeline_runs: Vec<PipelineRun> = Vec::new();
        let mut total_findings = 0;
        let mut outcome = if options.max_iterations == 0 {
            RunOutcome::NotRun
        } else {
            RunOutcome::Exhausted
        };

        for iteration in 1..=options.max_iterations {
            if options.cancel.is_cancelled() {
                info!("Run cancelled before iteration {}", iteration);
                outcome = RunOutcome::Cancelled;
                break;
            }

            advance(&mut state, LoopState::Scanning);
            info!("Iteration {}/{}", iteration, options.max_iterations);
            let scan = self.scanner.scan(root, &options.filter);
            total_findings += scan.findings.len();
            debug!("{}", scan.summary());

            // An empty scan still goes through the fix and simulate
            // states so every iteration appends exactly one run record.
            advance(&mut state, LoopState::Fixing);
            let mut failed_fixes = 0;
            for finding in &scan.findings {
                let fix = self.fixer.apply(root, finding, false);
                if fix.status == FixStatus::Failed {
                    failed_fixes += 1;
                }
                fixes.push(fix);
            }
            if !scan.findings.is_empty() {
                info!(
                    "Applied {}/{} fixes",
                    scan.findings.len() - failed_fixes,
                    scan.findings.len()
                );
            }

            advance(&mut state, LoopState::Simulating);
            let pipeline_state = PipelineState {
                outstanding_findings: failed_fixes,
                failed_fixes,
            };
            let status = match self.evaluator.evaluate(&pipeline_state) {
                Ok(status) => status,
                Err(e) => {
                    // SIMULATION_ERROR: counts as a red run, never aborts.
                    warn!("Pipeline evaluation failed: {}", e);
                    PipelineStatus::Failed
                }
            };
            pipeline_runs.push(PipelineRun {
                iteration,
                status,
                timestamp: Utc::now(),
            });
            info!("Pipeline verdict: {}", status);

            if status.is_passed() {
                outcome = RunOutcome::Passed;
                break;
            }
        }

        advance(&mut state, LoopState::Done);
        LoopReport {
            outcome,
            total_findings,
            fixes,
            pipeline_runs,
            elapsed_secs: started.elapsed().as_secs_f64(),
        }
    }
}

fn advance(state: &mut LoopState, target: LoopState) {
    debug_assert!(
        state.can_transition_to(target),
        "invalid loop transition {:?} -> {:?}",
        state,
        target
    );
    *state = target;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_state_transitions() {
        assert!(LoopState::Ready.can_transition_to(LoopState::Scanning));
        assert!(LoopState::Scanning.can_transition_to(LoopState::Fixing));
        assert!(LoopState::Fixing.can_transition_to(LoopState::Simulating));
        assert!(LoopState::Simulating.can_transition_to(LoopState::Scanning));
        assert!(LoopState::Simulating.can_transition_to(LoopState::Done));
        assert!(!LoopState::Done.can_transition_to(LoopState::Scanning));
        assert!(!LoopState::Ready.can_transition_to(LoopState::Fixing));
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_cancelled());
        handle.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(RunOutcome::Passed.to_string(), "PASSED");
        assert_eq!(RunOutcome::NotRun.to_string(), "NOT_RUN");
    }
}
