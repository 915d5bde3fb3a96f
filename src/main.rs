// SPDX-License-Identifier: AGPL-3.0-or-later
//! cicd-healer CLI - autonomous CI failure detection and repair
//!
//! Usage:
//!   cicd-healer heal <repo-path>          Run the full healing loop
//!   cicd-healer scan <repo-path>          Scan a repo for defects
//!   cicd-healer fix <repo-path>           Apply one fix pass
//!   cicd-healer fix <repo-path> --dry-run Preview fixes without applying
//!   cicd-healer patterns                  List the defect catalog

use cicd_healer::{
    DefectKind, HealRequest, HealingAgent, KindFilter, LocalAcquirer, NoopPublisher, RunOptions,
    RunOutcome, Severity, DEFAULT_MAX_ITERATIONS,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cicd-healer")]
#[command(about = "Autonomous detect-fix-revalidate agent for broken repositories")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full healing loop over a repository
    Heal {
        /// Path to the repository
        repo_path: PathBuf,
        /// Maximum scan-fix-simulate iterations
        #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
        max_iterations: usize,
        /// Defect kinds to skip (repeatable)
        #[arg(long = "disable", value_name = "KIND")]
        disabled: Vec<DefectKind>,
        /// Team name used for the fix branch
        #[arg(long, default_value = "team")]
        team: String,
        /// Team leader name used for the fix branch
        #[arg(long, default_value = "lead")]
        leader: String,
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
        /// Also write the JSON result to this file
        #[arg(long)]
        report_file: Option<PathBuf>,
    },
    /// Scan a repository for defects
    Scan {
        /// Path to the repository
        repo_path: PathBuf,
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Apply one fix pass over a repository
    Fix {
        /// Path to the repository
        repo_path: PathBuf,
        /// Preview fixes without applying
        #[arg(long)]
        dry_run: bool,
    },
    /// List the defect catalog
    Patterns,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("cicd_healer=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let agent = HealingAgent::new();

    match cli.command {
        Commands::Heal {
            repo_path,
            max_iterations,
            disabled,
            team,
            leader,
            format,
            report_file,
        } => {
            let ok = heal_repo(
                &agent,
                &repo_path,
                max_iterations,
                disabled,
                team,
                leader,
                &format,
                report_file,
            );
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Scan { repo_path, format } => {
            scan_repo(&agent, &repo_path, &format);
        }
        Commands::Fix { repo_path, dry_run } => {
            fix_repo(&agent, &repo_path, dry_run);
        }
        Commands::Patterns => {
            list_patterns(&agent);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn heal_repo(
    agent: &HealingAgent,
    repo_path: &PathBuf,
    max_iterations: usize,
    disabled: Vec<DefectKind>,
    team: String,
    leader: String,
    format: &str,
    report_file: Option<PathBuf>,
) -> bool {
    info!("Healing repository: {}", repo_path.display());

    let mut request = HealRequest::for_repo(repo_path.display().to_string());
    request.team_name = team;
    request.leader_name = leader;
    request.options = RunOptions {
        max_iterations,
        filter: KindFilter::without(disabled),
        ..RunOptions::default()
    };

    let result = match agent.heal(&request, &LocalAcquirer, &NoopPublisher) {
        Ok(result) => result,
        Err(e) => {
            error!("Heal failed: {}", e);
            return false;
        }
    };

    if let Some(path) = report_file {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    error!("Could not write report to {}: {}", path.display(), e);
                }
            }
            Err(e) => error!("Could not serialize report: {}", e),
        }
    }

    if format == "json" {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Could not serialize result: {}", e),
        }
    } else {
        println!("\n=== Healing Summary ===");
        println!("Repo: {}", result.repo);
        println!("Outcome: {}", result.outcome);
        println!("Iterations: {}", result.total_iterations);
        println!("Failures detected: {}", result.total_failures_detected);
        println!("Fixes applied: {}", result.total_fixes_applied);
        println!("Time taken: {:.2}s", result.total_time_taken);
        println!("Score: {}", result.score);
        println!("Branch: {}", result.branch_name);
        println!("Push: {}", result.push_status);

        if !result.pipeline_runs.is_empty() {
            println!("\nPipeline history:");
            for run in &result.pipeline_runs {
                println!("  #{} {} at {}", run.iteration, run.status, run.timestamp);
            }
        }
    }

    result.outcome == RunOutcome::Passed
}

fn scan_repo(agent: &HealingAgent, repo_path: &PathBuf, format: &str) {
    info!("Scanning repository: {}", repo_path.display());

    let result = agent.scan(repo_path, &KindFilter::all());

    if format == "json" {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Could not serialize result: {}", e),
        }
        return;
    }

    println!("\n{}", result.summary());
    println!();

    for finding in &result.findings {
        let severity_icon = match finding.severity {
            Severity::High => "🔴",
            Severity::Medium => "🟡",
            Severity::Low => "🔵",
        };

        println!(
            "{} [{}] {}:{}",
            severity_icon,
            finding.kind,
            finding.file.display(),
            finding.line
        );
        println!("   {}", finding.description);
        println!("   Fix: {}", finding.kind.fix_strategy());
        println!();
    }
}

fn fix_repo(agent: &HealingAgent, repo_path: &PathBuf, dry_run: bool) {
    let mode = if dry_run { "(dry-run)" } else { "" };
    info!("Fixing repository: {} {}", repo_path.display(), mode);

    let (scan, fixes) = agent.fix_pass(repo_path, &KindFilter::all(), dry_run);
    let fixed = fixes.iter().filter(|f| f.is_fixed()).count();

    println!("\n{}", scan.summary());
    println!("\nFix Results:");
    for fix in &fixes {
        let status = if fix.is_fixed() {
            if dry_run {
                "○ Would apply"
            } else {
                "✓ Applied"
            }
        } else {
            "✗ Failed"
        };
        println!(
            "  {} [{}] {}:{}",
            status,
            fix.kind,
            fix.file.display(),
            fix.line
        );
        println!("    {}", fix.detail);
    }

    println!(
        "\nSummary: {} fixes {}, {} failed",
        fixed,
        if dry_run { "would be applied" } else { "applied" },
        fixes.len() - fixed
    );
}

fn list_patterns(agent: &HealingAgent) {
    println!("Defect Catalog:");
    println!("==============\n");

    for kind in DefectKind::ALL {
        println!("{} (severity: {})", kind, kind.severity());
        println!("  Fix: {}", kind.fix_strategy());
        for pattern in agent.scanner.catalog().for_kind(kind) {
            println!("  Pattern: {} ({})", pattern.pattern, pattern.description);
        }
        println!();
    }
}
