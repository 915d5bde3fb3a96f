// SPDX-License-Identifier: AGPL-3.0-or-later
//! Publishing capability: pushing the healed working copy to a branch

use crate::acquire::WorkingCopy;
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Outcome of a publish attempt, surfaced verbatim in the analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushOutcome {
    pub push_status: String,
    pub branch_url: Option<String>,
}

impl PushOutcome {
    pub fn pushed(branch_url: String) -> Self {
        Self {
            push_status: "Pushed successfully".to_string(),
            branch_url: Some(branch_url),
        }
    }

    pub fn not_pushed() -> Self {
        Self {
            push_status: "Not pushed".to_string(),
            branch_url: None,
        }
    }

    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self {
            push_status: format!("Push failed: {}", reason),
            branch_url: None,
        }
    }
}

/// Capability consumed from the environment to publish the healed copy.
///
/// Commit/push mechanics live behind this seam. A publish failure never
/// invalidates the run: the loop history and score stand, and the
/// failure is reflected in `push_status` only.
pub trait Publisher {
    fn publish(&self, copy: &WorkingCopy, branch: &str) -> Result<PushOutcome>;
}

/// Publisher that records the healed copy without pushing anywhere.
pub struct NoopPublisher;

impl Publisher for NoopPublisher {
    fn publish(&self, copy: &WorkingCopy, branch: &str) -> Result<PushOutcome> {
        info!(
            "Skipping push of {} (branch {} not configured for publishing)",
            copy.root().display(),
            branch
        );
        Ok(PushOutcome::not_pushed())
    }
}

/// Derive the branch name for a run from team and leader metadata.
///
/// Matches the `TEAM_LEADER_AI_Fix` convention: uppercased, spaces
/// collapsed to underscores.
pub fn branch_name(team: &str, leader: &str) -> String {
    format!("{}_{}_AI_Fix", sanitize(team), sanitize(leader))
}

fn sanitize(part: &str) -> String {
    part.trim().to_uppercase().replace(' ', "_")
}
