// SPDX-License-Identifier: AGPL-3.0-or-later
//! Final quality score derived from fix count and elapsed time

/// Time budget under which the speed bonus applies, in seconds.
const SPEED_BONUS_CUTOFF_SECS: f64 = 300.0;

/// Fix count above which each additional fix costs points.
const FREE_FIX_ALLOWANCE: usize = 20;

/// Compute the final score for a completed run.
///
/// Starts at 100, adds 10 when the run finished under the time cutoff,
/// subtracts 2 for every fix beyond the allowance, and never goes below
/// zero. Failed fix attempts count toward `total_fixes_applied` by
/// design, so a run that keeps failing the same fix is penalized.
pub fn score(total_fixes_applied: usize, total_time_taken: f64) -> u32 {
    let mut score: i64 = 100;
    if total_time_taken < SPEED_BONUS_CUTOFF_SECS {
        score += 10;
    }
    if total_fixes_applied > FREE_FIX_ALLOWANCE {
        score -= 2 * (total_fixes_applied - FREE_FIX_ALLOWANCE) as i64;
    }
    score.max(0) as u32
}
