//! Sprint burndown series.
//!
//! For a sprint window `[start_date, end_date]` and its committed issues,
//! computes per-day completion counts (one point per elapsed day) and the
//! ideal line descending linearly from the total to zero across the whole
//! sprint. An issue counts as completed on day `i` once its `closed_at`
//! falls within the first `i` days of the sprint.

use braid_core::model::{Issue, Sprint};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::instrument;

/// Completion state at the end of one elapsed day.
#[derive(Debug, Clone, Serialize)]
pub struct DailyPoint {
    pub day: i64,
    pub completed: usize,
    pub remaining: usize,
}

/// One step of the ideal line.
#[derive(Debug, Clone, Serialize)]
pub struct IdealPoint {
    pub day: i64,
    pub remaining: usize,
}

/// Burndown report for one sprint.
#[derive(Debug, Clone, Serialize)]
pub struct Burndown {
    pub sprint_id: String,
    pub total_days: i64,
    pub elapsed_days: i64,
    pub total_issues: usize,
    pub completed_issues: usize,
    pub remaining_issues: usize,
    /// One point per elapsed day, day 1 first.
    pub daily_points: Vec<DailyPoint>,
    /// `total_days + 1` points from the full count down to zero.
    pub ideal_line: Vec<IdealPoint>,
}

/// Compute the burndown for `sprint` as of `now`.
///
/// # Errors
///
/// Returns an error when the sprint is missing its date window or the
/// window is inverted.
#[instrument(skip(sprint, issues, now))]
pub fn compute_burndown(
    sprint: &Sprint,
    issues: &[Issue],
    now: DateTime<Utc>,
) -> anyhow::Result<Burndown> {
    let start = sprint
        .start_date
        .ok_or_else(|| anyhow::anyhow!("sprint {} has no start_date", sprint.id))?;
    let end = sprint
        .end_date
        .ok_or_else(|| anyhow::anyhow!("sprint {} has no end_date", sprint.id))?;
    anyhow::ensure!(end > start, "sprint {} has an inverted window", sprint.id);

    let total_days = (end - start).num_days().max(1);
    let elapsed_days = (now - start).num_days().clamp(0, total_days);

    let members: Vec<&Issue> = issues
        .iter()
        .filter(|issue| sprint.bead_ids.contains(&issue.id))
        .collect();
    let total_issues = members.len();

    let completed_by = |cutoff: DateTime<Utc>| {
        members
            .iter()
            .filter(|issue| issue.closed_at.is_some_and(|closed| closed <= cutoff))
            .count()
    };

    let daily_points: Vec<DailyPoint> = (1..=elapsed_days)
        .map(|day| {
            let completed = completed_by(start + Duration::days(day));
            DailyPoint {
                day,
                completed,
                remaining: total_issues - completed,
            }
        })
        .collect();

    // Linear descent to zero; integer rounding keeps the endpoints exact.
    let ideal_line: Vec<IdealPoint> = (0..=total_days)
        .map(|day| {
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let remaining = (total_issues as f64 * (total_days - day) as f64
                / total_days as f64)
                .round() as usize;
            IdealPoint { day, remaining }
        })
        .collect();

    let completed_issues = completed_by(start + Duration::days(elapsed_days));

    Ok(Burndown {
        sprint_id: sprint.id.clone(),
        total_days,
        elapsed_days,
        total_issues,
        completed_issues,
        remaining_issues: total_issues - completed_issues,
        daily_points,
        ideal_line,
    })
}

/// Pick the sprint named by `selector`, where `"current"` means the sprint
/// whose window contains `now` (latest start wins), falling back to the
/// most recently started sprint.
#[must_use]
pub fn select_sprint<'a>(
    sprints: &'a [Sprint],
    selector: &str,
    now: DateTime<Utc>,
) -> Option<&'a Sprint> {
    if selector != "current" {
        return sprints.iter().find(|s| s.id == selector);
    }

    let active = sprints
        .iter()
        .filter(|s| {
            s.start_date.is_some_and(|start| start <= now)
                && s.end_date.is_some_and(|end| end >= now)
        })
        .max_by_key(|s| s.start_date);

    active.or_else(|| {
        sprints
            .iter()
            .filter(|s| s.start_date.is_some())
            .max_by_key(|s| s.start_date)
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
