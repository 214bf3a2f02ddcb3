//! Completion estimates: per-issue ETA and team capacity.
//!
//! # Estimation
//!
//! An explicit `estimated_minutes` on the issue wins outright, with high
//! confidence. Otherwise the estimate starts from the median of all known
//! estimates in the set (a fixed default when none exist), scaled by an
//! issue-type weight (epics dwarf chores) and a label-velocity multiplier
//! learned from how long closed issues sharing a label actually took.
//! The multiplier is clamped to `[0.5, 2.0]` so a thin closure history
//! cannot swing an estimate by more than 2×.
//!
//! Worked minutes divide across agents; the high date pads the low one by
//! 50%. Every estimate carries human-readable factor strings explaining
//! which inputs shaped it.

use braid_core::model::{Issue, IssueType};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::instrument;

/// Fallback base estimate when no issue in the set carries one.
pub const DEFAULT_ESTIMATED_MINUTES: i64 = 60;

/// Minutes of focused work per agent-day.
pub const MINUTES_PER_AGENT_DAY: f64 = 8.0 * 60.0;

/// A completion estimate for one issue.
#[derive(Debug, Clone, Serialize)]
pub struct EtaEstimate {
    pub issue_id: String,
    /// Total estimated work, independent of agent count.
    pub estimated_minutes: i64,
    /// Wall-clock days with the given agent count.
    pub estimated_days: f64,
    pub eta_date: DateTime<Utc>,
    /// Pessimistic bound: 1.5× the low estimate.
    pub eta_date_high: DateTime<Utc>,
    /// In `(0, 1]`; explicit estimates score high.
    pub confidence: f64,
    /// Human-readable inputs that shaped the estimate.
    pub factors: Vec<String>,
}

/// Estimate when `issue_id` could be finished by `agents` agents.
///
/// # Errors
///
/// Returns an error when `issue_id` is not in the set or `agents` is zero.
#[instrument(skip(issues, now))]
pub fn estimate_eta(
    issues: &[Issue],
    issue_id: &str,
    agents: usize,
    now: DateTime<Utc>,
) -> anyhow::Result<EtaEstimate> {
    anyhow::ensure!(agents > 0, "agent count must be positive");
    let issue = issues
        .iter()
        .find(|i| i.id == issue_id)
        .ok_or_else(|| anyhow::anyhow!("issue {issue_id} not found"))?;

    let mut factors = Vec::new();

    let (minutes, confidence): (f64, f64) = if let Some(explicit) = issue.estimated_minutes {
        factors.push(format!("estimate: explicit {explicit}m on issue"));
        (explicit.max(1) as f64, 0.9)
    } else {
        let base = median_estimated_minutes(issues);
        factors.push(format!("median: {base}m baseline from known estimates"));

        let weight = type_weight(issue.issue_type);
        factors.push(format!(
            "type: {} x{weight:.2}",
            issue.issue_type.as_str()
        ));

        let (velocity, has_history) = label_velocity(issues, issue);
        if has_history {
            factors.push(format!("velocity: label history x{velocity:.2}"));
        }

        #[allow(clippy::cast_precision_loss)]
        let minutes = base as f64 * weight * velocity;
        (minutes, if has_history { 0.5 } else { 0.35 })
    };

    #[allow(clippy::cast_precision_loss)]
    let estimated_days = minutes / (agents as f64 * MINUTES_PER_AGENT_DAY);

    let eta_date = now + duration_days(estimated_days);
    let eta_date_high = now + duration_days(estimated_days * 1.5);

    #[allow(clippy::cast_possible_truncation)]
    let estimated_minutes = minutes.round() as i64;

    Ok(EtaEstimate {
        issue_id: issue.id.clone(),
        estimated_minutes,
        estimated_days,
        eta_date,
        eta_date_high,
        confidence: confidence.clamp(f64::MIN_POSITIVE, 1.0),
        factors,
    })
}

/// Median of the known `estimated_minutes` in the set, or the default.
#[must_use]
pub fn median_estimated_minutes(issues: &[Issue]) -> i64 {
    let mut known: Vec<i64> = issues.iter().filter_map(|i| i.estimated_minutes).collect();
    if known.is_empty() {
        return DEFAULT_ESTIMATED_MINUTES;
    }
    known.sort_unstable();

    let mid = known.len() / 2;
    if known.len() % 2 == 1 {
        known[mid]
    } else {
        (known[mid - 1] + known[mid]) / 2
    }
}

/// Relative effort by issue type.
#[must_use]
pub fn type_weight(issue_type: IssueType) -> f64 {
    match issue_type {
        IssueType::Epic => 3.0,
        IssueType::Feature => 1.5,
        IssueType::Task | IssueType::Bug => 1.0,
        IssueType::Chore => 0.5,
    }
}

/// Velocity multiplier from closure spans of issues sharing a label, and
/// whether any history informed it.
///
/// A label family that historically closes slower than the set as a whole
/// pushes the multiplier above 1. Clamped to `[0.5, 2.0]`.
fn label_velocity(issues: &[Issue], issue: &Issue) -> (f64, bool) {
    let closure_days = |i: &Issue| -> Option<f64> {
        let closed = i.closed_at?;
        let created = i.created_at?;
        let days = (closed - created).num_seconds() as f64 / 86_400.0;
        (days > 0.0).then_some(days)
    };

    let all_spans: Vec<f64> = issues
        .iter()
        .filter(|i| i.status.is_closed())
        .filter_map(closure_days)
        .collect();

    let closed_any = issues
        .iter()
        .any(|i| i.status.is_closed() && i.closed_at.is_some());
    if all_spans.is_empty() {
        return (1.0, closed_any);
    }

    let label_spans: Vec<f64> = issues
        .iter()
        .filter(|i| i.status.is_closed())
        .filter(|i| i.labels.iter().any(|l| issue.labels.contains(l)))
        .filter_map(closure_days)
        .collect();

    if label_spans.is_empty() {
        return (1.0, closed_any);
    }

    let global = mean(&all_spans);
    let family = mean(&label_spans);
    if global == 0.0 {
        return (1.0, true);
    }

    ((family / global).clamp(0.5, 2.0), true)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Convert fractional days to a duration; negative input is zero.
#[must_use]
pub fn duration_days(days: f64) -> Duration {
    if days <= 0.0 {
        return Duration::zero();
    }
    #[allow(clippy::cast_possible_truncation)]
    Duration::seconds((days * 86_400.0).round() as i64)
}

// ---------------------------------------------------------------------------
// Capacity
// ---------------------------------------------------------------------------

/// Aggregate completion estimate across the open issue set.
#[derive(Debug, Clone, Serialize)]
pub struct CapacityReport {
    pub agents: usize,
    /// The label filter applied, empty when none.
    pub label: String,
    pub open_issue_count: usize,
    /// Sum of per-issue estimates; independent of agent count.
    pub total_minutes: i64,
    pub estimated_days: f64,
}

/// Estimate the days needed for `agents` agents to clear the open issues,
/// optionally restricted to a label.
#[must_use]
#[instrument(skip(issues, now))]
pub fn estimate_capacity(
    issues: &[Issue],
    agents: usize,
    label: Option<&str>,
    now: DateTime<Utc>,
) -> CapacityReport {
    let agents = agents.max(1);

    let open: Vec<&Issue> = issues
        .iter()
        .filter(|i| !i.status.is_closed())
        .filter(|i| label.is_none_or(|l| i.labels.iter().any(|have| have == l)))
        .collect();

    let total_minutes: i64 = open
        .iter()
        .filter_map(|issue| estimate_eta(issues, &issue.id, 1, now).ok())
        .map(|eta| eta.estimated_minutes)
        .sum();

    #[allow(clippy::cast_precision_loss)]
    let estimated_days = total_minutes as f64 / (agents as f64 * MINUTES_PER_AGENT_DAY);

    CapacityReport {
        agents,
        label: label.unwrap_or_default().to_string(),
        open_issue_count: open.len(),
        total_minutes,
        estimated_days,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use braid_core::model::Status;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap()
    }

    fn task(id: &str) -> Issue {
        Issue {
            id: id.to_string(),
            title: format!("Task {id}"),
            status: Status::Open,
            issue_type: IssueType::Task,
            labels: vec!["backend".to_string()],
            ..Issue::default()
        }
    }

    #[test]
    fn basic_estimate_is_positive_and_bounded() {
        let issues = vec![task("t-1")];
        let eta = estimate_eta(&issues, "t-1", 1, now()).expect("estimate");

        assert_eq!(eta.issue_id, "t-1");
        assert!(eta.estimated_minutes > 0);
        assert!(eta.confidence > 0.0 && eta.confidence <= 1.0);
        assert!(eta.eta_date >= now());
        assert!(eta.eta_date_high >= eta.eta_date);
        assert!(!eta.factors.is_empty());
    }

    #[test]
    fn unknown_issue_is_an_error() {
        assert!(estimate_eta(&[], "ghost", 1, now()).is_err());
    }

    #[test]
    fn zero_agents_is_an_error() {
        let issues = vec![task("t-1")];
        assert!(estimate_eta(&issues, "t-1", 0, now()).is_err());
    }

    #[test]
    fn explicit_estimate_wins_with_high_confidence() {
        let mut issue = task("t-1");
        issue.estimated_minutes = Some(120);
        let eta = estimate_eta(&[issue], "t-1", 1, now()).expect("estimate");

        assert_eq!(eta.estimated_minutes, 120);
        assert!(eta.confidence >= 0.3);
        assert!(
            eta.factors.iter().any(|f| f.starts_with("estimate")),
            "factors: {:?}",
            eta.factors
        );
    }

    #[test]
    fn epics_take_longer_than_tasks() {
        let mut epic = task("e-1");
        epic.issue_type = IssueType::Epic;
        let plain = task("t-1");

        let epic_eta = estimate_eta(&[epic], "e-1", 1, now()).expect("epic");
        let task_eta = estimate_eta(&[plain], "t-1", 1, now()).expect("task");

        assert!(
            epic_eta.estimated_days > task_eta.estimated_days,
            "epic {} vs task {}",
            epic_eta.estimated_days,
            task_eta.estimated_days
        );
    }

    #[test]
    fn more_agents_finish_sooner() {
        let issues = vec![task("t-1")];
        let one = estimate_eta(&issues, "t-1", 1, now()).expect("one");
        let two = estimate_eta(&issues, "t-1", 2, now()).expect("two");
        assert!(two.estimated_days < one.estimated_days);
    }

    #[test]
    fn closure_history_adds_velocity_factor() {
        let mut closed = task("c-1");
        closed.status = Status::Closed;
        closed.created_at = Some(now() - Duration::days(10));
        closed.closed_at = Some(now() - Duration::days(7));

        let issues = vec![task("t-1"), closed];
        let eta = estimate_eta(&issues, "t-1", 1, now()).expect("estimate");

        assert!(
            eta.factors.iter().any(|f| f.starts_with("velocity")),
            "factors: {:?}",
            eta.factors
        );
    }

    #[test]
    fn median_handles_odd_even_and_empty() {
        assert_eq!(median_estimated_minutes(&[task("a")]), DEFAULT_ESTIMATED_MINUTES);

        let with = |id: &str, m: i64| Issue {
            estimated_minutes: Some(m),
            ..task(id)
        };

        let odd = vec![with("a", 30), with("b", 60), with("c", 90)];
        assert_eq!(median_estimated_minutes(&odd), 60);

        let even = vec![with("a", 30), with("b", 60), with("c", 90), with("d", 120)];
        assert_eq!(median_estimated_minutes(&even), 75);
    }

    #[test]
    fn duration_days_clamps_negative() {
        assert_eq!(duration_days(0.0), Duration::zero());
        assert_eq!(duration_days(-1.0), Duration::zero());
        assert_eq!(duration_days(1.0), Duration::days(1));
    }

    #[test]
    fn capacity_total_is_agent_independent() {
        let with = |id: &str, m: i64| Issue {
            estimated_minutes: Some(m),
            ..task(id)
        };
        let issues = vec![with("a", 480), with("b", 480), with("c", 480)];

        let one = estimate_capacity(&issues, 1, None, now());
        let three = estimate_capacity(&issues, 3, None, now());

        assert_eq!(one.open_issue_count, 3);
        assert_eq!(one.total_minutes, 1440);
        assert_eq!(three.total_minutes, one.total_minutes);
        assert!(three.estimated_days < one.estimated_days);
    }

    #[test]
    fn capacity_label_filter_narrows_the_set() {
        let mut frontend = task("f-1");
        frontend.labels = vec!["frontend".to_string()];
        let issues = vec![task("b-1"), task("b-2"), frontend];

        let backend = estimate_capacity(&issues, 1, Some("backend"), now());
        assert_eq!(backend.label, "backend");
        assert_eq!(backend.open_issue_count, 2);
    }

    #[test]
    fn capacity_skips_closed_issues() {
        let mut closed = task("c-1");
        closed.status = Status::Closed;
        let issues = vec![task("t-1"), closed];

        let report = estimate_capacity(&issues, 1, None, now());
        assert_eq!(report.open_issue_count, 1);
    }
}
