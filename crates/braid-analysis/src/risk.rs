//! Volatility and risk signals per issue.
//!
//! Four independent signals, each in `[0, 1]`, combined by weighted sum:
//!
//! - **Fan variance** — coefficient of variation of in/out degrees across
//!   the issue and its immediate blocking neighborhood. An erratic fan
//!   pattern means the dependency structure is still in flux.
//! - **Activity churn** — comment rate plus the fraction of the issue's
//!   lifetime covered by updates.
//! - **Cross-repo risk** — fraction of blocking dependencies living in a
//!   different `source_repo`.
//! - **Status risk** — piecewise by status and idle time: blocked issues
//!   carry inherent risk, in-progress issues grow risky as they go quiet,
//!   open issues only matter once they age.

use std::collections::HashMap;

use braid_core::model::{Issue, Status};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analyzer::Analyzer;
use crate::stats::GraphStats;

/// Relative weight of each signal in the composite.
#[derive(Debug, Clone, Copy)]
pub struct RiskWeights {
    pub fan_variance: f64,
    pub activity_churn: f64,
    pub cross_repo: f64,
    pub status: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            fan_variance: 0.30,
            activity_churn: 0.30,
            cross_repo: 0.20,
            status: 0.20,
        }
    }
}

/// Risk assessment for one issue.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RiskSignals {
    pub fan_variance: f64,
    pub activity_churn: f64,
    pub cross_repo_risk: f64,
    pub status_risk: f64,
    /// Weighted combination, clamped to `[0, 1]`.
    pub composite_risk: f64,
    pub explanation: String,
}

impl Analyzer {
    /// Risk signals for every non-closed issue, keyed by ID.
    #[must_use]
    pub fn all_risk_signals(
        &self,
        stats: &GraphStats,
        now: DateTime<Utc>,
    ) -> HashMap<String, RiskSignals> {
        let weights = RiskWeights::default();
        let dependents = self.dependents();

        self.issues()
            .values()
            .filter(|issue| !issue.status.is_closed())
            .map(|issue| {
                (
                    issue.id.clone(),
                    risk_signals(issue, stats, self.issues(), &dependents, now, weights),
                )
            })
            .collect()
    }
}

/// Compute risk signals for a single issue.
#[must_use]
pub fn risk_signals(
    issue: &Issue,
    stats: &GraphStats,
    issues: &HashMap<String, Issue>,
    dependents: &HashMap<String, Vec<String>>,
    now: DateTime<Utc>,
    weights: RiskWeights,
) -> RiskSignals {
    let mut signals = RiskSignals {
        fan_variance: fan_variance(issue, stats, dependents),
        activity_churn: activity_churn(issue, now),
        cross_repo_risk: cross_repo_risk(issue, issues),
        status_risk: status_risk(issue, now),
        ..RiskSignals::default()
    };

    signals.composite_risk = (signals.fan_variance * weights.fan_variance
        + signals.activity_churn * weights.activity_churn
        + signals.cross_repo_risk * weights.cross_repo
        + signals.status_risk * weights.status)
        .min(1.0);

    signals.explanation = explain(&signals);
    signals
}

/// Coefficient of variation of degrees across the blocking neighborhood,
/// normalized so CV ≥ 2 reads as maximal variance.
fn fan_variance(
    issue: &Issue,
    stats: &GraphStats,
    dependents: &HashMap<String, Vec<String>>,
) -> f64 {
    let mut degrees: Vec<f64> = Vec::new();

    let degree_of = |id: &str| -> (f64, f64) {
        #[allow(clippy::cast_precision_loss)]
        (
            stats.in_degree.get(id).copied().unwrap_or(0) as f64,
            stats.out_degree.get(id).copied().unwrap_or(0) as f64,
        )
    };

    let (in_deg, out_deg) = degree_of(&issue.id);
    degrees.push(in_deg);
    degrees.push(out_deg);

    for target in issue.blocking_deps() {
        let (i, o) = degree_of(target);
        degrees.push(i);
        degrees.push(o);
    }

    if let Some(ids) = dependents.get(&issue.id) {
        for id in ids {
            let (i, o) = degree_of(id);
            degrees.push(i);
            degrees.push(o);
        }
    }

    if degrees.len() < 2 {
        return 0.0;
    }

    let mean = degrees.iter().sum::<f64>() / degrees.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }

    let variance =
        degrees.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / degrees.len() as f64;
    let cv = variance.sqrt() / mean;

    (cv / 2.0).min(1.0)
}

/// Comment rate and update-span coverage, combined 60/40 and clamped.
fn activity_churn(issue: &Issue, now: DateTime<Utc>) -> f64 {
    let Some(created_at) = issue.created_at else {
        return 0.0;
    };

    let age_days = ((now - created_at).num_seconds() as f64 / 86_400.0).max(1.0);

    #[allow(clippy::cast_precision_loss)]
    let comments_per_day = issue.comments.len() as f64 / age_days;

    let update_recency = issue.updated_at.map_or(0.0, |updated_at| {
        let span_days = (updated_at - created_at).num_seconds() as f64 / 86_400.0;
        if span_days > 0.0 && age_days > 1.0 {
            span_days / age_days
        } else {
            0.0
        }
    });

    (comments_per_day * 0.6 + update_recency * 0.4).min(1.0)
}

/// Fraction of blocking dependencies whose `source_repo` differs.
fn cross_repo_risk(issue: &Issue, issues: &HashMap<String, Issue>) -> f64 {
    let Some(this_repo) = issue.source_repo.as_deref() else {
        return 0.0;
    };

    let mut total = 0usize;
    let mut cross = 0usize;

    for target in issue.blocking_deps() {
        total += 1;
        if let Some(dep) = issues.get(target) {
            if dep
                .source_repo
                .as_deref()
                .is_some_and(|repo| repo != this_repo)
            {
                cross += 1;
            }
        }
    }

    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = cross as f64 / total as f64;
    ratio
}

/// Piecewise status risk.
fn status_risk(issue: &Issue, now: DateTime<Utc>) -> f64 {
    let idle_days = |ts: Option<DateTime<Utc>>| {
        ts.map(|t| (now - t).num_seconds() as f64 / 86_400.0)
    };

    match issue.status {
        Status::Blocked => match idle_days(issue.updated_at) {
            Some(days) if days > 7.0 => 0.9,
            _ => 0.7,
        },
        Status::InProgress => match idle_days(issue.updated_at) {
            Some(days) if days > 14.0 => 0.8,
            Some(days) if days > 7.0 => 0.4,
            Some(_) => 0.1,
            None => 0.3,
        },
        Status::Open => match idle_days(issue.created_at) {
            Some(days) if days > 30.0 => 0.3,
            _ => 0.1,
        },
        Status::Closed => 0.0,
    }
}

fn explain(signals: &RiskSignals) -> String {
    if signals.composite_risk < 0.2 {
        return "Low risk - stable dependency structure".to_string();
    }

    let mut factors = Vec::new();
    if signals.fan_variance > 0.5 {
        factors.push("high dependency variance");
    }
    if signals.activity_churn > 0.6 {
        factors.push("high activity churn");
    }
    if signals.cross_repo_risk > 0.3 {
        factors.push("cross-repo dependencies");
    }
    if signals.status_risk > 0.5 {
        factors.push("status indicates potential blockers");
    }

    if factors.is_empty() {
        "Moderate risk".to_string()
    } else {
        format!("Risk factors: {}", factors.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use braid_core::model::{Comment, Dependency};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn base_issue(id: &str) -> Issue {
        Issue {
            id: id.to_string(),
            status: Status::Open,
            created_at: Some(now() - chrono::Duration::days(10)),
            updated_at: Some(now() - chrono::Duration::days(1)),
            ..Issue::default()
        }
    }

    fn analyze(issues: &[Issue]) -> (Analyzer, std::sync::Arc<GraphStats>) {
        let analyzer = Analyzer::new(issues);
        let stats = analyzer.analyze();
        (analyzer, stats)
    }

    #[test]
    fn isolated_fresh_issue_is_low_risk() {
        let issues = vec![base_issue("A")];
        let (analyzer, stats) = analyze(&issues);
        let all = analyzer.all_risk_signals(&stats, now());

        let risk = &all["A"];
        assert!(risk.composite_risk < 0.2, "got {}", risk.composite_risk);
        assert!(risk.explanation.contains("Low risk"));
    }

    #[test]
    fn closed_issues_are_skipped() {
        let mut closed = base_issue("A");
        closed.status = Status::Closed;
        let (analyzer, stats) = analyze(&[closed, base_issue("B")]);
        let all = analyzer.all_risk_signals(&stats, now());
        assert!(!all.contains_key("A"));
        assert!(all.contains_key("B"));
    }

    #[test]
    fn blocked_and_stale_maxes_status_risk() {
        let mut blocked = base_issue("A");
        blocked.status = Status::Blocked;
        blocked.updated_at = Some(now() - chrono::Duration::days(10));
        assert!((status_risk(&blocked, now()) - 0.9).abs() < f64::EPSILON);

        blocked.updated_at = Some(now() - chrono::Duration::days(2));
        assert!((status_risk(&blocked, now()) - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn in_progress_risk_scales_with_idle_time() {
        let mut wip = base_issue("A");
        wip.status = Status::InProgress;

        wip.updated_at = Some(now() - chrono::Duration::days(1));
        assert!((status_risk(&wip, now()) - 0.1).abs() < f64::EPSILON);

        wip.updated_at = Some(now() - chrono::Duration::days(10));
        assert!((status_risk(&wip, now()) - 0.4).abs() < f64::EPSILON);

        wip.updated_at = Some(now() - chrono::Duration::days(20));
        assert!((status_risk(&wip, now()) - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn old_open_issues_gain_risk() {
        let mut old = base_issue("A");
        old.created_at = Some(now() - chrono::Duration::days(60));
        assert!((status_risk(&old, now()) - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn cross_repo_dependencies_raise_risk() {
        let mut a = base_issue("A");
        a.source_repo = Some("repo-one".to_string());
        a.dependencies = vec![Dependency::blocks("B"), Dependency::blocks("C")];

        let mut b = base_issue("B");
        b.source_repo = Some("repo-two".to_string());
        let mut c = base_issue("C");
        c.source_repo = Some("repo-one".to_string());

        let issues: HashMap<String, Issue> =
            [a.clone(), b, c].into_iter().map(|i| (i.id.clone(), i)).collect();

        let risk = cross_repo_risk(&a, &issues);
        assert!((risk - 0.5).abs() < f64::EPSILON, "got {risk}");
    }

    #[test]
    fn no_source_repo_means_no_cross_repo_risk() {
        let a = base_issue("A");
        let issues = HashMap::from([(a.id.clone(), a.clone())]);
        assert!((cross_repo_risk(&a, &issues) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn busy_issue_has_churn() {
        let mut busy = base_issue("A");
        busy.comments = (0..20)
            .map(|_| Comment {
                author: "dev".to_string(),
                text: "ping".to_string(),
                created_at: Some(now()),
            })
            .collect();

        let churn = activity_churn(&busy, now());
        assert!(churn > 0.5, "got {churn}");
        assert!(churn <= 1.0);
    }

    #[test]
    fn uneven_neighborhood_has_fan_variance() {
        // Hub D with many dependents vs leaf blockers.
        let issues = vec![
            Issue {
                dependencies: vec![Dependency::blocks("D")],
                ..base_issue("A")
            },
            Issue {
                dependencies: vec![Dependency::blocks("D")],
                ..base_issue("B")
            },
            Issue {
                dependencies: vec![Dependency::blocks("D")],
                ..base_issue("C")
            },
            base_issue("D"),
        ];
        let (analyzer, stats) = analyze(&issues);
        let all = analyzer.all_risk_signals(&stats, now());

        assert!(all["D"].fan_variance > 0.0);
    }

    #[test]
    fn composite_is_clamped() {
        let mut nasty = base_issue("A");
        nasty.status = Status::Blocked;
        nasty.updated_at = Some(now() - chrono::Duration::days(30));
        nasty.comments = (0..100)
            .map(|_| Comment {
                author: String::new(),
                text: String::new(),
                created_at: None,
            })
            .collect();

        let (analyzer, stats) = analyze(&[nasty]);
        let all = analyzer.all_risk_signals(&stats, now());
        assert!(all["A"].composite_risk <= 1.0);
    }
}
