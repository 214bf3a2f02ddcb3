//! Alert synthesis over the analyzed issue set.
//!
//! Five alert kinds:
//!
//! - `stale_issue` — open-ish issue idle past the staleness threshold.
//! - `blocking_cascade` — an open issue gating several others.
//! - `long_blocked` — status `blocked` with no movement for days.
//! - `priority_inversion` — a backlog-priority blocker gating a critical
//!   issue.
//! - `critical_cycle` — a dependency cycle containing a P0/P1 issue.
//!
//! Alerts are generated in one pass and sorted by `(type, issue_id)` so
//! robot output is stable. Type and severity filters are pure post-filters.

use std::collections::HashMap;

use braid_core::model::{Issue, Status};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::analyzer::Analyzer;
use crate::cycles::{CYCLES_TRUNCATED, CYCLE_DETECTION_TIMEOUT};
use crate::stats::GraphStats;

/// Alert kind, stable on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    BlockingCascade,
    CriticalCycle,
    LongBlocked,
    PriorityInversion,
    StaleIssue,
}

impl AlertType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BlockingCascade => "blocking_cascade",
            Self::CriticalCycle => "critical_cycle",
            Self::LongBlocked => "long_blocked",
            Self::PriorityInversion => "priority_inversion",
            Self::StaleIssue => "stale_issue",
        }
    }
}

/// Alert severity, ordered for minimum-severity filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Parse a severity name; `None` for unknown input.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// One synthesized alert.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub issue_id: String,
    pub message: String,
    pub generated_at: DateTime<Utc>,
}

/// Per-severity counts for the robot summary block.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertSummary {
    pub total: usize,
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
}

/// Thresholds governing alert generation.
#[derive(Debug, Clone, Copy)]
pub struct AlertThresholds {
    /// Days idle before an issue counts as stale.
    pub stale_days: i64,
    /// Minimum dependents for a blocking cascade.
    pub cascade_min_dependents: usize,
    /// Days in `blocked` before a long-blocked warning.
    pub blocked_days: i64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            stale_days: 14,
            cascade_min_dependents: 3,
            blocked_days: 7,
        }
    }
}

impl Analyzer {
    /// Generate all alerts with default thresholds.
    #[must_use]
    pub fn alerts(&self, stats: &GraphStats, now: DateTime<Utc>) -> Vec<Alert> {
        self.alerts_with(stats, now, AlertThresholds::default())
    }

    /// Generate all alerts with custom thresholds.
    #[must_use]
    #[instrument(skip(self, stats, now, thresholds))]
    pub fn alerts_with(
        &self,
        stats: &GraphStats,
        now: DateTime<Utc>,
        thresholds: AlertThresholds,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let dependents = self.dependents();

        for issue in self.issues().values() {
            if issue.status.is_closed() {
                continue;
            }

            if let Some(alert) = stale_alert(issue, now, thresholds.stale_days) {
                alerts.push(alert);
            }
            if let Some(alert) =
                cascade_alert(issue, &dependents, now, thresholds.cascade_min_dependents)
            {
                alerts.push(alert);
            }
            if let Some(alert) = long_blocked_alert(issue, now, thresholds.blocked_days) {
                alerts.push(alert);
            }
            alerts.extend(self.inversion_alerts(issue, now));
        }

        alerts.extend(critical_cycle_alerts(self.issues(), stats, now));

        alerts.sort_by(|a, b| {
            a.alert_type
                .cmp(&b.alert_type)
                .then_with(|| a.issue_id.cmp(&b.issue_id))
        });
        alerts.dedup_by(|a, b| a.alert_type == b.alert_type && a.issue_id == b.issue_id);
        alerts
    }

    /// Inversion alerts for one high-priority issue gated by backlog work.
    fn inversion_alerts(&self, issue: &Issue, now: DateTime<Utc>) -> Vec<Alert> {
        if issue.priority > 1 {
            return Vec::new();
        }
        issue
            .blocking_deps()
            .filter_map(|target| self.issue(target))
            .filter(|blocker| !blocker.status.is_closed() && blocker.priority >= 3)
            .map(|blocker| Alert {
                alert_type: AlertType::PriorityInversion,
                severity: Severity::Warning,
                issue_id: blocker.id.clone(),
                message: format!(
                    "P{} issue {} blocks P{} issue {}",
                    blocker.priority, blocker.id, issue.priority, issue.id
                ),
                generated_at: now,
            })
            .collect()
    }
}

fn days_since(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
    ts.map(|t| (now - t).num_days())
}

fn stale_alert(issue: &Issue, now: DateTime<Utc>, stale_days: i64) -> Option<Alert> {
    let idle = days_since(issue.updated_at, now)?;
    (idle > stale_days).then(|| Alert {
        alert_type: AlertType::StaleIssue,
        severity: Severity::Warning,
        issue_id: issue.id.clone(),
        message: format!("no updates for {idle} days"),
        generated_at: now,
    })
}

fn cascade_alert(
    issue: &Issue,
    dependents: &HashMap<String, Vec<String>>,
    now: DateTime<Utc>,
    min_dependents: usize,
) -> Option<Alert> {
    let blocked = dependents.get(&issue.id).map_or(0, Vec::len);
    (blocked >= min_dependents).then(|| Alert {
        alert_type: AlertType::BlockingCascade,
        severity: Severity::Info,
        issue_id: issue.id.clone(),
        message: format!("blocks {blocked} other issues"),
        generated_at: now,
    })
}

fn long_blocked_alert(issue: &Issue, now: DateTime<Utc>, blocked_days: i64) -> Option<Alert> {
    if issue.status != Status::Blocked {
        return None;
    }
    let idle = days_since(issue.updated_at, now)?;
    (idle > blocked_days).then(|| Alert {
        alert_type: AlertType::LongBlocked,
        severity: Severity::Warning,
        issue_id: issue.id.clone(),
        message: format!("blocked for {idle} days"),
        generated_at: now,
    })
}

fn critical_cycle_alerts(
    issues: &HashMap<String, Issue>,
    stats: &GraphStats,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for cycle in stats.cycles() {
        // Sentinel entries are bookkeeping, not cycles.
        if cycle.iter().any(|id| id == CYCLES_TRUNCATED || id == CYCLE_DETECTION_TIMEOUT) {
            continue;
        }

        let mut urgent: Vec<&Issue> = cycle
            .iter()
            .filter_map(|id| issues.get(id))
            .filter(|issue| issue.priority <= 1)
            .collect();
        urgent.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));

        if let Some(issue) = urgent.first() {
            alerts.push(Alert {
                alert_type: AlertType::CriticalCycle,
                severity: Severity::Critical,
                issue_id: issue.id.clone(),
                message: format!(
                    "P{} issue {} is part of a dependency cycle: {}",
                    issue.priority,
                    issue.id,
                    cycle.join(" -> ")
                ),
                generated_at: now,
            });
        }
    }

    alerts
}

/// Keep only alerts matching the optional type name and minimum severity.
#[must_use]
pub fn filter_alerts(
    alerts: Vec<Alert>,
    alert_type: Option<&str>,
    min_severity: Option<Severity>,
) -> Vec<Alert> {
    alerts
        .into_iter()
        .filter(|a| alert_type.is_none_or(|t| a.alert_type.as_str() == t))
        .filter(|a| min_severity.is_none_or(|min| a.severity >= min))
        .collect()
}

/// Per-severity counts.
#[must_use]
pub fn summarize(alerts: &[Alert]) -> AlertSummary {
    let mut summary = AlertSummary {
        total: alerts.len(),
        ..AlertSummary::default()
    };
    for alert in alerts {
        match alert.severity {
            Severity::Critical => summary.critical += 1,
            Severity::Warning => summary.warning += 1,
            Severity::Info => summary.info += 1,
        }
    }
    summary
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use braid_core::model::Dependency;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn issue(id: &str, status: Status, priority: i64, idle_days: i64) -> Issue {
        Issue {
            id: id.to_string(),
            status,
            priority,
            created_at: Some(now() - chrono::Duration::days(idle_days + 5)),
            updated_at: Some(now() - chrono::Duration::days(idle_days)),
            ..Issue::default()
        }
    }

    fn alerts_for(issues: &[Issue]) -> Vec<Alert> {
        let analyzer = Analyzer::new(issues);
        let stats = analyzer.analyze();
        analyzer.alerts(&stats, now())
    }

    fn has(alerts: &[Alert], alert_type: AlertType, issue_id: &str) -> bool {
        alerts
            .iter()
            .any(|a| a.alert_type == alert_type && a.issue_id == issue_id)
    }

    #[test]
    fn fresh_issues_raise_nothing() {
        let alerts = alerts_for(&[issue("A", Status::Open, 2, 1)]);
        assert!(alerts.is_empty(), "got {alerts:?}");
    }

    #[test]
    fn stale_issue_warns_past_threshold() {
        let alerts = alerts_for(&[issue("A", Status::Open, 2, 20)]);
        assert!(has(&alerts, AlertType::StaleIssue, "A"));
        assert_eq!(alerts[0].severity, Severity::Warning);
    }

    #[test]
    fn closed_issues_never_alert() {
        let alerts = alerts_for(&[issue("A", Status::Closed, 2, 100)]);
        assert!(alerts.is_empty());
    }

    #[test]
    fn cascade_fires_at_three_dependents() {
        let mut root = issue("ROOT", Status::Open, 1, 1);
        root.title = "Root".to_string();
        let dep = |id: &str| Issue {
            dependencies: vec![Dependency::blocks("ROOT")],
            ..issue(id, Status::Open, 2, 1)
        };
        let alerts = alerts_for(&[root, dep("D1"), dep("D2"), dep("D3")]);

        assert!(has(&alerts, AlertType::BlockingCascade, "ROOT"));
        let cascade = alerts
            .iter()
            .find(|a| a.alert_type == AlertType::BlockingCascade)
            .unwrap();
        assert_eq!(cascade.severity, Severity::Info);
    }

    #[test]
    fn two_dependents_is_not_a_cascade() {
        let root = issue("ROOT", Status::Open, 1, 1);
        let dep = |id: &str| Issue {
            dependencies: vec![Dependency::blocks("ROOT")],
            ..issue(id, Status::Open, 2, 1)
        };
        let alerts = alerts_for(&[root, dep("D1"), dep("D2")]);
        assert!(!has(&alerts, AlertType::BlockingCascade, "ROOT"));
    }

    #[test]
    fn long_blocked_warns() {
        let alerts = alerts_for(&[issue("A", Status::Blocked, 2, 10)]);
        assert!(has(&alerts, AlertType::LongBlocked, "A"));
    }

    #[test]
    fn recently_blocked_does_not_warn() {
        let alerts = alerts_for(&[issue("A", Status::Blocked, 2, 2)]);
        assert!(!has(&alerts, AlertType::LongBlocked, "A"));
    }

    #[test]
    fn priority_inversion_targets_the_blocker() {
        let mut critical = issue("CRIT", Status::Open, 0, 1);
        critical.dependencies = vec![Dependency::blocks("BACKLOG")];
        let backlog = issue("BACKLOG", Status::Open, 4, 1);

        let alerts = alerts_for(&[critical, backlog]);
        assert!(has(&alerts, AlertType::PriorityInversion, "BACKLOG"));
    }

    #[test]
    fn no_inversion_when_blocker_is_urgent_too() {
        let mut critical = issue("CRIT", Status::Open, 0, 1);
        critical.dependencies = vec![Dependency::blocks("OTHER")];
        let other = issue("OTHER", Status::Open, 1, 1);

        let alerts = alerts_for(&[critical, other]);
        assert!(!has(&alerts, AlertType::PriorityInversion, "OTHER"));
    }

    #[test]
    fn critical_cycle_fires_on_p0_member() {
        let cycle_issue = |id: &str, priority: i64, dep: &str| Issue {
            dependencies: vec![Dependency::blocks(dep)],
            ..issue(id, Status::Open, priority, 1)
        };
        let alerts = alerts_for(&[
            cycle_issue("A", 0, "B"),
            cycle_issue("B", 2, "C"),
            cycle_issue("C", 2, "A"),
        ]);

        assert!(has(&alerts, AlertType::CriticalCycle, "A"));
        let cycle = alerts
            .iter()
            .find(|a| a.alert_type == AlertType::CriticalCycle)
            .unwrap();
        assert_eq!(cycle.severity, Severity::Critical);
    }

    #[test]
    fn low_priority_cycle_is_not_critical() {
        let cycle_issue = |id: &str, dep: &str| Issue {
            dependencies: vec![Dependency::blocks(dep)],
            ..issue(id, Status::Open, 3, 1)
        };
        let alerts = alerts_for(&[cycle_issue("A", "B"), cycle_issue("B", "A")]);
        assert!(!alerts.iter().any(|a| a.alert_type == AlertType::CriticalCycle));
    }

    #[test]
    fn filters_are_pure_post_filters() {
        let mut root = issue("ROOT", Status::Open, 1, 1);
        root.updated_at = Some(now() - chrono::Duration::days(1));
        let dep = |id: &str| Issue {
            dependencies: vec![Dependency::blocks("ROOT")],
            ..issue(id, Status::Open, 2, 1)
        };
        let stale = issue("STALE", Status::Open, 3, 20);

        let all = alerts_for(&[root, dep("D1"), dep("D2"), dep("D3"), stale]);
        assert!(all.len() >= 2);

        let only_stale = filter_alerts(all.clone(), Some("stale_issue"), None);
        assert!(only_stale.iter().all(|a| a.alert_type == AlertType::StaleIssue));
        assert!(!only_stale.is_empty());

        let warnings = filter_alerts(all.clone(), None, Some(Severity::Warning));
        assert!(warnings.iter().all(|a| a.severity >= Severity::Warning));

        let summary = summarize(&all);
        assert_eq!(summary.total, all.len());
        assert_eq!(
            summary.total,
            summary.critical + summary.warning + summary.info
        );
    }

    #[test]
    fn severity_parse_round_trips() {
        assert_eq!(Severity::parse("info"), Some(Severity::Info));
        assert_eq!(Severity::parse("warning"), Some(Severity::Warning));
        assert_eq!(Severity::parse("critical"), Some(Severity::Critical));
        assert_eq!(Severity::parse("bogus"), None);
    }
}
