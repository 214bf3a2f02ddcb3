//! Impact scoring and priority recommendations.
//!
//! # Impact score
//!
//! A weighted composite over normalized metrics, per open issue:
//!
//! | component       | weight |
//! |-----------------|--------|
//! | PageRank        | 0.30   |
//! | Betweenness     | 0.30   |
//! | Blocker ratio   | 0.20   |
//! | Staleness       | 0.10   |
//! | Priority boost  | 0.10   |
//!
//! PageRank, betweenness, and in-degree are normalized against the
//! per-analysis maxima. Staleness is `min(days_since_update / 30, 1)` so
//! long-idle issues surface. Priority boost maps P0..P4+ onto
//! `1, 0.75, 0.5, 0.25, 0`.
//!
//! # Recommendations
//!
//! Signals (high PageRank, high betweenness, unblock count, staleness) are
//! counted per issue; the composite score maps onto a target priority
//! bucket; a recommendation is emitted only when the bucket differs from
//! the current priority, at least one signal fired, and confidence clears
//! the threshold.

use std::collections::HashMap;

use braid_core::model::Issue;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::analyzer::Analyzer;
use crate::stats::GraphStats;

pub const WEIGHT_PAGERANK: f64 = 0.30;
pub const WEIGHT_BETWEENNESS: f64 = 0.30;
pub const WEIGHT_BLOCKER_RATIO: f64 = 0.20;
pub const WEIGHT_STALENESS: f64 = 0.10;
pub const WEIGHT_PRIORITY_BOOST: f64 = 0.10;

/// Weighted contribution of each component, plus the raw normalized values.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScoreBreakdown {
    pub pagerank: f64,
    pub betweenness: f64,
    pub blocker_ratio: f64,
    pub staleness: f64,
    pub priority_boost: f64,

    pub pagerank_norm: f64,
    pub betweenness_norm: f64,
    pub blocker_ratio_norm: f64,
    pub staleness_norm: f64,
    pub priority_boost_norm: f64,
}

/// Composite impact score for one issue.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactScore {
    pub issue_id: String,
    pub title: String,
    /// Composite score in `[0, 1]`.
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    /// The issue's current priority.
    pub priority: i64,
    pub status: String,
}

impl Analyzer {
    /// Impact scores for every open issue, sorted by score descending and
    /// ID ascending on ties.
    #[must_use]
    #[instrument(skip(self, stats, now))]
    pub fn impact_scores_at(&self, stats: &GraphStats, now: DateTime<Utc>) -> Vec<ImpactScore> {
        let pagerank = stats.pagerank();
        let betweenness = stats.betweenness();

        let max_pr = max_value(&pagerank);
        let max_bw = max_value(&betweenness);
        let max_blockers = stats.in_degree.values().copied().max().unwrap_or(0);

        let mut scores: Vec<ImpactScore> = Vec::new();

        for id in self.issue_ids() {
            let Some(issue) = self.issue(&id) else {
                continue;
            };
            if issue.status.is_closed() {
                continue;
            }

            let pr_norm = normalize(pagerank.get(&id).copied().unwrap_or(0.0), max_pr);
            let bw_norm = normalize(betweenness.get(&id).copied().unwrap_or(0.0), max_bw);
            #[allow(clippy::cast_precision_loss)]
            let blocker_norm = if max_blockers == 0 {
                0.0
            } else {
                stats.in_degree.get(&id).copied().unwrap_or(0) as f64 / max_blockers as f64
            };
            let staleness_norm = staleness(issue.updated_at, now);
            let priority_norm = priority_boost(issue.priority);

            let breakdown = ScoreBreakdown {
                pagerank: pr_norm * WEIGHT_PAGERANK,
                betweenness: bw_norm * WEIGHT_BETWEENNESS,
                blocker_ratio: blocker_norm * WEIGHT_BLOCKER_RATIO,
                staleness: staleness_norm * WEIGHT_STALENESS,
                priority_boost: priority_norm * WEIGHT_PRIORITY_BOOST,
                pagerank_norm: pr_norm,
                betweenness_norm: bw_norm,
                blocker_ratio_norm: blocker_norm,
                staleness_norm,
                priority_boost_norm: priority_norm,
            };

            let score = breakdown.pagerank
                + breakdown.betweenness
                + breakdown.blocker_ratio
                + breakdown.staleness
                + breakdown.priority_boost;

            scores.push(ImpactScore {
                issue_id: id,
                title: issue.title.clone(),
                score,
                breakdown,
                priority: issue.priority,
                status: issue.status.as_str().to_string(),
            });
        }

        scores.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.issue_id.cmp(&b.issue_id))
        });

        scores
    }

    /// Sorted issue IDs, for deterministic iteration.
    fn issue_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.all_issue_ids();
        ids.sort_unstable();
        ids
    }
}

/// Staleness in `[0, 1]`: days since update over a 30-day horizon. Unknown
/// update time reads as moderate staleness.
#[must_use]
pub fn staleness(updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(updated_at) = updated_at else {
        return 0.5;
    };
    let days = (now - updated_at).num_seconds() as f64 / 86_400.0;
    (days / 30.0).clamp(0.0, 1.0)
}

/// Priority boost: P0 = 1.0 down to P4+ = 0.0.
#[must_use]
pub fn priority_boost(priority: i64) -> f64 {
    match priority {
        0 => 1.0,
        1 => 0.75,
        2 => 0.5,
        3 => 0.25,
        _ => 0.0,
    }
}

fn normalize(value: f64, max: f64) -> f64 {
    if max == 0.0 {
        0.0
    } else {
        value / max
    }
}

fn max_value(map: &HashMap<String, f64>) -> f64 {
    map.values().copied().fold(0.0, f64::max)
}

// ---------------------------------------------------------------------------
// Priority recommendations
// ---------------------------------------------------------------------------

/// A suggested priority change for one issue.
#[derive(Debug, Clone, Serialize)]
pub struct PriorityRecommendation {
    pub issue_id: String,
    pub title: String,
    pub current_priority: i64,
    pub suggested_priority: i64,
    pub impact_score: f64,
    /// Higher when more independent signals agree.
    pub confidence: f64,
    pub reasoning: Vec<String>,
    /// `"increase"` (toward P0) or `"decrease"`.
    pub direction: String,
}

/// Thresholds controlling when recommendations fire.
#[derive(Debug, Clone)]
pub struct RecommendationThresholds {
    /// Normalized PageRank above this counts as a signal.
    pub high_pagerank: f64,
    /// Normalized betweenness above this counts as a signal.
    pub high_betweenness: f64,
    /// Days idle before staleness counts as a signal.
    pub staleness_days: i64,
    /// Minimum confidence for a recommendation to be emitted.
    pub min_confidence: f64,
    /// Score-vs-priority mismatch that boosts confidence.
    pub significant_delta: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            high_pagerank: 0.3,
            high_betweenness: 0.5,
            staleness_days: 14,
            min_confidence: 0.3,
            significant_delta: 0.15,
        }
    }
}

impl Analyzer {
    /// Generate priority recommendations with default thresholds, sorted by
    /// confidence descending.
    #[must_use]
    pub fn priority_recommendations(
        &self,
        stats: &GraphStats,
        now: DateTime<Utc>,
    ) -> Vec<PriorityRecommendation> {
        self.priority_recommendations_with(stats, now, &RecommendationThresholds::default())
    }

    /// Generate priority recommendations with custom thresholds.
    #[must_use]
    #[instrument(skip(self, stats, now, thresholds))]
    pub fn priority_recommendations_with(
        &self,
        stats: &GraphStats,
        now: DateTime<Utc>,
        thresholds: &RecommendationThresholds,
    ) -> Vec<PriorityRecommendation> {
        let scores = self.impact_scores_at(stats, now);
        if scores.is_empty() {
            return Vec::new();
        }

        let dependents = self.dependents();

        let mut recommendations: Vec<PriorityRecommendation> = scores
            .iter()
            .filter_map(|score| {
                let unblocks = dependents
                    .get(&score.issue_id)
                    .map_or(0, std::vec::Vec::len);
                recommend(score, unblocks, thresholds)
            })
            .filter(|rec| rec.confidence >= thresholds.min_confidence)
            .collect();

        recommendations.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.issue_id.cmp(&b.issue_id))
        });

        recommendations
    }
}

fn recommend(
    score: &ImpactScore,
    unblocks: usize,
    thresholds: &RecommendationThresholds,
) -> Option<PriorityRecommendation> {
    let mut reasoning = Vec::new();
    let mut signals = 0usize;
    let mut strength = 0.0_f64;

    if score.breakdown.pagerank_norm > thresholds.high_pagerank {
        reasoning.push("High centrality in dependency graph".to_string());
        signals += 1;
        strength += score.breakdown.pagerank_norm;
    }

    if score.breakdown.betweenness_norm > thresholds.high_betweenness {
        reasoning.push("Critical path bottleneck".to_string());
        signals += 1;
        strength += score.breakdown.betweenness_norm;
    }

    #[allow(clippy::cast_precision_loss)]
    match unblocks {
        0 => {}
        1 => {
            reasoning.push("Blocks 1 other item".to_string());
            signals += 1;
            strength += 0.2;
        }
        2 => {
            reasoning.push("Blocks 2 other items".to_string());
            signals += 1;
            strength += 0.3;
        }
        n => {
            reasoning.push(format!("Blocks {n} other items"));
            signals += 1;
            strength += 0.5 + n as f64 / 10.0;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    if score.breakdown.staleness_norm >= thresholds.staleness_days as f64 / 30.0 {
        let days = (score.breakdown.staleness_norm * 30.0) as i64;
        reasoning.push(format!("Stale for {days}+ days"));
        signals += 1;
        strength += 0.2;
    }

    if signals == 0 {
        return None;
    }

    let suggested_priority = score_to_priority(score.score);
    if suggested_priority == score.priority {
        return None;
    }

    let score_delta = (score.score - priority_to_score(score.priority)).abs();
    let confidence = calculate_confidence(signals, strength, score_delta, thresholds);

    let direction = if suggested_priority < score.priority {
        "increase"
    } else {
        "decrease"
    };

    Some(PriorityRecommendation {
        issue_id: score.issue_id.clone(),
        title: score.title.clone(),
        current_priority: score.priority,
        suggested_priority,
        impact_score: score.score,
        confidence,
        reasoning,
        direction: direction.to_string(),
    })
}

/// Map a composite score onto a priority bucket.
#[must_use]
pub fn score_to_priority(score: f64) -> i64 {
    if score >= 0.7 {
        0
    } else if score >= 0.5 {
        1
    } else if score >= 0.3 {
        2
    } else if score >= 0.15 {
        3
    } else {
        4
    }
}

/// The score a priority level implies, for mismatch detection.
fn priority_to_score(priority: i64) -> f64 {
    match priority {
        0 => 0.8,
        1 => 0.6,
        2 => 0.4,
        3 => 0.2,
        _ => 0.1,
    }
}

#[allow(clippy::cast_precision_loss)]
fn calculate_confidence(
    signals: usize,
    strength: f64,
    score_delta: f64,
    thresholds: &RecommendationThresholds,
) -> f64 {
    let signal_confidence = (signals as f64 / 4.0).min(1.0);
    let strength_boost = (strength / 2.0).min(0.3);
    let delta_boost = if score_delta >= thresholds.significant_delta {
        0.2
    } else {
        0.0
    };
    (signal_confidence + strength_boost + delta_boost).min(1.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
