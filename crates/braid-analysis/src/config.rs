//! Analysis configuration and size-based algorithm selection.
//!
//! Every phase-2 sub-algorithm carries an enable bit, and the four that can
//! exhibit pathological runtimes carry a hard deadline. [`AnalysisConfig::for_size`]
//! maps a graph's `(|V|, |E|)` onto a tier: small graphs get everything with
//! exact betweenness and tight deadlines; larger graphs get longer deadlines,
//! sampled betweenness, smaller cycle caps, and finally fewer algorithms.
//!
//! Degradation is monotone: an algorithm enabled at some size is enabled at
//! every smaller size.

use std::time::Duration;

/// How betweenness centrality is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetweennessMode {
    /// All-pairs Brandes.
    Exact,
    /// Sampled-source estimator using `betweenness_sample_size` sources.
    Approximate,
}

/// Configuration for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    pub compute_pagerank: bool,
    pub compute_betweenness: bool,
    pub compute_eigenvector: bool,
    pub compute_hits: bool,
    pub compute_critical_path: bool,
    pub compute_cycles: bool,

    pub timeout_pagerank: Duration,
    pub timeout_betweenness: Duration,
    pub timeout_hits: Duration,
    pub timeout_cycles: Duration,

    pub betweenness_mode: BetweennessMode,
    /// Number of source nodes in approximate mode. Ignored in exact mode.
    pub betweenness_sample_size: usize,

    /// Cap on stored cycles. Zero means the default of 100.
    pub max_cycles_to_store: usize,
}

/// Default cycle cap applied when `max_cycles_to_store` is zero.
pub const DEFAULT_MAX_CYCLES: usize = 100;

impl Default for AnalysisConfig {
    /// The small-graph tier: everything enabled, exact betweenness.
    fn default() -> Self {
        Self {
            compute_pagerank: true,
            compute_betweenness: true,
            compute_eigenvector: true,
            compute_hits: true,
            compute_critical_path: true,
            compute_cycles: true,
            timeout_pagerank: Duration::from_secs(2),
            timeout_betweenness: Duration::from_secs(3),
            timeout_hits: Duration::from_secs(2),
            timeout_cycles: Duration::from_secs(2),
            betweenness_mode: BetweennessMode::Exact,
            betweenness_sample_size: 0,
            max_cycles_to_store: DEFAULT_MAX_CYCLES,
        }
    }
}

impl AnalysisConfig {
    /// Select a configuration tier for a graph with `nodes` and `edges`.
    ///
    /// Tiers by node count (edges only lengthen the betweenness deadline):
    ///
    /// | nodes      | algorithms                                | betweenness |
    /// |------------|-------------------------------------------|-------------|
    /// | ≤ 500      | all                                       | exact       |
    /// | ≤ 2 500    | all                                       | 128 sources |
    /// | ≤ 10 000   | all but HITS, cycle cap 25                | 64 sources  |
    /// | > 10 000   | PageRank + critical path only             | disabled    |
    #[must_use]
    pub fn for_size(nodes: usize, edges: usize) -> Self {
        let dense = edges > nodes.saturating_mul(4);

        if nodes <= 500 {
            return Self::default();
        }

        if nodes <= 2_500 {
            return Self {
                timeout_pagerank: Duration::from_secs(5),
                timeout_betweenness: Duration::from_secs(if dense { 12 } else { 8 }),
                timeout_hits: Duration::from_secs(5),
                timeout_cycles: Duration::from_secs(4),
                betweenness_mode: BetweennessMode::Approximate,
                betweenness_sample_size: 128,
                max_cycles_to_store: 50,
                ..Self::default()
            };
        }

        if nodes <= 10_000 {
            return Self {
                compute_hits: false,
                timeout_pagerank: Duration::from_secs(10),
                timeout_betweenness: Duration::from_secs(if dense { 20 } else { 15 }),
                timeout_hits: Duration::from_secs(10),
                timeout_cycles: Duration::from_secs(8),
                betweenness_mode: BetweennessMode::Approximate,
                betweenness_sample_size: 64,
                max_cycles_to_store: 25,
                ..Self::default()
            };
        }

        Self {
            compute_betweenness: false,
            compute_eigenvector: false,
            compute_hits: false,
            compute_cycles: false,
            timeout_pagerank: Duration::from_secs(20),
            timeout_betweenness: Duration::from_secs(20),
            timeout_hits: Duration::from_secs(20),
            timeout_cycles: Duration::from_secs(20),
            betweenness_mode: BetweennessMode::Approximate,
            betweenness_sample_size: 32,
            max_cycles_to_store: 10,
            ..Self::default()
        }
    }

    /// The effective cycle cap (zero maps to [`DEFAULT_MAX_CYCLES`]).
    #[must_use]
    pub fn effective_max_cycles(&self) -> usize {
        if self.max_cycles_to_store == 0 {
            DEFAULT_MAX_CYCLES
        } else {
            self.max_cycles_to_store
        }
    }

    /// The set of enabled algorithm names, for diagnostics and tests.
    #[must_use]
    pub fn enabled_algorithms(&self) -> Vec<&'static str> {
        let mut enabled = Vec::new();
        if self.compute_pagerank {
            enabled.push("pagerank");
        }
        if self.compute_betweenness {
            enabled.push("betweenness");
        }
        if self.compute_eigenvector {
            enabled.push("eigenvector");
        }
        if self.compute_hits {
            enabled.push("hits");
        }
        if self.compute_critical_path {
            enabled.push("critical_path");
        }
        if self.compute_cycles {
            enabled.push("cycles");
        }
        enabled
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
