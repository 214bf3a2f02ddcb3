//! The shared two-phase analysis result.
//!
//! # Contract
//!
//! Phase-1 fields are plain public fields, fully populated before the handle
//! is returned to the caller and never mutated afterwards — no
//! synchronization is needed to read them.
//!
//! Phase-2 fields live behind a reader/writer lock and transition exactly
//! once from empty to published. The background worker computes into local
//! buffers and hands them to [`GraphStats::publish`], which assigns every
//! map under one write lock, flips the readiness flag, and wakes blocked
//! waiters. Any reader that observes `is_phase2_ready() == true` sees the
//! complete published contents.
//!
//! Snapshot accessors clone the underlying maps so callers can iterate
//! without holding any lock; per-key accessors return `0.0` before
//! publication or for unknown ids.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex, RwLock};

use crate::config::AnalysisConfig;

/// Buffers produced by the phase-2 worker, moved into the handle on publish.
#[derive(Debug, Default)]
pub struct Phase2Buffers {
    pub pagerank: HashMap<String, f64>,
    pub betweenness: HashMap<String, f64>,
    pub eigenvector: HashMap<String, f64>,
    pub hubs: HashMap<String, f64>,
    pub authorities: HashMap<String, f64>,
    pub critical_path: HashMap<String, f64>,
    pub cycles: Vec<Vec<String>>,
    /// Set when betweenness actually ran in sampled mode.
    pub betweenness_is_approximate: bool,
}

#[derive(Debug, Default)]
struct Phase2 {
    ready: bool,
    data: Phase2Buffers,
}

/// Result handle for one analysis run.
#[derive(Debug)]
pub struct GraphStats {
    /// Number of blocking dependencies each issue has (edges out).
    pub out_degree: HashMap<String, usize>,
    /// Number of issues depending on each issue (edges in).
    pub in_degree: HashMap<String, usize>,
    /// Blockers-first ordering: for every edge `u → v`, `v` precedes `u`.
    /// Empty when the blocking graph contains a cycle.
    pub topological_order: Vec<String>,
    /// `|E| / (|V|·(|V|−1))` for `|V| > 1`, else 0.
    pub density: f64,
    pub node_count: usize,
    pub edge_count: usize,
    /// The configuration this analysis ran with, frozen at phase 1.
    pub config: AnalysisConfig,

    phase2: RwLock<Phase2>,
    latch: Mutex<bool>,
    latch_cv: Condvar,
}

impl GraphStats {
    /// Create a handle with phase-1 fields populated and phase 2 pending.
    #[must_use]
    pub(crate) fn new(
        out_degree: HashMap<String, usize>,
        in_degree: HashMap<String, usize>,
        topological_order: Vec<String>,
        density: f64,
        node_count: usize,
        edge_count: usize,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            out_degree,
            in_degree,
            topological_order,
            density,
            node_count,
            edge_count,
            config,
            phase2: RwLock::new(Phase2::default()),
            latch: Mutex::new(false),
            latch_cv: Condvar::new(),
        }
    }

    /// Create a handle already in the phase-2-ready state with the supplied
    /// values. For tests that need specific metric values without running
    /// the analyzer.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn for_test(
        pagerank: HashMap<String, f64>,
        betweenness: HashMap<String, f64>,
        eigenvector: HashMap<String, f64>,
        hubs: HashMap<String, f64>,
        authorities: HashMap<String, f64>,
        critical_path: HashMap<String, f64>,
        out_degree: HashMap<String, usize>,
        in_degree: HashMap<String, usize>,
        cycles: Vec<Vec<String>>,
        density: f64,
        topological_order: Vec<String>,
    ) -> Self {
        let node_count = out_degree.len();
        let edge_count = out_degree.values().sum();
        let stats = Self::new(
            out_degree,
            in_degree,
            topological_order,
            density,
            node_count,
            edge_count,
            AnalysisConfig::default(),
        );
        stats.publish(Phase2Buffers {
            pagerank,
            betweenness,
            eigenvector,
            hubs,
            authorities,
            critical_path,
            cycles,
            betweenness_is_approximate: false,
        });
        stats
    }

    /// Move the phase-2 buffers into the handle and mark it ready.
    ///
    /// Called exactly once per analysis, by the background worker (or
    /// directly for empty graphs). Publication is atomic: readers see either
    /// nothing or everything.
    pub(crate) fn publish(&self, data: Phase2Buffers) {
        {
            let mut phase2 = self.phase2.write().unwrap_or_else(|e| e.into_inner());
            debug_assert!(!phase2.ready, "phase 2 published twice");
            phase2.data = data;
            phase2.ready = true;
        }
        let mut done = self.latch.lock().unwrap_or_else(|e| e.into_inner());
        *done = true;
        self.latch_cv.notify_all();
    }

    /// Return `true` once phase-2 metrics have been published.
    #[must_use]
    pub fn is_phase2_ready(&self) -> bool {
        self.phase2.read().unwrap_or_else(|e| e.into_inner()).ready
    }

    /// Block until phase-2 publication.
    pub fn wait_for_phase2(&self) {
        let mut done = self.latch.lock().unwrap_or_else(|e| e.into_inner());
        while !*done {
            done = self.latch_cv.wait(done).unwrap_or_else(|e| e.into_inner());
        }
    }

    fn read_metric(&self, pick: impl Fn(&Phase2Buffers) -> Option<f64>) -> f64 {
        let phase2 = self.phase2.read().unwrap_or_else(|e| e.into_inner());
        if !phase2.ready {
            return 0.0;
        }
        pick(&phase2.data).unwrap_or(0.0)
    }

    /// PageRank score for one issue; 0 before readiness or for unknown ids.
    #[must_use]
    pub fn get_pagerank(&self, id: &str) -> f64 {
        self.read_metric(|d| d.pagerank.get(id).copied())
    }

    /// Betweenness centrality for one issue.
    #[must_use]
    pub fn get_betweenness(&self, id: &str) -> f64 {
        self.read_metric(|d| d.betweenness.get(id).copied())
    }

    /// Eigenvector centrality for one issue.
    #[must_use]
    pub fn get_eigenvector(&self, id: &str) -> f64 {
        self.read_metric(|d| d.eigenvector.get(id).copied())
    }

    /// HITS hub score for one issue.
    #[must_use]
    pub fn get_hub(&self, id: &str) -> f64 {
        self.read_metric(|d| d.hubs.get(id).copied())
    }

    /// HITS authority score for one issue.
    #[must_use]
    pub fn get_authority(&self, id: &str) -> f64 {
        self.read_metric(|d| d.authorities.get(id).copied())
    }

    /// Critical-path depth for one issue.
    #[must_use]
    pub fn get_critical_path(&self, id: &str) -> f64 {
        self.read_metric(|d| d.critical_path.get(id).copied())
    }

    fn snapshot_map(&self, pick: impl Fn(&Phase2Buffers) -> &HashMap<String, f64>) -> HashMap<String, f64> {
        let phase2 = self.phase2.read().unwrap_or_else(|e| e.into_inner());
        if !phase2.ready {
            return HashMap::new();
        }
        pick(&phase2.data).clone()
    }

    /// Independent copy of the PageRank map; empty before readiness.
    #[must_use]
    pub fn pagerank(&self) -> HashMap<String, f64> {
        self.snapshot_map(|d| &d.pagerank)
    }

    /// Independent copy of the betweenness map; empty before readiness.
    #[must_use]
    pub fn betweenness(&self) -> HashMap<String, f64> {
        self.snapshot_map(|d| &d.betweenness)
    }

    /// Independent copy of the eigenvector map; empty before readiness.
    #[must_use]
    pub fn eigenvector(&self) -> HashMap<String, f64> {
        self.snapshot_map(|d| &d.eigenvector)
    }

    /// Independent copy of the hub map; empty before readiness.
    #[must_use]
    pub fn hubs(&self) -> HashMap<String, f64> {
        self.snapshot_map(|d| &d.hubs)
    }

    /// Independent copy of the authority map; empty before readiness.
    #[must_use]
    pub fn authorities(&self) -> HashMap<String, f64> {
        self.snapshot_map(|d| &d.authorities)
    }

    /// Independent copy of the critical-path map; empty before readiness.
    #[must_use]
    pub fn critical_path(&self) -> HashMap<String, f64> {
        self.snapshot_map(|d| &d.critical_path)
    }

    /// Independent copy of the detected cycles; empty before readiness.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let phase2 = self.phase2.read().unwrap_or_else(|e| e.into_inner());
        if !phase2.ready {
            return Vec::new();
        }
        phase2.data.cycles.clone()
    }

    /// Whether betweenness ran in sampled mode. Observed by phase 2 on
    /// completion; `false` before readiness.
    #[must_use]
    pub fn betweenness_is_approximate(&self) -> bool {
        let phase2 = self.phase2.read().unwrap_or_else(|e| e.into_inner());
        phase2.ready && phase2.data.betweenness_is_approximate
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
