//! The two-phase graph analyzer.
//!
//! # Phases
//!
//! **Phase 1** runs synchronously inside `analyze_async` and publishes the
//! cheap structural metrics: in/out degree, topological order (blockers
//! first), and density. The returned [`GraphStats`] handle exposes them as
//! plain fields.
//!
//! **Phase 2** runs on one background worker per analysis call. Each
//! deadline-guarded sub-algorithm (PageRank, betweenness, HITS, cycle
//! enumeration) executes on its own thread while the worker waits on a
//! channel with a timeout; eigenvector centrality and critical-path depth
//! are fast enough to run inline. Expired algorithms record their degraded
//! result — uniform PageRank, empty maps, a timeout sentinel for cycles —
//! and the abandoned thread is cancelled so it exits within the phase-2
//! budget. One publication step moves every buffer into the handle and
//! flips readiness exactly once.
//!
//! No error escapes this surface: degenerate inputs produce empty,
//! well-typed results with phase 2 ready immediately.

use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use braid_core::model::Issue;
use petgraph::algo::toposort;
use petgraph::Direction;
use tracing::{debug, instrument, warn};

use crate::cancel::CancelFlag;
use crate::config::AnalysisConfig;
use crate::cycles::{self, CYCLE_DETECTION_TIMEOUT};
use crate::graph::IssueGraph;
use crate::metrics;
use crate::stats::{GraphStats, Phase2Buffers};

/// Shared, read-only core handed to the phase-2 worker.
#[derive(Debug)]
struct Core {
    graph: IssueGraph,
    issues: HashMap<String, Issue>,
}

/// Builds the blocking graph for an issue set and runs the two-phase
/// analysis over it.
#[derive(Debug)]
pub struct Analyzer {
    core: Arc<Core>,
    config: Option<AnalysisConfig>,
}

impl Analyzer {
    /// Build the analyzer and its graph from an issue slice.
    #[must_use]
    pub fn new(issues: &[Issue]) -> Self {
        let graph = IssueGraph::build(issues);
        let issue_map = issues
            .iter()
            .map(|issue| (issue.id.clone(), issue.clone()))
            .collect();
        Self {
            core: Arc::new(Core {
                graph,
                issues: issue_map,
            }),
            config: None,
        }
    }

    /// Override the size-based configuration for subsequent analyses.
    pub fn set_config(&mut self, config: Option<AnalysisConfig>) {
        self.config = config;
    }

    /// Number of nodes in the blocking graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.core.graph.node_count()
    }

    /// Number of blocking edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.core.graph.edge_count()
    }

    /// Analyze with the configured (or size-derived) settings; phase 1 is
    /// complete when this returns, phase 2 runs in the background.
    #[must_use]
    pub fn analyze_async(&self) -> Arc<GraphStats> {
        let config = self.config.clone().unwrap_or_else(|| {
            AnalysisConfig::for_size(self.node_count(), self.edge_count())
        });
        self.analyze_async_with(config)
    }

    /// Like [`Analyzer::analyze_async`] with an explicit configuration.
    #[must_use]
    #[instrument(skip(self, config))]
    pub fn analyze_async_with(&self, config: AnalysisConfig) -> Arc<GraphStats> {
        let stats = Arc::new(compute_phase1(&self.core, config.clone()));

        // Empty graph: nothing for phase 2 to do; mark ready immediately.
        if self.node_count() == 0 {
            stats.publish(Phase2Buffers::default());
            return stats;
        }

        let core = Arc::clone(&self.core);
        let worker_stats = Arc::clone(&stats);
        thread::spawn(move || {
            let buffers = compute_phase2(&core, &config);
            worker_stats.publish(buffers);
        });

        stats
    }

    /// Blocking analysis: returns once phase 2 has published.
    #[must_use]
    pub fn analyze(&self) -> Arc<GraphStats> {
        let stats = self.analyze_async();
        stats.wait_for_phase2();
        stats
    }

    /// Blocking analysis with an explicit configuration.
    #[must_use]
    pub fn analyze_with(&self, config: AnalysisConfig) -> Arc<GraphStats> {
        let stats = self.analyze_async_with(config);
        stats.wait_for_phase2();
        stats
    }

    /// Look up one issue by ID.
    #[must_use]
    pub fn issue(&self, id: &str) -> Option<&Issue> {
        self.core.issues.get(id)
    }

    /// The full issue map, for scorers that walk the whole set.
    #[must_use]
    pub fn issues(&self) -> &HashMap<String, Issue> {
        &self.core.issues
    }

    /// All issue IDs, in no particular order.
    #[must_use]
    pub fn all_issue_ids(&self) -> Vec<String> {
        self.core.issues.keys().cloned().collect()
    }

    /// Issues that can be worked on immediately: not closed, and every
    /// blocking dependency whose target exists is closed. Missing blockers
    /// do not block. Sorted by ID for stable output.
    #[must_use]
    pub fn actionable_issues(&self) -> Vec<&Issue> {
        let mut actionable: Vec<&Issue> = self
            .core
            .issues
            .values()
            .filter(|issue| !issue.status.is_closed() && !self.is_blocked(issue))
            .collect();
        actionable.sort_by(|a, b| a.id.cmp(&b.id));
        actionable
    }

    fn is_blocked(&self, issue: &Issue) -> bool {
        issue.blocking_deps().any(|target| {
            self.core
                .issues
                .get(target)
                .is_some_and(|blocker| !blocker.status.is_closed())
        })
    }

    /// IDs of existing issues that block `issue_id`, in dependency order.
    #[must_use]
    pub fn blockers(&self, issue_id: &str) -> Vec<String> {
        let Some(issue) = self.core.issues.get(issue_id) else {
            return Vec::new();
        };
        issue
            .blocking_deps()
            .filter(|target| self.core.issues.contains_key(*target))
            .map(str::to_string)
            .collect()
    }

    /// IDs of non-closed issues that block `issue_id`.
    #[must_use]
    pub fn open_blockers(&self, issue_id: &str) -> Vec<String> {
        let Some(issue) = self.core.issues.get(issue_id) else {
            return Vec::new();
        };
        issue
            .blocking_deps()
            .filter(|target| {
                self.core
                    .issues
                    .get(*target)
                    .is_some_and(|blocker| !blocker.status.is_closed())
            })
            .map(str::to_string)
            .collect()
    }

    /// Reverse blocking map: for each issue, the sorted IDs of issues that
    /// depend on it.
    #[must_use]
    pub fn dependents(&self) -> HashMap<String, Vec<String>> {
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for issue in self.core.issues.values() {
            for target in issue.blocking_deps() {
                if self.core.issues.contains_key(target) {
                    dependents
                        .entry(target.to_string())
                        .or_default()
                        .push(issue.id.clone());
                }
            }
        }
        for ids in dependents.values_mut() {
            ids.sort_unstable();
        }
        dependents
    }
}

// ---------------------------------------------------------------------------
// Phase 1
// ---------------------------------------------------------------------------

fn compute_phase1(core: &Core, config: AnalysisConfig) -> GraphStats {
    let g = &core.graph.graph;
    let node_count = g.node_count();
    let edge_count = g.edge_count();

    let mut out_degree = HashMap::with_capacity(node_count);
    let mut in_degree = HashMap::with_capacity(node_count);
    for node in g.node_indices() {
        let id = core.graph.issue_id(node).to_string();
        out_degree.insert(
            id.clone(),
            g.edges_directed(node, Direction::Outgoing).count(),
        );
        in_degree.insert(id, g.edges_directed(node, Direction::Incoming).count());
    }

    // Blockers-first order: reverse the source-before-target toposort.
    // Cyclic graphs publish an empty order; the cycle list explains why.
    let topological_order = toposort(g, None).map_or_else(
        |_| Vec::new(),
        |sorted| {
            sorted
                .into_iter()
                .rev()
                .map(|idx| core.graph.issue_id(idx).to_string())
                .collect()
        },
    );

    #[allow(clippy::cast_precision_loss)]
    let density = if node_count > 1 {
        edge_count as f64 / (node_count as f64 * (node_count as f64 - 1.0))
    } else {
        0.0
    };

    GraphStats::new(
        out_degree,
        in_degree,
        topological_order,
        density,
        node_count,
        edge_count,
        config,
    )
}

// ---------------------------------------------------------------------------
// Phase 2
// ---------------------------------------------------------------------------

/// Run a kernel on its own thread and wait at most `timeout` for the
/// result. On expiry the kernel's cancel flag is raised and `None`
/// returned; the thread notices the flag at its next iteration and exits,
/// its output discarded.
fn run_with_deadline<T: Send + 'static>(
    name: &'static str,
    timeout: Duration,
    task: impl FnOnce(&CancelFlag) -> T + Send + 'static,
) -> Option<T> {
    let (tx, rx) = mpsc::sync_channel(1);
    let cancel = CancelFlag::new();
    let worker_cancel = cancel.clone();

    let spawned = thread::Builder::new()
        .name(format!("braid-{name}"))
        .spawn(move || {
            let _ = tx.send(task(&worker_cancel));
        });
    if let Err(err) = spawned {
        warn!(algorithm = name, %err, "failed to spawn kernel thread");
        return None;
    }

    match rx.recv_timeout(timeout) {
        Ok(value) => Some(value),
        Err(_) => {
            cancel.cancel();
            warn!(algorithm = name, ?timeout, "kernel deadline expired, degrading");
            None
        }
    }
}

fn compute_phase2(core: &Arc<Core>, config: &AnalysisConfig) -> Phase2Buffers {
    let mut buffers = Phase2Buffers::default();

    if config.compute_pagerank {
        let worker_core = Arc::clone(core);
        buffers.pagerank = run_with_deadline("pagerank", config.timeout_pagerank, move |cancel| {
            metrics::pagerank(&worker_core.graph, cancel)
        })
        .unwrap_or_else(|| metrics::pagerank::uniform_pagerank(&core.graph));
    }

    if config.compute_betweenness {
        let worker_core = Arc::clone(core);
        let mode = config.betweenness_mode;
        let sample = config.betweenness_sample_size;
        let outcome =
            run_with_deadline("betweenness", config.timeout_betweenness, move |cancel| {
                metrics::betweenness_centrality(&worker_core.graph, mode, sample, cancel)
            });
        if let Some(outcome) = outcome {
            buffers.betweenness = outcome.scores;
            buffers.betweenness_is_approximate = outcome.approximate;
        }
    }

    if config.compute_eigenvector {
        buffers.eigenvector = metrics::eigenvector_centrality(&core.graph, &CancelFlag::new());
    }

    // HITS degenerates on edgeless graphs; skip outright.
    if config.compute_hits && core.graph.edge_count() > 0 {
        let worker_core = Arc::clone(core);
        let scores = run_with_deadline("hits", config.timeout_hits, move |cancel| {
            metrics::hits(&worker_core.graph, cancel)
        });
        if let Some(scores) = scores {
            buffers.hubs = scores.hubs;
            buffers.authorities = scores.authorities;
        }
    }

    if config.compute_critical_path {
        buffers.critical_path = metrics::critical_path_depths(&core.graph);
    }

    if config.compute_cycles && !cycles::is_acyclic(&core.graph.graph) {
        let worker_core = Arc::clone(core);
        let max = config.effective_max_cycles();
        let found = run_with_deadline("cycles", config.timeout_cycles, move |cancel| {
            cycles::enumerate_cycles(&worker_core.graph, max, cancel)
        });
        buffers.cycles = found
            .unwrap_or_else(|| vec![vec![CYCLE_DETECTION_TIMEOUT.to_string()]]);
    }

    debug!(
        pagerank = buffers.pagerank.len(),
        betweenness = buffers.betweenness.len(),
        cycles = buffers.cycles.len(),
        "phase 2 buffers computed"
    );
    buffers
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
