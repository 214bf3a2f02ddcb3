//! Betweenness centrality via Brandes' algorithm, exact or sampled.
//!
//! # Overview
//!
//! Betweenness measures how often an issue lies on shortest blocking paths
//! between other pairs. High-betweenness issues are bottlenecks: chains of
//! work route through them.
//!
//! # Algorithm
//!
//! Brandes (2001) for unweighted directed graphs: a BFS from each source
//! accumulates shortest-path counts, then dependency scores are summed in
//! reverse BFS order. Complexity O(V·E) over all sources.
//!
//! In approximate mode only a deterministic subset of sources is used — a
//! uniform stride over ascending node indices — and accumulated scores are
//! scaled by `n / |sources|`. A stride keeps sampled runs bit-identical
//! across machines, which the robot output contract requires; random
//! sampling would not.

use std::collections::{HashMap, VecDeque};

use petgraph::graph::NodeIndex;
use petgraph::Direction;
use tracing::instrument;

use crate::cancel::CancelFlag;
use crate::config::BetweennessMode;
use crate::graph::IssueGraph;

/// Scores plus the mode that actually ran.
#[derive(Debug, Clone)]
pub struct BetweennessOutcome {
    /// Betweenness score per issue ID. Unnormalized.
    pub scores: HashMap<String, f64>,
    /// `true` when the sampled estimator produced the scores.
    pub approximate: bool,
}

/// Compute betweenness centrality for every issue.
///
/// `sample_size` is only consulted in [`BetweennessMode::Approximate`]; a
/// zero or over-large sample degrades to exact computation.
#[must_use]
#[instrument(skip(ig, cancel))]
pub fn betweenness_centrality(
    ig: &IssueGraph,
    mode: BetweennessMode,
    sample_size: usize,
    cancel: &CancelFlag,
) -> BetweennessOutcome {
    let g = &ig.graph;
    let n = g.node_count();

    if n == 0 {
        return BetweennessOutcome {
            scores: HashMap::new(),
            approximate: false,
        };
    }

    let sources = source_nodes(n, mode, sample_size);
    let approximate = sources.len() < n;
    #[allow(clippy::cast_precision_loss)]
    let scale = if approximate {
        n as f64 / sources.len() as f64
    } else {
        1.0
    };

    let mut cb: Vec<f64> = vec![0.0; n];

    for s in sources {
        if cancel.is_cancelled() {
            break;
        }
        let s = NodeIndex::new(s);
        let si = s.index();

        let mut stack: Vec<NodeIndex> = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<NodeIndex>> = vec![Vec::new(); n];

        // sigma[t]: number of shortest paths from s to t.
        let mut sigma: Vec<f64> = vec![0.0; n];
        sigma[si] = 1.0;

        let mut dist: Vec<i64> = vec![-1; n];
        dist[si] = 0;

        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        queue.push_back(s);

        while let Some(v) = queue.pop_front() {
            let vi = v.index();
            stack.push(v);

            for w in g.neighbors_directed(v, Direction::Outgoing) {
                let wi = w.index();

                if dist[wi] < 0 {
                    dist[wi] = dist[vi] + 1;
                    queue.push_back(w);
                }

                if dist[wi] == dist[vi] + 1 {
                    sigma[wi] += sigma[vi];
                    predecessors[wi].push(v);
                }
            }
        }

        // Accumulate dependencies in reverse BFS order.
        let mut delta: Vec<f64> = vec![0.0; n];

        while let Some(w) = stack.pop() {
            let wi = w.index();

            for &v in &predecessors[wi] {
                let vi = v.index();
                if sigma[wi] > 0.0 {
                    delta[vi] += (sigma[vi] / sigma[wi]) * (1.0 + delta[wi]);
                }
            }

            if wi != si {
                cb[wi] += delta[wi] * scale;
            }
        }
    }

    let scores = g
        .node_indices()
        .map(|idx| (ig.issue_id(idx).to_string(), cb[idx.index()]))
        .collect();

    BetweennessOutcome {
        scores,
        approximate,
    }
}

/// Pick BFS source indices: every node in exact mode, a uniform stride over
/// ascending indices in approximate mode.
fn source_nodes(n: usize, mode: BetweennessMode, sample_size: usize) -> Vec<usize> {
    if mode == BetweennessMode::Exact || sample_size == 0 || sample_size >= n {
        return (0..n).collect();
    }
    let stride = n.div_ceil(sample_size);
    (0..n).step_by(stride).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
