//! PageRank via the iterative power method.
//!
//! # Overview
//!
//! PageRank identifies issues that a lot of other work funnels into. With
//! edges pointing dependent → blocker, rank flows toward foundational
//! blockers: a high-PageRank issue is one whose completion matters to many
//! significant chains.
//!
//! # Algorithm
//!
//! ```text
//! PR(v) = (1 - d) / N + d * Σ PR(u) / out_degree(u)   for each u → v
//! ```
//!
//! with damping `d = 0.85` and convergence when the L1 norm of the rank
//! delta drops below `1e-6`. Dangling nodes (no outgoing edges) distribute
//! their rank uniformly, so the scores remain a probability distribution.

use std::collections::HashMap;

use petgraph::Direction;
use tracing::instrument;

use crate::cancel::CancelFlag;
use crate::graph::IssueGraph;

/// Damping factor: probability of following an edge vs teleporting.
pub const DAMPING: f64 = 0.85;
/// Convergence threshold on the L1 norm of the rank delta.
pub const TOLERANCE: f64 = 1e-6;
/// Iteration cap; the deadline in the coordinator is the real bound.
pub const MAX_ITER: usize = 100;

/// Compute PageRank scores for every issue in the graph.
///
/// Returns an empty map for an empty graph. Stops early and returns the
/// partial state when `cancel` fires; the coordinator discards it.
#[must_use]
#[instrument(skip(ig, cancel))]
pub fn pagerank(ig: &IssueGraph, cancel: &CancelFlag) -> HashMap<String, f64> {
    let g = &ig.graph;
    let n = g.node_count();

    if n == 0 {
        return HashMap::new();
    }

    #[allow(clippy::cast_precision_loss)]
    let n_f64 = n as f64;
    let base = (1.0 - DAMPING) / n_f64;

    let mut ranks = vec![1.0 / n_f64; n];
    let mut new_ranks = vec![0.0_f64; n];

    for _ in 0..MAX_ITER {
        if cancel.is_cancelled() {
            break;
        }

        for r in &mut new_ranks {
            *r = base;
        }

        // Distribute rank along outgoing edges, ascending node order.
        for node in g.node_indices() {
            let idx = node.index();
            let out_degree = g.neighbors_directed(node, Direction::Outgoing).count();

            if out_degree == 0 {
                // Dangling node: spread its rank across all nodes.
                let share = DAMPING * ranks[idx] / n_f64;
                for r in &mut new_ranks {
                    *r += share;
                }
            } else {
                #[allow(clippy::cast_precision_loss)]
                let share = DAMPING * ranks[idx] / out_degree as f64;
                for neighbor in g.neighbors_directed(node, Direction::Outgoing) {
                    new_ranks[neighbor.index()] += share;
                }
            }
        }

        let delta: f64 = ranks
            .iter()
            .zip(new_ranks.iter())
            .map(|(old, new)| (old - new).abs())
            .sum();

        std::mem::swap(&mut ranks, &mut new_ranks);

        if delta < TOLERANCE {
            break;
        }
    }

    g.node_indices()
        .map(|idx| (ig.issue_id(idx).to_string(), ranks[idx.index()]))
        .collect()
}

/// The uniform fallback distribution used when PageRank times out.
#[must_use]
pub fn uniform_pagerank(ig: &IssueGraph) -> HashMap<String, f64> {
    let n = ig.node_count();
    if n == 0 {
        return HashMap::new();
    }
    #[allow(clippy::cast_precision_loss)]
    let share = 1.0 / n as f64;
    ig.graph
        .node_indices()
        .map(|idx| (ig.issue_id(idx).to_string(), share))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::graph_from_edges;

    #[test]
    fn empty_graph_returns_empty() {
        let ig = graph_from_edges(&[], &[]);
        assert!(pagerank(&ig, &CancelFlag::new()).is_empty());
    }

    #[test]
    fn single_node_gets_all_rank() {
        let ig = graph_from_edges(&["A"], &[]);
        let pr = pagerank(&ig, &CancelFlag::new());
        assert!((pr["A"] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn rank_flows_toward_blockers() {
        // A depends on B: edge A → B, so B accumulates rank.
        let ig = graph_from_edges(&["A", "B"], &[("A", "B")]);
        let pr = pagerank(&ig, &CancelFlag::new());
        assert!(pr["B"] > pr["A"], "B ({}) should outrank A ({})", pr["B"], pr["A"]);
    }

    #[test]
    fn chain_end_has_highest_rank() {
        let ig = graph_from_edges(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let pr = pagerank(&ig, &CancelFlag::new());
        assert!(pr["C"] > pr["B"]);
        assert!(pr["B"] > pr["A"]);
    }

    #[test]
    fn scores_sum_to_one() {
        let ig = graph_from_edges(
            &["A", "B", "C", "D"],
            &[("A", "B"), ("B", "C"), ("A", "C"), ("C", "D")],
        );
        let pr = pagerank(&ig, &CancelFlag::new());
        let total: f64 = pr.values().sum();
        assert!((total - 1.0).abs() < 1e-3, "sum = {total}");
    }

    #[test]
    fn symmetric_nodes_get_equal_rank() {
        // A depends on B, C, D: the three blockers are symmetric.
        let ig = graph_from_edges(&["A", "B", "C", "D"], &[("A", "B"), ("A", "C"), ("A", "D")]);
        let pr = pagerank(&ig, &CancelFlag::new());
        assert!((pr["B"] - pr["C"]).abs() < 1e-10);
        assert!((pr["C"] - pr["D"]).abs() < 1e-10);
    }

    #[test]
    fn isolated_nodes_share_rank_evenly() {
        let ig = graph_from_edges(&["A", "B", "C", "D"], &[]);
        let pr = pagerank(&ig, &CancelFlag::new());
        for score in pr.values() {
            assert!((score - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn deterministic_across_runs() {
        let ig = graph_from_edges(
            &["A", "B", "C", "D", "E"],
            &[("A", "B"), ("B", "C"), ("C", "D"), ("A", "E"), ("E", "D")],
        );
        let first = pagerank(&ig, &CancelFlag::new());
        let second = pagerank(&ig, &CancelFlag::new());
        for (id, score) in &first {
            assert_eq!(score.to_bits(), second[id].to_bits(), "{id} differs");
        }
    }

    #[test]
    fn uniform_fallback_is_flat() {
        let ig = graph_from_edges(&["A", "B"], &[("A", "B")]);
        let pr = uniform_pagerank(&ig);
        assert!((pr["A"] - 0.5).abs() < f64::EPSILON);
        assert!((pr["B"] - 0.5).abs() < f64::EPSILON);
    }
}
