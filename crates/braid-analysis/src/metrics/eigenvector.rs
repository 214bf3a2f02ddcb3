//! Eigenvector centrality via power iteration.
//!
//! # Overview
//!
//! Eigenvector centrality scores a node by the scores of the nodes pointing
//! at it: being depended on by important issues makes an issue important.
//! This is the dominant eigenvector of the adjacency matrix, approximated
//! with a fixed 50-round power iteration.
//!
//! # Determinism
//!
//! Floating-point summation is order-sensitive, so both the node loop and
//! each node's incoming-neighbor contributions run in ascending node-index
//! order. Node indices are assigned from input order, which the fingerprint
//! cache already pins, so repeated runs produce bit-identical scores.

use std::collections::HashMap;

use petgraph::Direction;
use tracing::instrument;

use crate::cancel::CancelFlag;
use crate::graph::IssueGraph;

/// Fixed number of power-iteration rounds.
pub const ITERATIONS: usize = 50;

/// Compute eigenvector centrality for every issue.
///
/// Sums incoming-edge contributions and L2-normalizes after every round.
/// On a DAG the leading components decay toward the sink side; scores are
/// still useful for ranking and are exactly reproducible.
#[must_use]
#[instrument(skip(ig, cancel))]
pub fn eigenvector_centrality(ig: &IssueGraph, cancel: &CancelFlag) -> HashMap<String, f64> {
    let g = &ig.graph;
    let n = g.node_count();

    if n == 0 {
        return HashMap::new();
    }

    #[allow(clippy::cast_precision_loss)]
    let mut vec_scores = vec![1.0 / n as f64; n];
    let mut work = vec![0.0_f64; n];

    for _ in 0..ITERATIONS {
        if cancel.is_cancelled() {
            break;
        }

        for w in &mut work {
            *w = 0.0;
        }

        for node in g.node_indices() {
            let i = node.index();

            // Collect and sort incoming neighbors for deterministic sums.
            let mut incoming: Vec<usize> = g
                .neighbors_directed(node, Direction::Incoming)
                .map(petgraph::graph::NodeIndex::index)
                .collect();
            incoming.sort_unstable();

            for j in incoming {
                work[i] += vec_scores[j];
            }
        }

        let sum: f64 = work.iter().map(|v| v * v).sum();
        if sum == 0.0 {
            break;
        }
        let norm = 1.0 / sum.sqrt();
        for (v, w) in vec_scores.iter_mut().zip(work.iter()) {
            *v = w * norm;
        }
    }

    g.node_indices()
        .map(|idx| (ig.issue_id(idx).to_string(), vec_scores[idx.index()]))
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
        assert!(eigenvector_centrality(&ig, &CancelFlag::new()).is_empty());
    }

    #[test]
    fn every_node_receives_a_score() {
        let ig = graph_from_edges(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let ev = eigenvector_centrality(&ig, &CancelFlag::new());
        assert_eq!(ev.len(), 3);
    }

    #[test]
    fn cycle_members_share_score() {
        let ig = graph_from_edges(&["A", "B"], &[("A", "B"), ("B", "A")]);
        let ev = eigenvector_centrality(&ig, &CancelFlag::new());
        assert!((ev["A"] - ev["B"]).abs() < 1e-9);
        assert!(ev["A"] > 0.0);
    }

    #[test]
    fn heavily_depended_on_node_scores_higher() {
        // Everyone depends on D inside a cycle-closing mesh so scores persist.
        let ig = graph_from_edges(
            &["A", "B", "C", "D"],
            &[("A", "D"), ("B", "D"), ("C", "D"), ("D", "A")],
        );
        let ev = eigenvector_centrality(&ig, &CancelFlag::new());
        assert!(ev["D"] > ev["B"], "D = {}, B = {}", ev["D"], ev["B"]);
        assert!(ev["D"] > ev["C"]);
    }

    #[test]
    fn scores_are_non_negative() {
        let ig = graph_from_edges(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("A", "C")]);
        for (id, score) in eigenvector_centrality(&ig, &CancelFlag::new()) {
            assert!(score >= 0.0, "{id} = {score}");
        }
    }

    #[test]
    fn bit_identical_across_runs() {
        let ig = graph_from_edges(
            &["A", "B", "C", "D", "E"],
            &[("A", "B"), ("C", "B"), ("D", "B"), ("B", "E"), ("E", "A")],
        );
        let first = eigenvector_centrality(&ig, &CancelFlag::new());
        let second = eigenvector_centrality(&ig, &CancelFlag::new());
        for (id, score) in &first {
            assert_eq!(score.to_bits(), second[id].to_bits(), "{id} differs");
        }
    }
}
