//! HITS (Hyperlink-Induced Topic Search) hub and authority scores.
//!
//! # Overview
//!
//! - **Hub**: an issue that depends on important blockers.
//! - **Authority**: a blocker that important issues depend on.
//!
//! Iterative mutual reinforcement (Kleinberg, 1999): authority scores sum
//! incoming hub scores, hub scores sum outgoing authority scores, both
//! L2-normalized each round, until the authority vector moves less than the
//! tolerance. Contributions are summed in ascending node-index order for
//! cross-run determinism.
//!
//! Callers skip HITS entirely on edgeless graphs — with no edges every
//! score is zero, normalization divides by zero, and convergence never
//! fires.

use std::collections::HashMap;

use petgraph::Direction;
use tracing::instrument;

use crate::cancel::CancelFlag;
use crate::graph::IssueGraph;

/// Convergence threshold on the L2 norm of the authority delta.
pub const TOLERANCE: f64 = 1e-3;
/// Iteration cap; the coordinator deadline is the real bound.
pub const MAX_ITER: usize = 100;

/// Hub and authority maps produced by [`hits`].
#[derive(Debug, Clone, Default)]
pub struct HitsScores {
    pub hubs: HashMap<String, f64>,
    pub authorities: HashMap<String, f64>,
}

/// Compute HITS scores for every issue.
#[must_use]
#[instrument(skip(ig, cancel))]
pub fn hits(ig: &IssueGraph, cancel: &CancelFlag) -> HitsScores {
    let g = &ig.graph;
    let n = g.node_count();

    if n == 0 {
        return HitsScores::default();
    }

    let mut hub: Vec<f64> = vec![1.0; n];
    let mut auth: Vec<f64> = vec![1.0; n];

    for _ in 0..MAX_ITER {
        if cancel.is_cancelled() {
            break;
        }

        // Authority update: auth(v) = Σ hub(u) for u → v.
        let mut new_auth = vec![0.0; n];
        for v in g.node_indices() {
            let vi = v.index();
            let mut incoming: Vec<usize> = g
                .neighbors_directed(v, Direction::Incoming)
                .map(petgraph::graph::NodeIndex::index)
                .collect();
            incoming.sort_unstable();
            for ui in incoming {
                new_auth[vi] += hub[ui];
            }
        }

        // Hub update: hub(v) = Σ auth(w) for v → w.
        let mut new_hub = vec![0.0; n];
        for v in g.node_indices() {
            let vi = v.index();
            let mut outgoing: Vec<usize> = g
                .neighbors_directed(v, Direction::Outgoing)
                .map(petgraph::graph::NodeIndex::index)
                .collect();
            outgoing.sort_unstable();
            for wi in outgoing {
                new_hub[vi] += new_auth[wi];
            }
        }

        normalize_l2(&mut new_auth);
        normalize_l2(&mut new_hub);

        let diff: f64 = auth
            .iter()
            .zip(new_auth.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();

        auth = new_auth;
        hub = new_hub;

        if diff < TOLERANCE {
            break;
        }
    }

    let mut scores = HitsScores::default();
    for idx in g.node_indices() {
        let id = ig.issue_id(idx).to_string();
        scores.hubs.insert(id.clone(), hub[idx.index()]);
        scores.authorities.insert(id, auth[idx.index()]);
    }
    scores
}

/// Normalize to unit L2 norm; a zero vector is left as-is.
fn normalize_l2(v: &mut [f64]) {
    let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
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
        let scores = hits(&ig, &CancelFlag::new());
        assert!(scores.hubs.is_empty());
        assert!(scores.authorities.is_empty());
    }

    #[test]
    fn shared_blocker_is_the_authority() {
        // A and B both depend on C.
        let ig = graph_from_edges(&["A", "B", "C"], &[("A", "C"), ("B", "C")]);
        let scores = hits(&ig, &CancelFlag::new());

        assert!(
            scores.authorities["C"] > scores.authorities["A"],
            "C auth = {}, A auth = {}",
            scores.authorities["C"],
            scores.authorities["A"]
        );
        assert!(scores.hubs["A"] > scores.hubs["C"]);
        assert!((scores.hubs["A"] - scores.hubs["B"]).abs() < 1e-9);
    }

    #[test]
    fn chain_assigns_both_roles() {
        let ig = graph_from_edges(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let scores = hits(&ig, &CancelFlag::new());
        // B both points and is pointed at; endpoints get one role each.
        assert!(scores.hubs["A"] > 0.0);
        assert!(scores.authorities["C"] > 0.0);
        assert!((scores.hubs["C"] - 0.0).abs() < 1e-9);
        assert!((scores.authorities["A"] - 0.0).abs() < 1e-9);
    }

    #[test]
    fn deterministic_across_runs() {
        let ig = graph_from_edges(
            &["A", "B", "C", "D"],
            &[("A", "C"), ("B", "C"), ("C", "D"), ("A", "D")],
        );
        let first = hits(&ig, &CancelFlag::new());
        let second = hits(&ig, &CancelFlag::new());
        for (id, score) in &first.hubs {
            assert_eq!(score.to_bits(), second.hubs[id].to_bits(), "hub {id} differs");
        }
        for (id, score) in &first.authorities {
            assert_eq!(
                score.to_bits(),
                second.authorities[id].to_bits(),
                "authority {id} differs"
            );
        }
    }
}
