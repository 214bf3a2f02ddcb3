//! Critical-path depth: the longest blocking chain ending at each issue.
//!
//! # Overview
//!
//! With edges pointing dependent → blocker, the depth of a node counts how
//! much work transitively waits behind it: a leaf nobody depends on has
//! depth 1, and a blocker at the bottom of an n-long chain has depth n.
//! Depth doubles as the impact score — delaying a deep node delays every
//! chain that runs through it.
//!
//! # Algorithm
//!
//! One forward pass over the topological order (predecessors first):
//!
//! ```text
//! depth(v) = 1 + max(depth(u) : u → v)
//! ```
//!
//! Defined only for acyclic graphs; a cyclic graph yields an empty map.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::Direction;
use tracing::instrument;

use crate::graph::IssueGraph;

/// Compute the critical-path depth for every issue.
///
/// Returns an empty map when the blocking graph contains a cycle.
#[must_use]
#[instrument(skip(ig))]
pub fn critical_path_depths(ig: &IssueGraph) -> HashMap<String, f64> {
    let g = &ig.graph;

    let Ok(order) = toposort(g, None) else {
        return HashMap::new();
    };

    let mut heights: Vec<f64> = vec![0.0; g.node_count()];
    let mut depths = HashMap::with_capacity(g.node_count());

    for v in order {
        let max_pred_height = g
            .neighbors_directed(v, Direction::Incoming)
            .map(|u| heights[u.index()])
            .fold(0.0_f64, f64::max);
        let height = 1.0 + max_pred_height;
        heights[v.index()] = height;
        depths.insert(ig.issue_id(v).to_string(), height);
    }

    depths
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
