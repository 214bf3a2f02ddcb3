//! Graph construction from an issue slice.
//!
//! # Edge Direction
//!
//! An edge `u → v` means "u depends on v" — `v` must close before `u` can
//! start. Reading along an edge therefore leads *toward* blockers; the
//! reversed topological order published by phase 1 lists blockers first.
//!
//! ## Only Blocking Edges
//!
//! Only `blocks` dependencies are materialized (including legacy entries
//! with no kind). `related` and `parent-child` links never influence
//! centrality metrics, topological order, or cycle detection because they
//! do not gate execution order.
//!
//! ## Degenerate Input
//!
//! Malformed entries never fail construction: a dependency on an unknown
//! issue is dropped, duplicate edges collapse to one, and a self-dependency
//! becomes a self-loop (a length-1 cycle for the cycle detector).

use std::collections::HashMap;

use braid_core::model::Issue;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

/// The directed blocking graph over one issue set.
///
/// Nodes are issue IDs in input order, so `NodeIndex` values are dense and
/// deterministic for a given input sequence. Kernels that are sensitive to
/// summation order iterate by ascending index.
#[derive(Debug)]
pub struct IssueGraph {
    /// Directed graph: nodes = issue IDs, edges = blocking relationships.
    pub graph: DiGraph<String, ()>,
    /// Mapping from issue ID to petgraph `NodeIndex`.
    pub node_map: HashMap<String, NodeIndex>,
}

impl IssueGraph {
    /// Build the blocking graph for `issues`.
    ///
    /// Nodes are added in input order; edges only where the dependency is
    /// blocking and its target exists in the set.
    #[must_use]
    pub fn build(issues: &[Issue]) -> Self {
        let mut graph = DiGraph::<String, ()>::new();
        let mut node_map: HashMap<String, NodeIndex> = HashMap::with_capacity(issues.len());

        for issue in issues {
            let idx = graph.add_node(issue.id.clone());
            node_map.insert(issue.id.clone(), idx);
        }

        let mut dropped = 0usize;
        for issue in issues {
            let Some(&u) = node_map.get(&issue.id) else {
                continue;
            };
            for target in issue.blocking_deps() {
                let Some(&v) = node_map.get(target) else {
                    dropped += 1;
                    continue;
                };
                if !graph.contains_edge(u, v) {
                    graph.add_edge(u, v, ());
                }
            }
        }

        if dropped > 0 {
            debug!(dropped, "dropped blocking edges with unknown targets");
        }

        Self { graph, node_map }
    }

    /// Number of nodes (issues) in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of blocking edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Look up the `NodeIndex` for an issue ID.
    #[must_use]
    pub fn node_index(&self, issue_id: &str) -> Option<NodeIndex> {
        self.node_map.get(issue_id).copied()
    }

    /// The issue ID label of a node.
    #[must_use]
    pub fn issue_id(&self, idx: NodeIndex) -> &str {
        self.graph
            .node_weight(idx)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
