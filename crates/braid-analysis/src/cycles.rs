//! Simple-cycle enumeration with an SCC pre-filter.
//!
//! # Overview
//!
//! Cycle detection runs in two stages:
//!
//! 1. **Pre-filter**: Tarjan SCC. When every component is trivial and no
//!    node carries a self-loop the graph is acyclic and enumeration is
//!    skipped entirely — the common case on healthy issue sets.
//! 2. **Enumeration**: Johnson's algorithm (1975) rooted at each node in
//!    ascending index order, restricted to nodes with a higher index, so
//!    every simple cycle is produced exactly once, starting from its
//!    smallest node. Self-loops are emitted as one-element cycles.
//!
//! # Sentinels
//!
//! The stored list is capped; when enumeration produces more cycles than
//! the cap, a final `["CYCLES_TRUNCATED"]` entry marks the cut. A timed-out
//! enumeration is reported by the coordinator as a single
//! `["CYCLE_DETECTION_TIMEOUT"]` entry instead.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::instrument;

use crate::cancel::CancelFlag;
use crate::graph::IssueGraph;

/// Marker entry appended when the stored cycle list was truncated.
pub const CYCLES_TRUNCATED: &str = "CYCLES_TRUNCATED";
/// Marker entry published when cycle enumeration timed out.
pub const CYCLE_DETECTION_TIMEOUT: &str = "CYCLE_DETECTION_TIMEOUT";

/// Return `true` when the graph provably has no cycles (trivial SCCs, no
/// self-loops), letting callers skip enumeration.
#[must_use]
pub fn is_acyclic(graph: &DiGraph<String, ()>) -> bool {
    let has_nontrivial_scc = tarjan_scc(graph).into_iter().any(|scc| scc.len() > 1);
    if has_nontrivial_scc {
        return false;
    }
    !graph
        .node_indices()
        .any(|n| graph.find_edge(n, n).is_some())
}

/// Enumerate simple directed cycles, up to `max` stored entries.
///
/// Cycles are reported as issue-ID paths in edge order, each starting at
/// its smallest node index; generation order is deterministic (ascending
/// root index). When more than `max` cycles exist the list is cut and a
/// [`CYCLES_TRUNCATED`] sentinel appended. A cancelled run returns whatever
/// was collected so far — the coordinator discards it.
#[must_use]
#[instrument(skip(ig, cancel))]
pub fn enumerate_cycles(ig: &IssueGraph, max: usize, cancel: &CancelFlag) -> Vec<Vec<String>> {
    let g = &ig.graph;
    let n = g.node_count();

    if n == 0 || is_acyclic(g) {
        return Vec::new();
    }

    let mut found: Vec<Vec<NodeIndex>> = Vec::new();
    let mut truncated = false;

    // Johnson's outer loop: root cycles at each vertex in ascending order,
    // considering only vertices with index >= root.
    'roots: for root in 0..n {
        if cancel.is_cancelled() {
            break;
        }
        let s = NodeIndex::new(root);

        if g.find_edge(s, s).is_some() {
            if found.len() >= max {
                truncated = true;
                break 'roots;
            }
            found.push(vec![s]);
        }

        let mut blocked = vec![false; n];
        let mut block_map: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut stack: Vec<NodeIndex> = Vec::new();

        if circuit(
            g, s, s, &mut stack, &mut blocked, &mut block_map, &mut found, max, cancel,
        )
        .overflowed
        {
            truncated = true;
            break 'roots;
        }
    }

    let mut cycles: Vec<Vec<String>> = found
        .into_iter()
        .map(|cycle| {
            cycle
                .into_iter()
                .map(|idx| ig.issue_id(idx).to_string())
                .collect()
        })
        .collect();

    if truncated {
        cycles.push(vec![CYCLES_TRUNCATED.to_string()]);
    }

    cycles
}

struct CircuitResult {
    found_cycle: bool,
    overflowed: bool,
}

/// Johnson's `CIRCUIT` procedure rooted at `s`, exploring from `v`.
///
/// Only vertices with index >= s participate, so each simple cycle is
/// discovered exactly once. Neighbors are visited in ascending index order.
#[allow(clippy::too_many_arguments)]
fn circuit(
    g: &DiGraph<String, ()>,
    v: NodeIndex,
    s: NodeIndex,
    stack: &mut Vec<NodeIndex>,
    blocked: &mut Vec<bool>,
    block_map: &mut Vec<Vec<usize>>,
    found: &mut Vec<Vec<NodeIndex>>,
    max: usize,
    cancel: &CancelFlag,
) -> CircuitResult {
    let mut result = CircuitResult {
        found_cycle: false,
        overflowed: false,
    };

    stack.push(v);
    blocked[v.index()] = true;

    let mut neighbors: Vec<NodeIndex> = g
        .neighbors_directed(v, Direction::Outgoing)
        .filter(|w| w.index() >= s.index())
        .collect();
    neighbors.sort_unstable();
    neighbors.dedup();

    for w in neighbors {
        if cancel.is_cancelled() {
            break;
        }

        if w == s {
            // Stack holds a simple path s .. v; the edge v → s closes it.
            if stack.len() > 1 || v != s {
                if found.len() >= max {
                    result.overflowed = true;
                    break;
                }
                found.push(stack.clone());
                result.found_cycle = true;
            }
        } else if !blocked[w.index()] {
            let sub = circuit(g, w, s, stack, blocked, block_map, found, max, cancel);
            result.found_cycle |= sub.found_cycle;
            if sub.overflowed {
                result.overflowed = true;
                break;
            }
        }
    }

    if result.found_cycle {
        unblock(v.index(), blocked, block_map);
    } else {
        for w in g
            .neighbors_directed(v, Direction::Outgoing)
            .filter(|w| w.index() >= s.index())
        {
            if !block_map[w.index()].contains(&v.index()) {
                block_map[w.index()].push(v.index());
            }
        }
    }

    stack.pop();
    result
}

fn unblock(v: usize, blocked: &mut Vec<bool>, block_map: &mut Vec<Vec<usize>>) {
    blocked[v] = false;
    let waiters = std::mem::take(&mut block_map[v]);
    for w in waiters {
        if blocked[w] {
            unblock(w, blocked, block_map);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
