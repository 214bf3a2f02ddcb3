//! Centrality and structure metrics over the blocking graph.
//!
//! Each kernel takes the built [`crate::graph::IssueGraph`] and returns
//! per-issue scores keyed by issue ID. Kernels that run under a phase-2
//! deadline also take a [`crate::cancel::CancelFlag`] and poll it once per
//! outer iteration so an abandoned worker terminates promptly.

pub mod betweenness;
pub mod critical_path;
pub mod eigenvector;
pub mod hits;
pub mod pagerank;

pub use betweenness::{betweenness_centrality, BetweennessOutcome};
pub use critical_path::critical_path_depths;
pub use eigenvector::eigenvector_centrality;
pub use hits::{hits, HitsScores};
pub use pagerank::pagerank;
