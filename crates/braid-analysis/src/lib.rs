#![forbid(unsafe_code)]
//! braid-analysis library.
//!
//! Builds a directed blocking graph from a slice of issues and computes
//! structural metrics over it in two phases: cheap metrics synchronously,
//! expensive centralities and cycle enumeration on a background worker with
//! per-algorithm deadlines. Derived layers (impact scores, priority
//! recommendations, risk signals, ETA/capacity, alerts, burndown) sit on
//! top of the shared [`stats::GraphStats`] handle.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod alerts;
pub mod analyzer;
pub mod burndown;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod cycles;
pub mod eta;
pub mod graph;
pub mod metrics;
pub mod risk;
pub mod score;
pub mod stats;

pub use analyzer::Analyzer;
pub use cache::{data_hash, global_cache, AnalysisCache, CachedAnalyzer};
pub use config::{AnalysisConfig, BetweennessMode};
pub use stats::GraphStats;
