//! Property tests: fingerprint invariance, config monotonicity, metric
//! invariants over generated issue sets.

use braid_analysis::{data_hash, AnalysisConfig, Analyzer};
use braid_core::model::{Dependency, Issue, Status};
use proptest::prelude::*;

/// A compact generated issue: id index, status, and dependency indices.
#[derive(Debug, Clone)]
struct GenIssue {
    id: usize,
    closed: bool,
    deps: Vec<usize>,
}

fn gen_issue_set(max_issues: usize) -> impl Strategy<Value = Vec<GenIssue>> {
    prop::collection::vec(
        (any::<bool>(), prop::collection::vec(0..max_issues, 0..4)),
        1..max_issues,
    )
    .prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(id, (closed, deps))| GenIssue { id, closed, deps })
            .collect()
    })
}

fn materialize(gen: &[GenIssue]) -> Vec<Issue> {
    gen.iter()
        .map(|g| Issue {
            id: format!("I{:03}", g.id),
            title: format!("Issue {}", g.id),
            status: if g.closed { Status::Closed } else { Status::Open },
            dependencies: g
                .deps
                .iter()
                .map(|d| Dependency::blocks(format!("I{d:03}")))
                .collect(),
            ..Issue::default()
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn fingerprint_is_order_independent(gen in gen_issue_set(12), seed in any::<u64>()) {
        let issues = materialize(&gen);
        let mut shuffled = issues.clone();

        // Deterministic Fisher-Yates driven by the seed.
        let mut state = seed | 1;
        for i in (1..shuffled.len()).rev() {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let j = (state >> 33) as usize % (i + 1);
            shuffled.swap(i, j);
        }

        prop_assert_eq!(data_hash(&issues), data_hash(&shuffled));
    }

    #[test]
    fn blocking_edges_imply_degrees(gen in gen_issue_set(10)) {
        let issues = materialize(&gen);
        let stats = Analyzer::new(&issues).analyze();

        for issue in &issues {
            for dep in &issue.dependencies {
                // Only edges to existing targets materialize.
                if issues.iter().any(|i| i.id == dep.depends_on_id) {
                    prop_assert!(stats.out_degree[&issue.id] >= 1);
                    prop_assert!(stats.in_degree[&dep.depends_on_id] >= 1);
                }
            }
        }
    }

    #[test]
    fn topological_order_iff_acyclic(gen in gen_issue_set(10)) {
        let issues = materialize(&gen);
        let stats = Analyzer::new(&issues).analyze();

        let has_cycles = !stats.cycles().is_empty();
        if has_cycles {
            prop_assert!(stats.topological_order.is_empty());
        } else {
            prop_assert_eq!(stats.topological_order.len(), stats.node_count);
        }
    }

    #[test]
    fn pagerank_sums_to_one(gen in gen_issue_set(10)) {
        let issues = materialize(&gen);
        let stats = Analyzer::new(&issues).analyze();

        let total: f64 = stats.pagerank().values().sum();
        prop_assert!((total - 1.0).abs() < 1e-3, "sum = {}", total);
    }

    #[test]
    fn actionable_issues_have_no_open_existing_blockers(gen in gen_issue_set(10)) {
        let issues = materialize(&gen);
        let analyzer = Analyzer::new(&issues);

        for actionable in analyzer.actionable_issues() {
            prop_assert!(!actionable.status.is_closed());
            for target in actionable.blocking_deps() {
                if let Some(blocker) = analyzer.issue(target) {
                    prop_assert!(
                        blocker.status.is_closed(),
                        "{} actionable but blocked by open {}",
                        actionable.id,
                        blocker.id
                    );
                }
            }
        }
    }

    #[test]
    fn config_degradation_is_monotone(small in 1usize..5_000, growth in 1usize..50_000) {
        let large = small + growth;
        let small_config = AnalysisConfig::for_size(small, small * 2);
        let large_config = AnalysisConfig::for_size(large, large * 2);

        for algo in large_config.enabled_algorithms() {
            prop_assert!(
                small_config.enabled_algorithms().contains(&algo),
                "{} enabled at {} nodes but not at {}",
                algo,
                large,
                small
            );
        }
    }

    #[test]
    fn snapshots_are_disjoint(gen in gen_issue_set(8)) {
        let issues = materialize(&gen);
        let stats = Analyzer::new(&issues).analyze();

        let mut first = stats.pagerank();
        let len_before = stats.pagerank().len();
        first.insert("intruder".to_string(), 42.0);
        prop_assert_eq!(stats.pagerank().len(), len_before);
        prop_assert!(!stats.pagerank().contains_key("intruder"));
    }
}
