//! Robot mode: deterministic JSON endpoints over the analysis core.
//!
//! Every endpoint loads the issue log, runs the cached analyzer, waits for
//! phase 2, and prints exactly one JSON object to stdout. Payloads carry
//! the issue-set fingerprint as `data_hash` and an RFC3339 `generated_at`
//! stamp; all list orderings are deterministic with ties broken by issue
//! ID ascending, so identical inputs produce identical bytes modulo the
//! timestamp.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use anyhow::{Context, Result};
use braid_analysis::alerts::{filter_alerts, summarize, Alert, AlertSummary, Severity};
use braid_analysis::burndown::{compute_burndown, select_sprint, Burndown};
use braid_analysis::eta::estimate_capacity;
use braid_analysis::{global_cache, CachedAnalyzer, GraphStats};
use braid_core::loader;
use braid_core::model::Issue;
use chrono::{DateTime, Utc};
use clap::{Subcommand, ValueEnum};
use serde::Serialize;
use tracing::debug;

/// Graph rendering formats for `robot graph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Json,
    Dot,
    Mermaid,
}

impl GraphFormat {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Dot => "dot",
            Self::Mermaid => "mermaid",
        }
    }
}

impl std::fmt::Display for GraphFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Subcommand, Debug)]
pub enum Endpoint {
    /// Bottlenecks, keystones, cycles, and graph stats.
    Insights,
    /// Per-issue triage recommendations and project health.
    Triage,
    /// Parallel execution tracks over the open issues.
    Plan,
    /// Priority-change recommendations.
    Priority,
    /// Capacity to clear the open set with N agents.
    Capacity {
        /// Number of agents working in parallel.
        #[arg(long, default_value_t = 1)]
        agents: usize,
        /// Restrict to issues carrying this label.
        #[arg(long = "capacity-label")]
        capacity_label: Option<String>,
    },
    /// Stale, cascade, blocked, inversion, and cycle alerts.
    Alerts {
        /// Keep only alerts of this type.
        #[arg(long = "alert-type")]
        alert_type: Option<String>,
        /// Keep only alerts at or above this severity.
        #[arg(long)]
        severity: Option<String>,
    },
    /// The blocking graph as JSON adjacency, DOT, or Mermaid.
    Graph {
        /// Start from this issue instead of the whole graph.
        #[arg(long = "graph-root")]
        graph_root: Option<String>,
        /// Hop limit from the root (requires --graph-root).
        #[arg(long = "graph-depth")]
        graph_depth: Option<usize>,
        /// Output format.
        #[arg(long = "graph-format", value_enum, default_value_t = GraphFormat::Json)]
        graph_format: GraphFormat,
    },
    /// Sprint burndown: a sprint ID or "current".
    Burndown {
        #[arg(default_value = "current")]
        sprint: String,
    },
}

/// Run one endpoint against the repository at `dir`.
pub fn run(dir: &Path, endpoint: Endpoint) -> Result<()> {
    let issues = loader::load_issues(dir)?;
    debug!(issues = issues.len(), "loaded issue log");

    match endpoint {
        Endpoint::Insights => {
            let ctx = analyze(&issues);
            print_json(&insights(&ctx))
        }
        Endpoint::Triage => {
            let ctx = analyze(&issues);
            print_json(&triage(&ctx))
        }
        Endpoint::Plan => {
            let ctx = analyze(&issues);
            print_json(&plan(&ctx))
        }
        Endpoint::Priority => {
            let ctx = analyze(&issues);
            print_json(&priority(&ctx))
        }
        Endpoint::Capacity {
            agents,
            capacity_label,
        } => {
            let report =
                estimate_capacity(&issues, agents, capacity_label.as_deref(), Utc::now());
            print_json(&CapacityPayload {
                data_hash: braid_analysis::data_hash(&issues),
                generated_at: Utc::now(),
                agents: report.agents,
                label: report.label,
                open_issue_count: report.open_issue_count,
                total_minutes: report.total_minutes,
                estimated_days: report.estimated_days,
            })
        }
        Endpoint::Alerts {
            alert_type,
            severity,
        } => {
            let min_severity = severity
                .as_deref()
                .map(|raw| {
                    Severity::parse(raw)
                        .ok_or_else(|| anyhow::anyhow!("unknown severity {raw:?}"))
                })
                .transpose()?;
            let ctx = analyze(&issues);
            print_json(&alerts(&ctx, alert_type.as_deref(), min_severity))
        }
        Endpoint::Graph {
            graph_root,
            graph_depth,
            graph_format,
        } => {
            let ctx = analyze(&issues);
            graph(&ctx, graph_root.as_deref(), graph_depth, graph_format)
        }
        Endpoint::Burndown { sprint } => {
            let sprints = loader::load_sprints(&dir.join(".beads"))?;
            let selected = select_sprint(&sprints, &sprint, Utc::now())
                .with_context(|| format!("no sprint matches {sprint:?}"))?;
            let burndown: Burndown = compute_burndown(selected, &issues, Utc::now())?;
            print_json(&burndown)
        }
    }
}

/// Everything an endpoint needs: the issue set, analyzer, and ready stats.
struct AnalysisContext {
    issues: Vec<Issue>,
    analyzer: CachedAnalyzer<'static>,
    stats: std::sync::Arc<GraphStats>,
    data_hash: String,
    now: DateTime<Utc>,
}

fn analyze(issues: &[Issue]) -> AnalysisContext {
    let analyzer = CachedAnalyzer::new(issues, Some(global_cache()));
    let stats = analyzer.analyze();
    AnalysisContext {
        issues: issues.to_vec(),
        data_hash: analyzer.fingerprint().to_string(),
        analyzer,
        stats,
        now: Utc::now(),
    }
}

fn print_json<T: Serialize>(payload: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(payload).context("serialize payload")?;
    println!("{rendered}");
    Ok(())
}

// ---------------------------------------------------------------------------
// insights
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RankedIssue {
    id: String,
    value: f64,
    desc: String,
}

#[derive(Serialize)]
struct InsightStats {
    density: f64,
    node_count: usize,
    edge_count: usize,
}

#[derive(Serialize)]
struct InsightsPayload {
    data_hash: String,
    generated_at: DateTime<Utc>,
    bottlenecks: Vec<RankedIssue>,
    keystones: Vec<RankedIssue>,
    cycles: Vec<Vec<String>>,
    stats: InsightStats,
}

/// Top-scored issues from a metric map: value desc, id asc, capped.
fn top_ranked(
    scores: &HashMap<String, f64>,
    issues: &[Issue],
    limit: usize,
) -> Vec<RankedIssue> {
    let titles: HashMap<&str, &str> = issues
        .iter()
        .map(|i| (i.id.as_str(), i.title.as_str()))
        .collect();

    let mut ranked: Vec<(&String, f64)> = scores
        .iter()
        .filter(|(_, v)| **v > 0.0)
        .map(|(k, v)| (k, *v))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    ranked
        .into_iter()
        .take(limit)
        .map(|(id, value)| RankedIssue {
            id: id.clone(),
            value,
            desc: titles.get(id.as_str()).unwrap_or(&"").to_string(),
        })
        .collect()
}

fn insights(ctx: &AnalysisContext) -> InsightsPayload {
    InsightsPayload {
        data_hash: ctx.data_hash.clone(),
        generated_at: ctx.now,
        bottlenecks: top_ranked(&ctx.stats.betweenness(), &ctx.issues, 5),
        keystones: top_ranked(&ctx.stats.pagerank(), &ctx.issues, 5),
        cycles: ctx.stats.cycles(),
        stats: InsightStats {
            density: ctx.stats.density,
            node_count: ctx.stats.node_count,
            edge_count: ctx.stats.edge_count,
        },
    }
}

// ---------------------------------------------------------------------------
// triage
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct TriageRecommendation {
    id: String,
    score: f64,
    action: String,
    reasons: Vec<String>,
    unblocks_ids: Vec<String>,
    blocked_by: Vec<String>,
}

#[derive(Serialize)]
struct ProjectHealth {
    total_issues: usize,
    open_issues: usize,
    blocked_issues: usize,
    closed_issues: usize,
    actionable_issues: usize,
    cycle_count: usize,
}

#[derive(Serialize)]
struct TriagePayload {
    data_hash: String,
    generated_at: DateTime<Utc>,
    recommendations: Vec<TriageRecommendation>,
    project_health: ProjectHealth,
}

fn triage(ctx: &AnalysisContext) -> TriagePayload {
    let analyzer = ctx.analyzer.analyzer();
    let scores = analyzer.impact_scores_at(&ctx.stats, ctx.now);
    let dependents = analyzer.dependents();
    let actionable: HashSet<String> = analyzer
        .actionable_issues()
        .iter()
        .map(|i| i.id.clone())
        .collect();

    let recommendations = scores
        .iter()
        .map(|score| {
            let blocked_by = analyzer.open_blockers(&score.issue_id);
            let action = if actionable.contains(&score.issue_id) {
                "start"
            } else {
                "unblock"
            };

            let mut reasons = Vec::new();
            if score.breakdown.pagerank_norm > 0.3 {
                reasons.push("high centrality in dependency graph".to_string());
            }
            if score.breakdown.betweenness_norm > 0.5 {
                reasons.push("bottleneck on blocking paths".to_string());
            }
            let unblocks = dependents.get(&score.issue_id).map_or(0, Vec::len);
            if unblocks > 0 {
                reasons.push(format!("completing it unblocks {unblocks} issues"));
            }
            if score.breakdown.staleness_norm >= 0.5 {
                reasons.push("going stale".to_string());
            }
            if reasons.is_empty() {
                reasons.push("in the open set".to_string());
            }

            TriageRecommendation {
                id: score.issue_id.clone(),
                score: score.score,
                action: action.to_string(),
                reasons,
                unblocks_ids: dependents
                    .get(&score.issue_id)
                    .cloned()
                    .unwrap_or_default(),
                blocked_by,
            }
        })
        .collect();

    let statuses = |pred: fn(&Issue) -> bool| ctx.issues.iter().filter(|&i| pred(i)).count();

    TriagePayload {
        data_hash: ctx.data_hash.clone(),
        generated_at: ctx.now,
        recommendations,
        project_health: ProjectHealth {
            total_issues: ctx.issues.len(),
            open_issues: statuses(|i| i.status == braid_core::model::Status::Open),
            blocked_issues: statuses(|i| i.status == braid_core::model::Status::Blocked),
            closed_issues: statuses(|i| i.status.is_closed()),
            actionable_issues: actionable.len(),
            cycle_count: ctx.stats.cycles().len(),
        },
    }
}

// ---------------------------------------------------------------------------
// plan
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct PlanSummary {
    track_count: usize,
    total_issues: usize,
    max_parallelism: usize,
    unschedulable: usize,
}

#[derive(Serialize)]
struct PlanBody {
    tracks: Vec<Vec<String>>,
    summary: PlanSummary,
}

#[derive(Serialize)]
struct PlanPayload {
    data_hash: String,
    generated_at: DateTime<Utc>,
    plan: PlanBody,
}

/// Layer the open issues: track 0 is immediately actionable, track n+1
/// becomes workable once track n completes. Cycle members never level out
/// and are reported as unschedulable.
fn plan(ctx: &AnalysisContext) -> PlanPayload {
    let analyzer = ctx.analyzer.analyzer();

    let open: Vec<&Issue> = ctx
        .issues
        .iter()
        .filter(|i| !i.status.is_closed())
        .collect();

    let mut level: HashMap<&str, usize> = HashMap::new();
    loop {
        let mut progressed = false;
        for issue in &open {
            if level.contains_key(issue.id.as_str()) {
                continue;
            }
            let open_blockers = analyzer.open_blockers(&issue.id);
            let resolved: Option<usize> = open_blockers
                .iter()
                .map(|b| level.get(b.as_str()).copied())
                .try_fold(0usize, |acc, l| l.map(|l| acc.max(l + 1)));
            if let Some(depth) = resolved {
                level.insert(issue.id.as_str(), depth);
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    let track_count = level.values().copied().max().map_or(0, |m| m + 1);
    let mut tracks: Vec<Vec<String>> = vec![Vec::new(); track_count];
    for (id, depth) in &level {
        tracks[*depth].push((*id).to_string());
    }
    for track in &mut tracks {
        track.sort_unstable();
    }

    let max_parallelism = tracks.iter().map(Vec::len).max().unwrap_or(0);

    PlanPayload {
        data_hash: ctx.data_hash.clone(),
        generated_at: ctx.now,
        plan: PlanBody {
            summary: PlanSummary {
                track_count,
                total_issues: open.len(),
                max_parallelism,
                unschedulable: open.len() - level.len(),
            },
            tracks,
        },
    }
}

// ---------------------------------------------------------------------------
// priority
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct PriorityRec {
    id: String,
    current_priority: i64,
    suggested_priority: i64,
    confidence: f64,
    reasoning: Vec<String>,
    direction: String,
}

#[derive(Serialize)]
struct PriorityPayload {
    data_hash: String,
    generated_at: DateTime<Utc>,
    recommendations: Vec<PriorityRec>,
}

fn priority(ctx: &AnalysisContext) -> PriorityPayload {
    let recommendations = ctx
        .analyzer
        .analyzer()
        .priority_recommendations(&ctx.stats, ctx.now)
        .into_iter()
        .map(|rec| PriorityRec {
            id: rec.issue_id,
            current_priority: rec.current_priority,
            suggested_priority: rec.suggested_priority,
            confidence: rec.confidence,
            reasoning: rec.reasoning,
            direction: rec.direction,
        })
        .collect();

    PriorityPayload {
        data_hash: ctx.data_hash.clone(),
        generated_at: ctx.now,
        recommendations,
    }
}

// ---------------------------------------------------------------------------
// capacity / alerts
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CapacityPayload {
    data_hash: String,
    generated_at: DateTime<Utc>,
    agents: usize,
    label: String,
    open_issue_count: usize,
    total_minutes: i64,
    estimated_days: f64,
}

#[derive(Serialize)]
struct AlertsPayload {
    data_hash: String,
    generated_at: DateTime<Utc>,
    alerts: Vec<Alert>,
    summary: AlertSummary,
}

fn alerts(
    ctx: &AnalysisContext,
    alert_type: Option<&str>,
    min_severity: Option<Severity>,
) -> AlertsPayload {
    let all = ctx.analyzer.analyzer().alerts(&ctx.stats, ctx.now);
    let filtered = filter_alerts(all, alert_type, min_severity);
    let summary = summarize(&filtered);

    AlertsPayload {
        data_hash: ctx.data_hash.clone(),
        generated_at: ctx.now,
        alerts: filtered,
        summary,
    }
}

// ---------------------------------------------------------------------------
// graph
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct GraphNode {
    id: String,
    title: String,
    status: String,
}

#[derive(Serialize)]
struct GraphEdge {
    from: String,
    to: String,
}

#[derive(Serialize)]
struct Adjacency {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

#[derive(Serialize)]
struct GraphJsonPayload {
    data_hash: String,
    generated_at: DateTime<Utc>,
    format: String,
    nodes: usize,
    edges: usize,
    adjacency: Adjacency,
}

#[derive(Serialize)]
struct GraphTextPayload {
    data_hash: String,
    generated_at: DateTime<Utc>,
    format: String,
    nodes: usize,
    edges: usize,
    graph: String,
}

fn graph(
    ctx: &AnalysisContext,
    root: Option<&str>,
    depth: Option<usize>,
    format: GraphFormat,
) -> Result<()> {
    let kept = reachable_set(&ctx.issues, root, depth)?;

    let mut nodes: Vec<GraphNode> = ctx
        .issues
        .iter()
        .filter(|i| kept.contains(i.id.as_str()))
        .map(|i| GraphNode {
            id: i.id.clone(),
            title: i.title.clone(),
            status: i.status.as_str().to_string(),
        })
        .collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));

    let mut edges: Vec<GraphEdge> = Vec::new();
    let ids: HashSet<&str> = ctx.issues.iter().map(|i| i.id.as_str()).collect();
    for issue in &ctx.issues {
        if !kept.contains(issue.id.as_str()) {
            continue;
        }
        for target in issue.blocking_deps() {
            if ids.contains(target) && kept.contains(target) {
                edges.push(GraphEdge {
                    from: issue.id.clone(),
                    to: target.to_string(),
                });
            }
        }
    }
    edges.sort_by(|a, b| a.from.cmp(&b.from).then_with(|| a.to.cmp(&b.to)));
    edges.dedup_by(|a, b| a.from == b.from && a.to == b.to);

    match format {
        GraphFormat::Json => print_json(&GraphJsonPayload {
            data_hash: ctx.data_hash.clone(),
            generated_at: ctx.now,
            format: format.as_str().to_string(),
            nodes: nodes.len(),
            edges: edges.len(),
            adjacency: Adjacency { nodes, edges },
        }),
        GraphFormat::Dot | GraphFormat::Mermaid => {
            let rendered = match format {
                GraphFormat::Dot => render_dot(&nodes, &edges),
                _ => render_mermaid(&nodes, &edges),
            };
            print_json(&GraphTextPayload {
                data_hash: ctx.data_hash.clone(),
                generated_at: ctx.now,
                format: format.as_str().to_string(),
                nodes: nodes.len(),
                edges: edges.len(),
                graph: rendered,
            })
        }
    }
}

/// The IDs within `depth` undirected hops of `root`, or every ID.
fn reachable_set(
    issues: &[Issue],
    root: Option<&str>,
    depth: Option<usize>,
) -> Result<HashSet<String>> {
    let Some(root) = root else {
        return Ok(issues.iter().map(|i| i.id.clone()).collect());
    };
    anyhow::ensure!(
        issues.iter().any(|i| i.id == root),
        "unknown graph root {root:?}"
    );

    // Undirected adjacency over blocking edges.
    let ids: HashSet<&str> = issues.iter().map(|i| i.id.as_str()).collect();
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for issue in issues {
        for target in issue.blocking_deps() {
            if ids.contains(target) {
                adjacency.entry(issue.id.as_str()).or_default().push(target);
                adjacency.entry(target).or_default().push(issue.id.as_str());
            }
        }
    }

    let limit = depth.unwrap_or(usize::MAX);
    let mut kept: HashSet<String> = HashSet::from([root.to_string()]);
    let mut frontier: VecDeque<(&str, usize)> = VecDeque::from([(root, 0)]);

    while let Some((id, hops)) = frontier.pop_front() {
        if hops >= limit {
            continue;
        }
        for &next in adjacency.get(id).into_iter().flatten() {
            if kept.insert(next.to_string()) {
                frontier.push_back((next, hops + 1));
            }
        }
    }

    Ok(kept)
}

fn render_dot(nodes: &[GraphNode], edges: &[GraphEdge]) -> String {
    let mut out = String::from("digraph braid {\n");
    for node in nodes {
        out.push_str(&format!("  \"{}\" [label=\"{}\"];\n", node.id, node.id));
    }
    for edge in edges {
        out.push_str(&format!("  \"{}\" -> \"{}\";\n", edge.from, edge.to));
    }
    out.push('}');
    out
}

fn render_mermaid(nodes: &[GraphNode], edges: &[GraphEdge]) -> String {
    let mut out = String::from("graph TD\n");
    for node in nodes {
        out.push_str(&format!("  {}[{}]\n", node.id, node.id));
    }
    for edge in edges {
        out.push_str(&format!("  {} --> {}\n", edge.from, edge.to));
    }
    out
}
