use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Issue lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Open,
    InProgress,
    Blocked,
    Closed,
}

impl Default for Status {
    fn default() -> Self {
        Self::Open
    }
}

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Closed => "closed",
        }
    }

    /// Return `true` for the terminal state.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// The five kinds of tracked work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Bug,
    Feature,
    Task,
    Epic,
    Chore,
}

impl Default for IssueType {
    fn default() -> Self {
        Self::Task
    }
}

impl IssueType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::Feature => "feature",
            Self::Task => "task",
            Self::Epic => "epic",
            Self::Chore => "chore",
        }
    }
}

/// Kind of a dependency link between two issues.
///
/// Only [`DependencyKind::Blocks`] contributes edges to the analysis graph.
/// A missing or empty kind on the wire is interpreted as `blocks` (legacy
/// records predate the kind field). Unrecognized kinds are preserved but
/// never block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Blocks,
    Related,
    #[serde(rename = "parent-child")]
    ParentChild,
    Other,
}

impl Default for DependencyKind {
    fn default() -> Self {
        Self::Blocks
    }
}

/// One dependency entry on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// ID of the issue this one depends on.
    pub depends_on_id: String,
    /// Link kind. Missing on legacy records, which means blocking.
    #[serde(rename = "type", default, deserialize_with = "kind_or_legacy")]
    pub kind: DependencyKind,
}

impl Dependency {
    /// Construct a blocking dependency (the common case in tests).
    #[must_use]
    pub fn blocks(depends_on_id: impl Into<String>) -> Self {
        Self {
            depends_on_id: depends_on_id.into(),
            kind: DependencyKind::Blocks,
        }
    }

    /// Return `true` if this link gates execution order.
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        matches!(self.kind, DependencyKind::Blocks)
    }
}

/// Map a missing, empty, or `"blocks"` wire value to [`DependencyKind::Blocks`].
fn kind_or_legacy<'de, D>(deserializer: D) -> Result<DependencyKind, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw.as_deref() {
        None | Some("") | Some("blocks") => DependencyKind::Blocks,
        Some("related") => DependencyKind::Related,
        Some("parent-child") | Some("parent_child") => DependencyKind::ParentChild,
        Some(_) => DependencyKind::Other,
    })
}

/// A comment on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A tracked unit of work, as stored in the append-only JSONL log.
///
/// All analysis treats issues as read-only. Timestamps are optional because
/// hand-written logs omit them; consumers must tolerate `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Issue {
    pub id: String,
    pub title: String,
    pub description: String,
    pub assignee: String,
    pub status: Status,
    /// 0 = critical .. 4+ = backlog. Lower is more urgent.
    pub priority: i64,
    #[serde(rename = "issue_type")]
    pub issue_type: IssueType,
    pub labels: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub estimated_minutes: Option<i64>,
    pub source_repo: Option<String>,
    pub comments: Vec<Comment>,
    pub dependencies: Vec<Dependency>,
}

impl Default for Issue {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            description: String::new(),
            assignee: String::new(),
            status: Status::Open,
            priority: 2,
            issue_type: IssueType::Task,
            labels: Vec::new(),
            created_at: None,
            updated_at: None,
            closed_at: None,
            estimated_minutes: None,
            source_repo: None,
            comments: Vec::new(),
            dependencies: Vec::new(),
        }
    }
}

impl Issue {
    /// Iterate over blocking dependency targets.
    pub fn blocking_deps(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .filter(|d| d.is_blocking())
            .map(|d| d.depends_on_id.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
