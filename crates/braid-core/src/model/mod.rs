//! Data model for braid issues and sprints.

mod issue;
mod sprint;

pub use issue::{Comment, Dependency, DependencyKind, Issue, IssueType, Status};
pub use sprint::Sprint;
