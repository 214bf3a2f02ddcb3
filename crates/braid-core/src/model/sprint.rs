use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sprint definition from `sprints.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sprint {
    pub id: String,
    pub name: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// IDs of the issues committed to this sprint.
    pub bead_ids: Vec<String>,
}

impl Default for Sprint {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            start_date: None,
            end_date: None,
            bead_ids: Vec::new(),
        }
    }
}
