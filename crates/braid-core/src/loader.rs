//! Append-only JSONL loading for issues and sprints.
//!
//! # File discovery
//!
//! Issue logs live in a `.beads/` directory. Several files may be present
//! (merge drivers and sync tools leave artifacts behind), so discovery uses
//! a preference order:
//!
//! 1. `beads.jsonl`
//! 2. `beads.base.jsonl`
//! 3. `issues.jsonl`
//! 4. any other `*.jsonl`
//!
//! Backup and merge artifacts (names containing `backup`, `.orig.`, or
//! `.merge.`) are never selected. Directories with a `.jsonl` suffix are
//! ignored.
//!
//! # Line discipline
//!
//! One JSON object per line. Empty and whitespace-only lines are skipped.
//! Lines that fail to parse are skipped with a warning. Records with an
//! empty `id` are skipped. A later record with the same `id` supersedes the
//! earlier one in place, preserving first-seen ordering — the log is
//! append-only and edits are re-appends. Lines may be arbitrarily large;
//! reading goes through `read_line`, which grows its buffer as needed.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::warn;

use crate::model::{Issue, Sprint};

/// Names tried first, in order, when picking the issue log.
const PREFERRED_NAMES: [&str; 3] = ["beads.jsonl", "beads.base.jsonl", "issues.jsonl"];

/// Locate the issue log inside `dir`.
///
/// # Errors
///
/// Returns an error if the directory cannot be read or contains no
/// candidate `.jsonl` file.
pub fn find_jsonl_path(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read beads directory {}", dir.display()))?;

    let mut candidates: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.context("read directory entry")?;
        let path = entry.path();
        // Symlinked logs are legitimate; metadata follows the link.
        let is_file = std::fs::metadata(&path).map(|m| m.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(".jsonl") || is_artifact(name) {
            continue;
        }
        candidates.push(path);
    }

    for preferred in PREFERRED_NAMES {
        if let Some(path) = candidates.iter().find(|p| {
            p.file_name().and_then(|n| n.to_str()) == Some(preferred)
        }) {
            return Ok(path.clone());
        }
    }

    candidates.sort();
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no beads JSONL file found in {}", dir.display()))
}

/// Return `true` for backup and merge artifact names.
fn is_artifact(name: &str) -> bool {
    name.contains("backup") || name.contains(".orig.") || name.contains(".merge.")
}

/// Load all issues for the repository rooted at `root`.
///
/// Resolves `<root>/.beads`, discovers the log, and parses it.
///
/// # Errors
///
/// Returns an error when `.beads` is missing or not a directory, or when no
/// log file can be found.
pub fn load_issues(root: impl AsRef<Path>) -> Result<Vec<Issue>> {
    let beads_dir = root.as_ref().join(".beads");
    if !beads_dir.is_dir() {
        bail!("no .beads directory at {}", beads_dir.display());
    }
    let path = find_jsonl_path(&beads_dir)?;
    load_issues_from_file(path)
}

/// Parse an issue log file.
///
/// # Errors
///
/// Returns an error only when the file cannot be opened or read; malformed
/// lines degrade to warnings.
pub fn load_issues_from_file(path: impl AsRef<Path>) -> Result<Vec<Issue>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("no beads issues found at {}", path.display()))?;

    let mut issues: Vec<Issue> = Vec::new();
    let mut index_by_id: HashMap<String, usize> = HashMap::new();

    for_each_line(file, |line_no, line| {
        let issue: Issue = match serde_json::from_str(line) {
            Ok(issue) => issue,
            Err(err) => {
                warn!(line = line_no, %err, "skipping malformed issue record");
                return;
            }
        };
        if issue.id.is_empty() {
            warn!(line = line_no, "skipping issue record with empty id");
            return;
        }
        match index_by_id.get(&issue.id) {
            // Supersede in place: later appends win, ordering is stable.
            Some(&i) => issues[i] = issue,
            None => {
                index_by_id.insert(issue.id.clone(), issues.len());
                issues.push(issue);
            }
        }
    })?;

    Ok(issues)
}

/// Load sprint definitions from `<dir>/sprints.jsonl`.
///
/// A missing file is an empty set, not an error.
///
/// # Errors
///
/// Returns an error when the file exists but cannot be read.
pub fn load_sprints(dir: impl AsRef<Path>) -> Result<Vec<Sprint>> {
    let path = dir.as_ref().join("sprints.jsonl");
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to open {}", path.display()))
        }
    };

    let mut sprints = Vec::new();
    for_each_line(file, |line_no, line| {
        match serde_json::from_str::<Sprint>(line) {
            Ok(sprint) if !sprint.id.is_empty() => sprints.push(sprint),
            Ok(_) => warn!(line = line_no, "skipping sprint record with empty id"),
            Err(err) => warn!(line = line_no, %err, "skipping malformed sprint record"),
        }
    })?;
    Ok(sprints)
}

/// Run `handle` over every non-blank line of `file`.
///
/// Uses `read_line` so a single record may exceed any fixed buffer size.
fn for_each_line(file: File, mut handle: impl FnMut(usize, &str)) -> Result<()> {
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    let mut line_no = 0usize;

    loop {
        line.clear();
        let read = reader.read_line(&mut line).context("read issue log line")?;
        if read == 0 {
            return Ok(());
        }
        line_no += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        handle(line_no, trimmed);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
