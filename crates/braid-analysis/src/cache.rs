//! Content-addressed caching of analysis results.
//!
//! # Fingerprint
//!
//! [`data_hash`] digests each issue's identity-relevant fields (id, title,
//! description, status, priority, type, sorted labels, sorted dependency
//! pairs, created/updated timestamps) with BLAKE3, sorts the per-issue
//! digests, and hashes the concatenation. Sorting makes the fingerprint
//! independent of input order, so a reshuffled log maps to the same cache
//! slot and the same `data_hash` in robot output. Empty input hashes to the
//! literal `"empty"`.
//!
//! # Cache
//!
//! [`AnalysisCache`] holds a single TTL-bounded slot. A hit returns the
//! *same* `Arc<GraphStats>` that was stored, so every consumer shares one
//! phase-2 computation. [`global_cache`] exposes a lazily-initialized
//! process-wide instance; tests call `invalidate()` to reset it.

use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use braid_core::model::Issue;
use tracing::debug;

use crate::analyzer::Analyzer;
use crate::stats::GraphStats;

/// Fingerprint of the empty issue set.
pub const EMPTY_HASH: &str = "empty";

/// Default time-to-live for the global cache slot.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Compute the order-independent fingerprint of an issue set.
#[must_use]
pub fn data_hash(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return EMPTY_HASH.to_string();
    }

    let mut digests: Vec<[u8; 32]> = issues.iter().map(issue_digest).collect();
    digests.sort_unstable();

    let mut hasher = blake3::Hasher::new();
    for digest in &digests {
        hasher.update(digest);
    }
    hasher.finalize().to_hex().to_string()
}

/// Append one delimited field to a digest.
fn field(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(bytes);
    hasher.update(b"\x00");
}

/// Digest the identity-relevant fields of one issue.
fn issue_digest(issue: &Issue) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();

    field(&mut hasher, issue.id.as_bytes());
    field(&mut hasher, issue.title.as_bytes());
    field(&mut hasher, issue.description.as_bytes());
    field(&mut hasher, issue.status.as_str().as_bytes());
    field(&mut hasher, issue.priority.to_string().as_bytes());
    field(&mut hasher, issue.issue_type.as_str().as_bytes());

    let mut labels = issue.labels.clone();
    labels.sort_unstable();
    for label in &labels {
        field(&mut hasher, label.as_bytes());
    }

    let mut deps: Vec<(String, &'static str)> = issue
        .dependencies
        .iter()
        .map(|d| {
            let kind = if d.is_blocking() { "blocks" } else { "other" };
            (d.depends_on_id.clone(), kind)
        })
        .collect();
    deps.sort_unstable();
    for (target, kind) in &deps {
        field(&mut hasher, target.as_bytes());
        field(&mut hasher, kind.as_bytes());
    }

    for ts in [issue.created_at, issue.updated_at] {
        match ts {
            Some(ts) => field(&mut hasher, ts.to_rfc3339().as_bytes()),
            None => field(&mut hasher, b"-"),
        }
    }

    *hasher.finalize().as_bytes()
}

// ---------------------------------------------------------------------------
// AnalysisCache
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Slot {
    fingerprint: String,
    stats: Arc<GraphStats>,
    stored_at: Instant,
}

/// Metadata about the current cache slot.
#[derive(Debug, Clone)]
pub struct CacheInfo {
    pub fingerprint: String,
    pub age: Duration,
}

/// Single-slot, TTL-bounded cache of the last analysis result.
#[derive(Debug)]
pub struct AnalysisCache {
    slot: Mutex<Option<Slot>>,
    ttl: Duration,
}

impl AnalysisCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            ttl,
        }
    }

    /// Return the cached handle when the fingerprint matches and the entry
    /// has not expired.
    #[must_use]
    pub fn get(&self, issues: &[Issue]) -> Option<Arc<GraphStats>> {
        self.get_by_fingerprint(&data_hash(issues))
    }

    /// Fingerprint-keyed variant of [`AnalysisCache::get`] for callers that
    /// already computed the hash.
    #[must_use]
    pub fn get_by_fingerprint(&self, fingerprint: &str) -> Option<Arc<GraphStats>> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        let entry = slot.as_ref()?;
        if entry.fingerprint != fingerprint || entry.stored_at.elapsed() > self.ttl {
            return None;
        }
        Some(Arc::clone(&entry.stats))
    }

    /// Store a result for this issue set, replacing any previous slot.
    pub fn set(&self, issues: &[Issue], stats: Arc<GraphStats>) {
        self.set_by_fingerprint(data_hash(issues), stats);
    }

    /// Fingerprint-keyed variant of [`AnalysisCache::set`].
    pub fn set_by_fingerprint(&self, fingerprint: String, stats: Arc<GraphStats>) {
        debug!(%fingerprint, "caching analysis result");
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Slot {
            fingerprint,
            stats,
            stored_at: Instant::now(),
        });
    }

    /// Drop the slot.
    pub fn invalidate(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    /// Fingerprint and age of the current slot, if any.
    #[must_use]
    pub fn info(&self) -> Option<CacheInfo> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().map(|entry| CacheInfo {
            fingerprint: entry.fingerprint.clone(),
            age: entry.stored_at.elapsed(),
        })
    }
}

/// The process-wide cache, lazily initialized with [`DEFAULT_TTL`].
#[must_use]
pub fn global_cache() -> &'static AnalysisCache {
    static GLOBAL: OnceLock<AnalysisCache> = OnceLock::new();
    GLOBAL.get_or_init(|| AnalysisCache::new(DEFAULT_TTL))
}

// ---------------------------------------------------------------------------
// CachedAnalyzer
// ---------------------------------------------------------------------------

/// An [`Analyzer`] fronted by an [`AnalysisCache`].
///
/// On `analyze_async` the cache is consulted first; a hit returns the
/// stored handle directly (sharing phase-2 progress with earlier callers),
/// a miss runs the analysis and populates the slot before returning.
#[derive(Debug)]
pub struct CachedAnalyzer<'c> {
    analyzer: Analyzer,
    fingerprint: String,
    cache: Option<&'c AnalysisCache>,
    last_was_hit: std::sync::atomic::AtomicBool,
}

impl<'c> CachedAnalyzer<'c> {
    /// Wrap a fresh analyzer for `issues`. Pass `None` to bypass caching.
    #[must_use]
    pub fn new(issues: &[Issue], cache: Option<&'c AnalysisCache>) -> Self {
        Self {
            analyzer: Analyzer::new(issues),
            fingerprint: data_hash(issues),
            cache,
            last_was_hit: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// The fingerprint of the wrapped issue set.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The wrapped analyzer, for the derived scorers.
    #[must_use]
    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Whether the most recent `analyze_async` call hit the cache.
    #[must_use]
    pub fn was_cache_hit(&self) -> bool {
        self.last_was_hit.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Analyze through the cache.
    #[must_use]
    pub fn analyze_async(&self) -> Arc<GraphStats> {
        if let Some(cache) = self.cache {
            if let Some(stats) = cache.get_by_fingerprint(&self.fingerprint) {
                self.last_was_hit
                    .store(true, std::sync::atomic::Ordering::Relaxed);
                return stats;
            }
        }
        self.last_was_hit
            .store(false, std::sync::atomic::Ordering::Relaxed);

        let stats = self.analyzer.analyze_async();
        if let Some(cache) = self.cache {
            cache.set_by_fingerprint(self.fingerprint.clone(), Arc::clone(&stats));
        }
        stats
    }

    /// Blocking variant of [`CachedAnalyzer::analyze_async`].
    #[must_use]
    pub fn analyze(&self) -> Arc<GraphStats> {
        let stats = self.analyze_async();
        stats.wait_for_phase2();
        stats
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
