use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::ResolveError;
use crate::resolver::Resolved;

/// Default lifetime of a resolution outcome: long enough to cover a whole
/// download session, short enough that a fixed page gets re-checked.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// A cached resolution outcome. Failures are cached as well and replayed
/// verbatim until expiry, keeping repeat lookups off an already-failing
/// origin.
pub type Outcome = Result<Resolved, ResolveError>;

struct CacheEntry {
    outcome: Outcome,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Counters exposed by [`ResolutionCache::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// In-memory TTL cache of resolution outcomes, keyed by the original input
/// string. Expired entries are evicted lazily on the `get` that finds them;
/// `purge_expired` sweeps the rest on demand.
///
/// Safe to share across concurrent resolutions: the store is behind a
/// single mutex and the statistics are atomics, so parallel `get`/`set`
/// can neither corrupt the map nor double-count.
#[derive(Default)]
pub struct ResolutionCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an unexpired outcome. An expired entry counts as a miss and
    /// is removed on the spot.
    pub fn get(&self, key: &str) -> Option<Outcome> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.outcome.clone())
            }
            Some(_) => {
                entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set(&self, key: impl Into<String>, outcome: Outcome, ttl: Duration) {
        let key = key.into();
        debug!(key = %key, ok = outcome.is_ok(), ttl_secs = ttl.as_secs(), "caching resolution outcome");
        self.entries.lock().insert(
            key,
            CacheEntry {
                outcome,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Sweep every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.lock().len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
