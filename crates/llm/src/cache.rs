//! In-memory summary cache with TTL, LRU eviction and in-flight deduplication.
//!
//! Entries are keyed by a [`Fingerprint`] over the model, every constraint
//! parameter and the normalized input, so summaries never leak across
//! incompatible configurations.
//!
//! Cache entries and the in-flight registry share one mutex. It is never held
//! across an `.await`, which keeps every transition (insert, evict, promote,
//! register, settle) linearizable. A settling round trip removes its
//! registration and stores its result in the same critical section, so a
//! request that arrives right after completion reads the cached value instead
//! of starting new work.

use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use precis_common::{PrecisError, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::types::Summary;

/// Deterministic digest identifying one cacheable unit of work
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash length-prefixed parts so ("ab", "c") and ("a", "bc") differ
    pub fn from_parts(parts: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, for logs
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configuration for the request cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached summaries. Default: 500.
    pub capacity: usize,
    /// Time-to-live for cached summaries. Default: 1 hour.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 500,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Shared handle to one upstream round trip
pub type PendingSummary = Shared<BoxFuture<'static, Result<Summary>>>;

/// Outcome of [`RequestCache::acquire_in_flight`]
pub enum Lookup {
    /// Fresh cached summary
    Hit(Summary),
    /// Another caller already owns the round trip for this fingerprint
    Joined(PendingSummary),
    /// This caller registered a new round trip
    Started(PendingSummary),
}

/// Point-in-time cache counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub in_flight: usize,
    pub hits: u64,
    /// Lookups that found nothing, or that started a new round trip
    pub misses: u64,
    pub evictions: u64,
    pub expired: u64,
    pub ttl_secs: u64,
}

struct CacheEntry {
    summary: Summary,
    inserted_at: Instant,
}

struct CacheState {
    entries: LruCache<Fingerprint, CacheEntry>,
    in_flight: HashMap<Fingerprint, PendingSummary>,
    hits: u64,
    misses: u64,
    evictions: u64,
    expired: u64,
}

impl CacheState {
    /// Fresh entry (promoted to most recently used) or `None`; drops a stale one.
    /// Misses are counted by the caller.
    fn lookup(&mut self, fingerprint: &Fingerprint, ttl: Duration) -> Option<Summary> {
        let stale = match self.entries.get(fingerprint) {
            Some(entry) if entry.inserted_at.elapsed() <= ttl => {
                self.hits += 1;
                return Some(entry.summary.clone());
            }
            Some(_) => true,
            None => false,
        };

        if stale {
            self.entries.pop(fingerprint);
            self.expired += 1;
            debug!("Cache entry expired: {}", fingerprint.short());
        }
        None
    }

    fn insert(&mut self, fingerprint: Fingerprint, summary: Summary) {
        let entry = CacheEntry {
            summary,
            inserted_at: Instant::now(),
        };
        if let Some((evicted, _)) = self.entries.push(fingerprint.clone(), entry) {
            if evicted != fingerprint {
                self.evictions += 1;
                debug!("Cache full, evicted least recently used entry: {}", evicted.short());
            }
        }
    }
}

/// Bounded, time-expiring summary store with in-flight deduplication
pub struct RequestCache {
    state: Arc<Mutex<CacheState>>,
    config: CacheConfig,
}

impl RequestCache {
    /// Create a cache; a zero capacity is raised to one entry
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        let state = CacheState {
            entries: LruCache::new(capacity),
            in_flight: HashMap::new(),
            hits: 0,
            misses: 0,
            evictions: 0,
            expired: 0,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a cached summary. Returns None if absent or expired.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Summary> {
        let mut state = self.state.lock();
        let found = state.lookup(fingerprint, self.config.ttl);
        if found.is_none() {
            state.misses += 1;
        }
        found
    }

    /// Insert a summary, evicting the least recently used entry when full
    pub fn put(&self, fingerprint: Fingerprint, summary: Summary) {
        self.state.lock().insert(fingerprint, summary);
    }

    /// Resolve a fingerprint to a cached value, an existing round trip, or a
    /// new round trip built from `work`
    ///
    /// `work` runs under the cache lock and must only construct the future,
    /// not touch this cache. The round trip is spawned onto the tokio runtime,
    /// so it finishes even if every waiter is dropped. When it settles it drops
    /// its registration and, on success, caches the summary. Failures are
    /// shared with every waiter but never cached. Joining an existing round
    /// trip counts as neither a hit nor a miss.
    pub fn acquire_in_flight<F, Fut>(&self, fingerprint: &Fingerprint, work: F) -> Lookup
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Summary>> + Send + 'static,
    {
        let mut state = self.state.lock();

        if let Some(summary) = state.lookup(fingerprint, self.config.ttl) {
            return Lookup::Hit(summary);
        }

        if let Some(pending) = state.in_flight.get(fingerprint) {
            debug!("Joining in-flight request: {}", fingerprint.short());
            return Lookup::Joined(pending.clone());
        }

        state.misses += 1;
        let settle_state = Arc::clone(&self.state);
        let key = fingerprint.clone();
        let round_trip = work();

        // Settling takes this lock, so it cannot run before the registration below
        let task = tokio::spawn(async move {
            let result = match AssertUnwindSafe(round_trip).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(PrecisError::internal("Summary round trip panicked")),
            };
            {
                let mut settled = settle_state.lock();
                settled.in_flight.remove(&key);
                if let Ok(summary) = &result {
                    settled.insert(key, summary.clone());
                }
            }
            result
        });
        let pending = async move {
            task.await
                .unwrap_or_else(|e| Err(PrecisError::internal(format!("Summary task aborted: {}", e))))
        }
        .boxed()
        .shared();

        state.in_flight.insert(fingerprint.clone(), pending.clone());
        debug!("Registered in-flight request: {}", fingerprint.short());
        Lookup::Started(pending)
    }

    /// Cached value, or the shared result of a single upstream round trip
    pub async fn get_or_run<F, Fut>(&self, fingerprint: &Fingerprint, work: F) -> Result<Summary>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Summary>> + Send + 'static,
    {
        match self.acquire_in_flight(fingerprint, work) {
            Lookup::Hit(summary) => Ok(summary),
            Lookup::Joined(pending) | Lookup::Started(pending) => pending.await,
        }
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut state = self.state.lock();
        let ttl = self.config.ttl;
        let stale: Vec<Fingerprint> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.inserted_at.elapsed() > ttl)
            .map(|(fingerprint, _)| fingerprint.clone())
            .collect();

        for fingerprint in &stale {
            state.entries.pop(fingerprint);
        }
        state.expired += stale.len() as u64;
        stale.len()
    }

    /// Drop every cached entry (in-flight round trips are unaffected)
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let removed = state.entries.len();
        state.entries.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entries: state.entries.len(),
            capacity: state.entries.cap().get(),
            in_flight: state.in_flight.len(),
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            expired: state.expired,
            ttl_secs: self.config.ttl.as_secs(),
        }
    }
}
