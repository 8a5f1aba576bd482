//! In-process LRU cache of finished aggregation results.
//!
//! Entries are keyed by a fingerprint of the canonical filter plus the page
//! requested, and hold the normalized [`AggregateResult`]. The cache is bounded
//! by entry count and by an approximate byte size; whichever limit is hit first
//! evicts the least recently used entries. There is no invalidation besides
//! [`ResultCache::clear`]: the dataset changes on a slow batch cadence and a
//! new handle is built after each refresh.

use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::config;
use crate::error::Result;
use crate::models::{AggregateResult, AggregatedRow, AnalyticsFilter};

/// Limits for a [`ResultCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of cached results; 0 disables caching.
    pub max_items: usize,
    /// Maximum approximate size of all cached results, in bytes.
    pub max_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_items: config::DEFAULT_CACHE_MAX_ITEMS,
            max_bytes: config::DEFAULT_CACHE_MAX_BYTES,
        }
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub items: usize,
    pub size_bytes: usize,
}

impl CacheStats {
    /// Hits over lookups, 0 before the first lookup.
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

struct CacheEntry {
    result: AggregateResult,
    size: usize,
}

struct Inner {
    entries: LruCache<String, CacheEntry>,
    size_bytes: usize,
}

/// Thread-safe LRU cache of aggregation results.
pub struct ResultCache {
    config: CacheConfig,
    inner: Mutex<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ResultCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            // Eviction is driven by both limits, so the LRU itself is unbounded.
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                size_bytes: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a result, promoting it to most recently used.
    pub fn get(&self, fingerprint: &str) -> Option<AggregateResult> {
        let mut inner = self.inner.lock();
        match inner.entries.get(fingerprint) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(fingerprint, "result cache hit");
                Some(entry.result.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(fingerprint, "result cache miss");
                None
            }
        }
    }

    /// Store a result, evicting least recently used entries to stay within
    /// both limits. A result larger than the byte limit is not stored.
    pub fn set(&self, fingerprint: String, result: AggregateResult) {
        if self.config.max_items == 0 {
            return;
        }
        let size = estimate_size(&fingerprint, &result);
        if size > self.config.max_bytes {
            debug!(size, "result too large to cache");
            return;
        }

        let mut inner = self.inner.lock();
        if let Some(old) = inner.entries.put(fingerprint, CacheEntry { result, size }) {
            inner.size_bytes -= old.size;
        }
        inner.size_bytes += size;

        while inner.entries.len() > self.config.max_items
            || inner.size_bytes > self.config.max_bytes
        {
            match inner.entries.pop_lru() {
                Some((_, evicted)) => {
                    inner.size_bytes -= evicted.size;
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate size of the cached results.
    pub fn size_bytes(&self) -> usize {
        self.inner.lock().size_bytes
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.size_bytes = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            items: inner.entries.len(),
            size_bytes: inner.size_bytes,
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[derive(Serialize)]
struct FingerprintKey<'a> {
    filter: &'a AnalyticsFilter,
    limit: Option<usize>,
    offset: Option<usize>,
}

/// Cache key for a request.
///
/// Filters that differ only in list order or duplicates share a key. An
/// absent offset and an offset of 0 request the same page.
pub fn fingerprint(
    filter: &AnalyticsFilter,
    limit: Option<usize>,
    offset: Option<usize>,
) -> Result<String> {
    let canonical = filter.canonical();
    let key = FingerprintKey {
        filter: &canonical,
        limit,
        offset: offset.filter(|&n| n > 0),
    };
    Ok(serde_json::to_string(&key)?)
}

fn estimate_size(fingerprint: &str, result: &AggregateResult) -> usize {
    let rows: usize = result.rows.iter().map(row_size).sum();
    fingerprint.len() + std::mem::size_of::<CacheEntry>() + rows
}

fn row_size(row: &AggregatedRow) -> usize {
    std::mem::size_of::<AggregatedRow>()
        + row.functional_code.len()
        + row.functional_name.len()
        + row.economic_code.len()
        + row.economic_name.len()
}
