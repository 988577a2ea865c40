//! In-process cache for final candidate lists.
//!
//! Keyed by (normalized query, options digest). LRU eviction with TTL.
//! Disabled unless `ENABLE_CACHE` is set; TTL comes from
//! `CACHE_TTL_SECONDS`.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

use scout_types::{Candidate, FusionMethod};

const DEFAULT_MAX_SIZE: usize = 200;

/// Counters exposed for health introspection.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsSnapshot {
    /// Lookups that returned a live entry.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
    /// Entries dropped by TTL or LRU pressure.
    pub evictions: u64,
    /// Current entry count.
    pub size: usize,
}

struct CacheEntry {
    candidates: Vec<Candidate>,
    fusion: FusionMethod,
    inserted_at: Instant,
}

struct Inner {
    entries: HashMap<u64, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// TTL/LRU cache of fused candidate lists.
pub struct ResultCache {
    inner: Mutex<Inner>,
    max_size: usize,
    ttl: Duration,
}

impl ResultCache {
    /// Build a cache with the given TTL.
    #[must_use]
    pub fn new(ttl_secs: u64) -> Self {
        Self::with_capacity(DEFAULT_MAX_SIZE, ttl_secs)
    }

    /// Build a cache with explicit capacity and TTL.
    #[must_use]
    pub fn with_capacity(max_size: usize, ttl_secs: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            max_size,
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    fn key(query: &str, options_digest: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        query.trim().to_lowercase().hash(&mut hasher);
        options_digest.hash(&mut hasher);
        hasher.finish()
    }

    /// Cached candidates (and the fusion that produced them) for a query,
    /// if present and not expired.
    #[must_use]
    pub fn get(&self, query: &str, options_digest: &str) -> Option<(Vec<Candidate>, FusionMethod)> {
        let key = Self::key(query, options_digest);
        let mut inner = self.inner.lock().ok()?;
        let expired = inner
            .entries
            .get(&key)
            .is_some_and(|e| e.inserted_at.elapsed() > self.ttl);
        if expired {
            inner.entries.remove(&key);
            inner.evictions += 1;
        }
        match inner.entries.get(&key) {
            Some(entry) => {
                let hit = (entry.candidates.clone(), entry.fusion);
                inner.hits += 1;
                Some(hit)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Store candidates for a query.
    pub fn set(
        &self,
        query: &str,
        options_digest: &str,
        candidates: Vec<Candidate>,
        fusion: FusionMethod,
    ) {
        let key = Self::key(query, options_digest);
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        let now = Instant::now();
        let ttl = self.ttl;
        let before = inner.entries.len();
        inner
            .entries
            .retain(|_, e| now.duration_since(e.inserted_at) <= ttl);
        inner.evictions += (before - inner.entries.len()) as u64;
        while inner.entries.len() >= self.max_size && !inner.entries.is_empty() {
            if let Some(oldest_key) = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| *k)
            {
                inner.entries.remove(&oldest_key);
                inner.evictions += 1;
            } else {
                break;
            }
        }
        inner.entries.insert(
            key,
            CacheEntry {
                candidates,
                fusion,
                inserted_at: now,
            },
        );
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.inner
            .lock()
            .map(|inner| CacheStatsSnapshot {
                hits: inner.hits,
                misses: inner.misses,
                evictions: inner.evictions,
                size: inner.entries.len(),
            })
            .unwrap_or_default()
    }
}
