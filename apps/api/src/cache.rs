//! Response cache layer: content-addressable, TTL-based, best-effort.
//!
//! Both the per-job score memo and the whole-response cache go through the
//! `CacheStore` trait. Every store operation is best-effort: an unreachable
//! or failing backend only forfeits caching for that call, it never fails the
//! request. Entries are immutable once written and expire passively; no
//! sweeper runs.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use tracing::warn;

/// Pluggable key-value cache with per-entry TTL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the cached value, or None on miss, expiry, or backend failure.
    async fn get(&self, key: &str) -> Option<String>;

    /// Stores a value with a TTL. Failures are logged and swallowed.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration);
}

/// Builds a content-addressable cache key: identical inputs always map to the
/// same key, independent of caller identity.
pub fn content_key(namespace: &str, parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]); // unit separator guards against concatenation collisions
    }
    format!("{namespace}:{}", hex::encode(hasher.finalize()))
}

// ────────────────────────────────────────────────────────────────────────────
// Redis-backed store
// ────────────────────────────────────────────────────────────────────────────

/// Cache store backed by Redis. Expiry is enforced by the server (`SET EX`).
pub struct RedisCacheStore {
    client: redis::Client,
}

impl RedisCacheStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                warn!("cache get skipped, redis unavailable: {e}");
                return None;
            }
        };
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("cache get failed for {key}: {e}");
                None
            }
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                warn!("cache set skipped, redis unavailable: {e}");
                return;
            }
        };
        if let Err(e) = conn
            .set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
        {
            warn!("cache set failed for {key}: {e}");
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-process fallback store
// ────────────────────────────────────────────────────────────────────────────

/// Default capacity of the in-process store. Bounds memory on long-running
/// processes where an unbounded map would only ever grow.
const MEMORY_CACHE_CAPACITY: usize = 1024;

struct MemoryEntry {
    value: String,
    created_at: Instant,
    ttl: Duration,
}

impl MemoryEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

/// Bounded LRU used when no Redis URL is configured. TTL is checked at read
/// time; expired entries are dropped on access rather than swept.
pub struct MemoryCacheStore {
    entries: Mutex<LruCache<String, MemoryEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::with_capacity(MEMORY_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;
        if let Some(entry) = entries.get(key) {
            if !entry.is_expired() {
                return Some(entry.value.clone());
            }
        }
        // Expired entries are dropped on access, not swept.
        entries.pop(key);
        None
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(
                key.to_string(),
                MemoryEntry {
                    value: value.to_string(),
                    created_at: Instant::now(),
                    ttl,
                },
            );
        }
    }
}
