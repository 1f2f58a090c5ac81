//! TTL-bounded store of previously computed responses.
//!
//! Keys are `(method, path)`; values are fully constructed before insertion,
//! so a reader either sees a complete entry or none at all. An entry past its
//! deadline is treated as absent on the next access and removed there; a
//! background sweep (`purge_expired`) reclaims entries nobody reads again.
//!
//! Concurrent cache-miss policy: redundant compute, last-write-wins. Each
//! concurrent miss invokes the producer independently and the final `put`
//! overwrites. Under a thundering herd this duplicates host callbacks but
//! needs no cross-request coordination.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Cache key: method plus concrete request path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: String,
    path: String,
}

impl CacheKey {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }
}

/// A cached response body with its expiry deadline.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub body: Arc<str>,
    pub content_type: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Time left before expiry, for diagnostics.
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// A concurrent, TTL-bounded response store.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: DashMap<CacheKey, CacheEntry>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch an unexpired entry. Expired entries are removed here rather
    /// than waiting for the sweep.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => return Some(entry.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            // Re-check under the removal: a concurrent put may have
            // refreshed the entry since the read above.
            self.entries
                .remove_if(key, |_, entry| entry.is_expired());
        }
        None
    }

    /// Insert or overwrite unconditionally.
    pub fn put(&self, key: CacheKey, body: impl Into<Arc<str>>, content_type: String, ttl: Duration) {
        let entry = CacheEntry {
            body: body.into(),
            content_type,
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key, entry);
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        self.entries.retain(|_, entry| !entry.is_expired());
    }

    /// Drop everything, expired or not.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
