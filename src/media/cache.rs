//! Key/value cache with per-entry TTL.
//!
//! The media source owns one [`CacheStore`]. Values are strings (JSON for
//! structured data) so a file or network backend can replace the in-memory
//! default without touching callers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Minimal TTL cache interface.
pub trait CacheStore: Send + Sync {
    /// Value for `key` if present and not expired.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key` for `ttl`.
    fn set(&self, key: &str, value: String, ttl: Duration);

    /// Remaining lifetime of `key`.
    fn ttl(&self, key: &str) -> Option<Duration>;

    fn delete(&self, key: &str);
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process cache backed by a concurrent map. Expired entries are dropped
/// lazily on access.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    inner: Arc<DashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn live(&self, key: &str) -> Option<Entry> {
        let entry = self.inner.get(key).map(|r| r.value().clone())?;
        if entry.expires_at > Instant::now() {
            Some(entry)
        } else {
            self.inner.remove(key);
            None
        }
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.live(key).map(|e| e.value)
    }

    fn set(&self, key: &str, value: String, ttl: Duration) {
        self.inner.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn ttl(&self, key: &str) -> Option<Duration> {
        self.live(key)
            .map(|e| e.expires_at.saturating_duration_since(Instant::now()))
    }

    fn delete(&self, key: &str) {
        self.inner.remove(key);
    }
}
