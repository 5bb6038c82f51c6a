//! In-memory TTL caching for upstream responses.
//!
//! Memoization is transparent to the router: an adapter may consult its
//! cache before going to the network, and the routing layer neither requires
//! nor forbids it.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<String, CacheEntry>,
    default_ttl: Duration,
}

impl CacheInner {
    fn new(default_ttl: Duration) -> Self {
        Self {
            map: HashMap::new(),
            default_ttl,
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).and_then(|entry| {
            if Instant::now() <= entry.expires_at {
                Some(entry.body.clone())
            } else {
                None
            }
        })
    }

    fn put(&mut self, key: String, body: String, ttl_override: Option<Duration>) {
        let ttl = ttl_override.unwrap_or(self.default_ttl);
        let expires_at = Instant::now() + ttl;
        self.map.insert(key, CacheEntry { body, expires_at });
    }
}

/// Thread-safe TTL cache keyed by request URL.
#[derive(Debug, Clone)]
pub struct CacheStore {
    inner: Arc<RwLock<CacheInner>>,
}

impl CacheStore {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner::new(default_ttl))),
        }
    }

    /// Default TTL of one hour, matching the historical-data tier upstream
    /// portals tolerate.
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(3_600))
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached body for `key`, if present and not expired.
    pub fn get(&self, key: &str) -> Option<String> {
        self.read().get(key)
    }

    /// Store a body under `key`; no-op when the cache is disabled.
    pub fn put(&self, key: String, body: String, ttl_override: Option<Duration>) {
        let mut store = self.write();
        if store.default_ttl == Duration::ZERO {
            return;
        }
        store.put(key, body, ttl_override);
    }

    /// Drop expired entries.
    pub fn clear_expired(&self) {
        let now = Instant::now();
        self.write().map.retain(|_, entry| entry.expires_at > now);
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.write().map.clear();
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_disabled(&self) -> bool {
        self.read().default_ttl == Duration::ZERO
    }
}
