//! In-process TTL key/value store
//!
//! Backs both the response cache and the rate-limiter counters. Values are
//! stored as serialized JSON strings so a cached response reads back
//! byte-identical to what was written. Expiry is lazy: reads drop expired
//! entries, and writes trigger an occasional sweep so abandoned keys do not
//! accumulate.

use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use ahash::{AHashMap, RandomState};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CollegiumError, Result};

const SWEEP_INTERVAL: usize = 256;

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Thread-safe TTL map.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    entries: AHashMap<String, Entry>,
    writes_since_sweep: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: AHashMap::new(),
                writes_since_sweep: 0,
            }),
        }
    }

    /// Raw string value if present and unexpired.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut inner = self.lock();
        match inner.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Some(entry.value.clone());
            }
            Some(_) => {}
            None => return None,
        }
        // Expired: drop it now instead of waiting for a sweep.
        inner.entries.remove(key);
        None
    }

    pub fn set(&self, key: &str, value: String, ttl: Duration) {
        let mut inner = self.lock();
        inner.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        inner.writes_since_sweep += 1;
        if inner.writes_since_sweep >= SWEEP_INTERVAL {
            let now = Instant::now();
            inner.entries.retain(|_, e| e.expires_at > now);
            inner.writes_since_sweep = 0;
        }
    }

    pub fn delete(&self, key: &str) {
        self.lock().entries.remove(key);
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                // A corrupt entry behaves like a miss.
                tracing::debug!("dropping undecodable cache entry {key}: {e}");
                self.delete(key);
                None
            }
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let raw = serde_json::to_string(value).map_err(|e| CollegiumError::Json {
            source: e,
            context: format!("serializing cache entry {key}"),
        })?;
        self.set(key, raw, ttl);
        Ok(())
    }

    /// Counter read for the rate limiter; absent or expired counts as zero.
    pub fn counter(&self, key: &str) -> u64 {
        self.get(key).and_then(|v| v.parse().ok()).unwrap_or(0)
    }

    /// Store a counter, resetting its TTL.
    pub fn set_counter(&self, key: &str, value: u64, ttl: Duration) {
        self.set(key, value.to_string(), ttl);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned cache is still a valid cache; the map itself cannot be
        // left in a torn state by any of our operations.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Response-cache key: tenant in the clear for debuggability, the
/// normalized query and limit folded into one hash.
pub fn response_cache_key(tenant_id: &str, normalized_query: &str, limit: usize) -> String {
    // Fixed seeds keep keys stable across processes and restarts.
    let state = RandomState::with_seeds(0x7061, 0x636b, 0x6564, 0x2e2e);
    let mut hasher = state.build_hasher();
    normalized_query.hash(&mut hasher);
    limit.hash(&mut hasher);
    format!("search:{tenant_id}:{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_roundtrip() {
        let store = MemoryStore::new();
        store.set("k", "value".to_string(), Duration::from_secs(60));
        assert_eq!(store.get("k").as_deref(), Some("value"));
    }

    #[test]
    fn test_entries_expire() {
        let store = MemoryStore::new();
        store.set("k", "value".to_string(), Duration::from_millis(20));
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_delete() {
        let store = MemoryStore::new();
        store.set("k", "value".to_string(), Duration::from_secs(60));
        store.delete("k");
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_json_roundtrip_is_byte_identical() {
        let store = MemoryStore::new();
        let value = serde_json::json!({"results": [1, 2, 3], "count": 3});
        store
            .set_json("k", &value, Duration::from_secs(60))
            .unwrap();
        let raw = store.get("k").unwrap();
        assert_eq!(raw, serde_json::to_string(&value).unwrap());
        let back: serde_json::Value = store.get_json("k").unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_counter_defaults_to_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.counter("missing"), 0);
        store.set_counter("c", 41, Duration::from_secs(60));
        assert_eq!(store.counter("c"), 41);
    }

    #[test]
    fn test_cache_key_stable_and_distinct() {
        let a = response_cache_key("abc", "fee structure", 10);
        let b = response_cache_key("abc", "fee structure", 10);
        assert_eq!(a, b);
        assert!(a.starts_with("search:abc:"));

        assert_ne!(a, response_cache_key("abc", "fee structure", 20));
        assert_ne!(a, response_cache_key("abc", "hostel", 10));
        assert_ne!(a, response_cache_key("xyz", "fee structure", 10));
    }
}
