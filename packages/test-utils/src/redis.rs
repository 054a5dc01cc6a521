//! Mock Redis store for testing subscriber record access
//!
//! Provides a [`MockRedisStore`] that simulates the Redis hash commands used
//! for subscriber records in-memory, for testing without a real Redis server.
//!
//! # Lock Poisoning Recovery
//!
//! This implementation uses `unwrap_or_else(|e| e.into_inner())` when acquiring
//! locks to recover from poisoned locks. If a test panics while holding a lock,
//! subsequent tests can still access the store rather than failing with a
//! `PoisonError`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Mock Redis client for testing hash operations
///
/// Every key holds a hash (field → value), mirroring how subscriber records
/// are laid out. Like Redis, a hash whose last field is removed disappears.
///
/// # Thread Safety
///
/// `MockRedisStore` uses `Arc<RwLock<...>>` internally, so it can be safely
/// cloned and shared across threads. All clones share the same underlying store.
///
/// # Example
///
/// ```rust
/// use spotshot_test_utils::MockRedisStore;
///
/// let store = MockRedisStore::new();
/// store.hset("spot_usr_id:alice", "num_songs", "20");
///
/// assert!(store.hexists("spot_usr_id:alice", "num_songs"));
/// assert_eq!(store.keys("spot_usr_id:*"), vec!["spot_usr_id:alice".to_string()]);
/// ```
#[derive(Clone, Default)]
pub struct MockRedisStore {
    store: Arc<RwLock<HashMap<String, HashMap<String, String>>>>,
}

impl MockRedisStore {
    /// Create a new mock Redis store
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a hash field (HSET equivalent)
    pub fn hset(&self, key: &str, field: &str, value: impl Into<String>) {
        let mut store = self.store.write().unwrap_or_else(|e| e.into_inner());
        store
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.into());
    }

    /// Get a hash field (HGET equivalent)
    pub fn hget(&self, key: &str, field: &str) -> Option<String> {
        let store = self.store.read().unwrap_or_else(|e| e.into_inner());
        store.get(key).and_then(|hash| hash.get(field).cloned())
    }

    /// Check if a hash field exists (HEXISTS equivalent)
    pub fn hexists(&self, key: &str, field: &str) -> bool {
        let store = self.store.read().unwrap_or_else(|e| e.into_inner());
        store.get(key).is_some_and(|hash| hash.contains_key(field))
    }

    /// Delete a hash field (HDEL equivalent)
    ///
    /// Returns `true` if the field existed and was deleted.
    pub fn hdel(&self, key: &str, field: &str) -> bool {
        let mut store = self.store.write().unwrap_or_else(|e| e.into_inner());
        let Some(hash) = store.get_mut(key) else {
            return false;
        };
        let removed = hash.remove(field).is_some();
        if hash.is_empty() {
            store.remove(key);
        }
        removed
    }

    /// Get every field of a hash (HGETALL equivalent)
    ///
    /// Returns an empty map when the key doesn't exist.
    pub fn hgetall(&self, key: &str) -> HashMap<String, String> {
        let store = self.store.read().unwrap_or_else(|e| e.into_inner());
        store.get(key).cloned().unwrap_or_default()
    }

    /// Delete a key (DEL equivalent)
    ///
    /// Returns `true` if the key existed and was deleted.
    pub fn del(&self, key: &str) -> bool {
        let mut store = self.store.write().unwrap_or_else(|e| e.into_inner());
        store.remove(key).is_some()
    }

    /// Check if a key exists (EXISTS equivalent)
    pub fn exists(&self, key: &str) -> bool {
        let store = self.store.read().unwrap_or_else(|e| e.into_inner());
        store.contains_key(key)
    }

    /// Get all keys matching a glob pattern (KEYS equivalent)
    ///
    /// Supports `*` and `?` wildcards. Keys are returned sorted so tests
    /// see a stable enumeration order.
    pub fn keys(&self, pattern: &str) -> Vec<String> {
        let store = self.store.read().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = store
            .keys()
            .filter(|k| glob_match(pattern.as_bytes(), k.as_bytes()))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Clear all keys (FLUSHALL equivalent)
    pub fn flush_all(&self) {
        let mut store = self.store.write().unwrap_or_else(|e| e.into_inner());
        store.clear();
    }

    /// Get the number of keys in the store
    pub fn len(&self) -> usize {
        let store = self.store.read().unwrap_or_else(|e| e.into_inner());
        store.len()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Redis-style glob matching for `*` and `?`
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = star {
            p = star_p + 1;
            t = star_t + 1;
            star = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_redis_store_new() {
        let store = MockRedisStore::new();
        assert!(store.is_empty());
    }

    #[test]
    fn test_hset_and_hget() {
        let store = MockRedisStore::new();
        store.hset("user:1", "num_songs", "20");

        assert!(store.exists("user:1"));
        assert_eq!(store.hget("user:1", "num_songs"), Some("20".to_string()));
        assert_eq!(store.hget("user:1", "missing"), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_hset_overwrites_field() {
        let store = MockRedisStore::new();
        store.hset("user:1", "num_songs", "20");
        store.hset("user:1", "num_songs", "30");

        assert_eq!(store.hget("user:1", "num_songs"), Some("30".to_string()));
        assert_eq!(store.hgetall("user:1").len(), 1);
    }

    #[test]
    fn test_hdel_removes_field_only() {
        let store = MockRedisStore::new();
        store.hset("user:1", "num_songs", "20");
        store.hset("user:1", "refresh_token", "tok");

        assert!(store.hdel("user:1", "num_songs"));
        assert!(!store.hexists("user:1", "num_songs"));
        assert!(store.hexists("user:1", "refresh_token"));
    }

    #[test]
    fn test_hdel_last_field_removes_key() {
        let store = MockRedisStore::new();
        store.hset("user:1", "num_songs", "20");

        assert!(store.hdel("user:1", "num_songs"));
        assert!(!store.exists("user:1"));
        assert!(!store.hdel("user:1", "num_songs"));
    }

    #[test]
    fn test_hgetall_missing_key_is_empty() {
        let store = MockRedisStore::new();
        assert!(store.hgetall("nope").is_empty());
    }

    #[test]
    fn test_keys_prefix_pattern() {
        let store = MockRedisStore::new();
        store.hset("spot_usr_id:bob", "num_songs", "1");
        store.hset("spot_usr_id:alice", "num_songs", "1");
        store.hset("session:xyz", "data", "1");

        let keys = store.keys("spot_usr_id:*");
        assert_eq!(
            keys,
            vec!["spot_usr_id:alice".to_string(), "spot_usr_id:bob".to_string()]
        );
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match(b"*", b"anything"));
        assert!(glob_match(b"a*c", b"abbbc"));
        assert!(glob_match(b"a?c", b"abc"));
        assert!(!glob_match(b"a?c", b"abbc"));
        assert!(!glob_match(b"prefix:*", b"other:key"));
        assert!(glob_match(b"prefix:*", b"prefix:"));
    }

    #[test]
    fn test_del_and_flush_all() {
        let store = MockRedisStore::new();
        store.hset("a", "f", "1");
        store.hset("b", "f", "1");

        assert!(store.del("a"));
        assert!(!store.del("a"));
        store.flush_all();
        assert!(store.is_empty());
    }

    #[test]
    fn test_mock_redis_store_clone() {
        let store = MockRedisStore::new();
        store.hset("key1", "f", "value1");

        let store2 = store.clone();
        assert_eq!(store2.hget("key1", "f"), Some("value1".to_string()));

        // Changes in one should reflect in the other (shared Arc)
        store2.hset("key2", "f", "value2");
        assert!(store.exists("key2"));
    }
}
