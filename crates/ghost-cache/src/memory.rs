//! Unbounded in-memory content cache.
//!
//! One instance is owned by, and private to, each scoped filesystem. The
//! cache is process-lifetime state: entries are created on first read or
//! written through on mutation, and destroyed only by explicit
//! invalidation (local or remote).

use ghost_core::{CacheKey, CacheKind};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Capacity of the invalidation broadcast channel.
///
/// Slow subscribers that fall more than this many events behind observe a
/// `Lagged` error and must treat their derived state as stale.
const INVALIDATION_CHANNEL_CAPACITY: usize = 1024;

/// A cached view of one file.
#[derive(Debug, Clone)]
pub enum CachedValue {
    /// Raw byte content, shared without copying.
    Buffer(Arc<Vec<u8>>),
    /// Parsed JSON content, shared without copying.
    Object(Arc<Value>),
}

impl CachedValue {
    /// Returns the cache kind this value belongs under.
    #[must_use]
    pub const fn kind(&self) -> CacheKind {
        match self {
            Self::Buffer(_) => CacheKind::Buffer,
            Self::Object(_) => CacheKind::Object,
        }
    }
}

/// Unbounded process-lifetime cache of file content.
///
/// # Thread Safety
///
/// This type is `Send` and `Sync`; individual get/set/invalidate calls are
/// atomic with respect to each other (one lock). There are no
/// cross-operation transactions — read-modify-write sequences need caller
/// level mutual exclusion.
///
/// # Examples
///
/// ```
/// use ghost_cache::MemoryContentCache;
///
/// let cache = MemoryContentCache::new();
/// cache.set_buffer("bots/bot-7/bot.config.json", b"{}".to_vec());
///
/// assert!(cache.has_any("bots/bot-7/bot.config.json"));
/// cache.invalidate_path("bots/bot-7/bot.config.json");
/// assert!(!cache.has_any("bots/bot-7/bot.config.json"));
/// ```
pub struct MemoryContentCache {
    entries: Mutex<HashMap<CacheKey, CachedValue>>,
    invalidations: broadcast::Sender<CacheKey>,
}

impl std::fmt::Debug for MemoryContentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryContentCache")
            .field("len", &self.len())
            .finish()
    }
}

impl MemoryContentCache {
    /// Creates a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        let (invalidations, _) = broadcast::channel(INVALIDATION_CHANNEL_CAPACITY);
        Self {
            entries: Mutex::new(HashMap::new()),
            invalidations,
        }
    }

    /// Returns `true` if an entry exists for `key`.
    #[must_use]
    pub fn has(&self, key: &CacheKey) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    /// Returns `true` if either cache kind holds an entry for `path`.
    ///
    /// A cached entry of either kind is proof the file exists; existence
    /// checks use this before touching the storage driver.
    #[must_use]
    pub fn has_any(&self, path: &str) -> bool {
        let entries = self.entries.lock().unwrap();
        entries.contains_key(&CacheKey::buffer(path)) || entries.contains_key(&CacheKey::object(path))
    }

    /// Returns the cached raw bytes for `path`, if present.
    #[must_use]
    pub fn get_buffer(&self, path: &str) -> Option<Arc<Vec<u8>>> {
        let entries = self.entries.lock().unwrap();
        match entries.get(&CacheKey::buffer(path)) {
            Some(CachedValue::Buffer(content)) => Some(Arc::clone(content)),
            _ => None,
        }
    }

    /// Returns the cached parsed value for `path`, if present.
    #[must_use]
    pub fn get_object(&self, path: &str) -> Option<Arc<Value>> {
        let entries = self.entries.lock().unwrap();
        match entries.get(&CacheKey::object(path)) {
            Some(CachedValue::Object(value)) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Caches the raw bytes of `path`, returning the stored handle.
    pub fn set_buffer(&self, path: &str, content: Vec<u8>) -> Arc<Vec<u8>> {
        let content = Arc::new(content);
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            CacheKey::buffer(path),
            CachedValue::Buffer(Arc::clone(&content)),
        );
        tracing::debug!(path, "cached buffer content");
        content
    }

    /// Caches the parsed value of `path`, returning the stored handle.
    pub fn set_object(&self, path: &str, value: Value) -> Arc<Value> {
        let value = Arc::new(value);
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            CacheKey::object(path),
            CachedValue::Object(Arc::clone(&value)),
        );
        tracing::debug!(path, "cached object content");
        value
    }

    /// Drops the entry for `key` and notifies subscribers.
    ///
    /// A no-op on the map when the entry is absent; the invalidation event
    /// is emitted regardless so dependents learn about remote changes to
    /// files they never cached.
    pub fn invalidate(&self, key: &CacheKey) {
        self.entries.lock().unwrap().remove(key);
        let _ = self.invalidations.send(key.clone());
    }

    /// Drops both cache kinds for `path`.
    pub fn invalidate_path(&self, path: &str) {
        self.invalidate(&CacheKey::buffer(path));
        self.invalidate(&CacheKey::object(path));
    }

    /// Drops every entry whose path starts with `prefix`.
    ///
    /// Used by recursive deletions, where the affected key set is not known
    /// up front.
    pub fn invalidate_prefix(&self, prefix: &str) {
        let removed: Vec<CacheKey> = {
            let mut entries = self.entries.lock().unwrap();
            let keys: Vec<CacheKey> = entries
                .keys()
                .filter(|k| k.path().starts_with(prefix))
                .cloned()
                .collect();
            for key in &keys {
                entries.remove(key);
            }
            keys
        };
        for key in removed {
            let _ = self.invalidations.send(key);
        }
    }

    /// Subscribes to the invalidation stream.
    ///
    /// Every invalidation — explicit, from a local mutation, or remote —
    /// is delivered to all subscribers. Dependent services that derive
    /// state from file content use this to know when to re-read.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CacheKey> {
        self.invalidations.subscribe()
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Returns whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all entries without emitting invalidation events.
    ///
    /// Test-support surface; production code invalidates explicitly.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl Default for MemoryContentCache {
    fn default() -> Self {
        Self::new()
    }
}
