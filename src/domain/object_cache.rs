//! Identity cache of decoded objects over a key-value store.
//!
//! [`ObjectCache`] turns hashes fetched from a [`KeyValueStore`] into domain
//! objects through a caller-supplied decode function. Lookups hand out
//! [`Arc`] handles; the cache itself only keeps a [`Weak`] pointer per key.
//! As long as any caller holds a handle, every lookup of that key returns
//! the identical object. Once the last handle is dropped the entry is dead,
//! and the next lookup fetches and decodes a fresh object.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use futures_util::future::try_join_all;

use crate::error::{DecodeError, SyncError};
use crate::store::{Hash, KeyValueStore};

/// Decode function turning a fetched hash into a domain object.
pub type DecodeFn<T> = dyn Fn(Hash) -> Result<T, DecodeError> + Send + Sync;

/// Entry count below which dead entries are never swept.
const MIN_SWEEP_THRESHOLD: usize = 64;

/// Weak table of live objects plus the size at which the next sweep runs.
#[derive(Debug)]
struct Entries<T> {
    live: HashMap<String, Weak<T>>,
    sweep_at: usize,
}

impl<T> Entries<T> {
    fn new() -> Self {
        Self {
            live: HashMap::new(),
            sweep_at: MIN_SWEEP_THRESHOLD,
        }
    }

    fn sweep(&mut self) -> usize {
        let before = self.live.len();
        self.live.retain(|_, weak| weak.strong_count() > 0);
        self.sweep_at = (self.live.len() * 2).max(MIN_SWEEP_THRESHOLD);
        before - self.live.len()
    }
}

/// Key-value store client with object decoding and identity caching.
///
/// # Identity
///
/// With caching enabled, two lookups of the same key return handles for
/// which [`Arc::ptr_eq`] holds, provided a handle from the first lookup is
/// still alive in between. With caching disabled every lookup decodes a new
/// object and the cache is neither consulted nor updated.
///
/// Concurrent misses for the same key converge: whichever lookup registers
/// second discards its own decode result and returns the instance that is
/// already live.
pub struct ObjectCache<T> {
    store: Arc<dyn KeyValueStore>,
    decode: Box<DecodeFn<T>>,
    caching: AtomicBool,
    entries: Mutex<Entries<T>>,
}

impl<T> fmt::Debug for ObjectCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCache")
            .field("store", &self.store)
            .field("caching", &self.caching())
            .field("entries", &self.lock().live.len())
            .finish_non_exhaustive()
    }
}

impl<T> ObjectCache<T> {
    /// Creates a cache over `store` using `decode`, with caching enabled.
    pub fn new<F>(store: Arc<dyn KeyValueStore>, decode: F) -> Self
    where
        F: Fn(Hash) -> Result<T, DecodeError> + Send + Sync + 'static,
    {
        Self {
            store,
            decode: Box::new(decode),
            caching: AtomicBool::new(true),
            entries: Mutex::new(Entries::new()),
        }
    }

    /// Same as [`ObjectCache::new`] with the initial caching switch given.
    pub fn with_caching<F>(store: Arc<dyn KeyValueStore>, decode: F, caching: bool) -> Self
    where
        F: Fn(Hash) -> Result<T, DecodeError> + Send + Sync + 'static,
    {
        let cache = Self::new(store, decode);
        cache.set_caching(caching);
        cache
    }

    /// Returns the underlying store for raw hash and set commands.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Returns whether lookups consult and populate the cache.
    #[must_use]
    pub fn caching(&self) -> bool {
        self.caching.load(Ordering::SeqCst)
    }

    /// Enables or disables caching at runtime.
    ///
    /// Entries registered while caching was on are kept; they are consulted
    /// again once caching is re-enabled and their objects are still alive.
    pub fn set_caching(&self, enabled: bool) {
        self.caching.store(enabled, Ordering::SeqCst);
        tracing::debug!(enabled, "object caching toggled");
    }

    /// Gets the object for `key`.
    ///
    /// Returns `Ok(None)` if the store holds no hash for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StoreUnavailable`] or
    /// [`SyncError::MalformedHash`] if the fetch fails, and
    /// [`SyncError::Decode`] carrying the decode function's error unchanged.
    pub async fn get(&self, key: &str) -> Result<Option<Arc<T>>, SyncError> {
        let caching = self.caching();
        if caching && let Some(object) = self.lookup(key) {
            tracing::debug!(key, "object cache hit");
            return Ok(Some(object));
        }

        let Some(hash) = self.store.fetch_hash(key).await? else {
            tracing::debug!(key, "no hash stored");
            return Ok(None);
        };
        let object = Arc::new((self.decode)(hash)?);
        if !caching {
            return Ok(Some(object));
        }
        tracing::debug!(key, "object cache miss, registered");
        Ok(Some(self.register(key, object)))
    }

    /// Gets the objects for all `keys`, in order.
    ///
    /// Each key resolves independently and concurrently; the result is not
    /// an atomic snapshot of the store.
    ///
    /// # Errors
    ///
    /// Returns the first error any single lookup produces.
    pub async fn get_many<K: AsRef<str>>(
        &self,
        keys: &[K],
    ) -> Result<Vec<Option<Arc<T>>>, SyncError> {
        try_join_all(keys.iter().map(|key| self.get(key.as_ref()))).await
    }

    /// Returns the live cached object for `key` without touching the store.
    #[must_use]
    pub fn cached(&self, key: &str) -> Option<Arc<T>> {
        self.lookup(key)
    }

    /// Number of keys whose objects are currently alive.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.lock()
            .live
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Drops every dead entry. Returns how many were removed.
    pub fn purge(&self) -> usize {
        self.lock().sweep()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries<T>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, key: &str) -> Option<Arc<T>> {
        self.lock().live.get(key).and_then(Weak::upgrade)
    }

    /// Registers `object` under `key` unless a live instance is already
    /// registered, in which case that instance wins.
    fn register(&self, key: &str, object: Arc<T>) -> Arc<T> {
        let mut entries = self.lock();
        if let Some(existing) = entries.live.get(key).and_then(Weak::upgrade) {
            drop(entries);
            return existing;
        }
        entries.live.insert(key.to_string(), Arc::downgrade(&object));
        if entries.live.len() >= entries.sweep_at {
            let removed = entries.sweep();
            tracing::trace!(removed, "swept dead cache entries");
        }
        object
    }
}
