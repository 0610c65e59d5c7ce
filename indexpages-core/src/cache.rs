//! Process-wide memoization of expensive index computations.
//!
//! Index nodes are already cached per record in the host's virtual cache,
//! which covers a regular build. A dev server, however, resolves each
//! request against a fresh pad, so grouping results are kept here as well
//! and cleared at the start of every full build.

use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Key of a memoized computation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Distinct sub-group ids under the node at `path` in `alt`
    SubindexIds { path: String, alt: String },
    /// Member record paths of sub-group `id` under the node at `path` in `alt`
    ChildIds { path: String, alt: String, id: String },
    /// The parsed index configuration
    Config,
}

/// Statistics about cache usage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Get cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Hits: {} | Misses: {} | Hit Rate: {:.1}% | Entries: {}",
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.entries
        )
    }
}

type Entries = HashMap<CacheKey, Arc<dyn Any + Send + Sync>>;

/// Thread-safe get-or-create table
///
/// The lock covers the lookup and the store, never the creator, so two
/// callers racing on one key may both compute it; the last store wins.
/// A null cache ([`ComputationCache::null`]) never stores anything.
pub struct ComputationCache {
    entries: Option<Mutex<Entries>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ComputationCache {
    pub fn new() -> Self {
        Self::with_entries(Some(Mutex::new(HashMap::new())))
    }

    /// A cache that always invokes the creator
    pub fn null() -> Self {
        Self::with_entries(None)
    }

    fn with_entries(entries: Option<Mutex<Entries>>) -> Self {
        Self {
            entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn is_null(&self) -> bool {
        self.entries.is_none()
    }

    fn lookup<T: Any + Send + Sync>(&self, key: &CacheKey) -> Option<Arc<T>> {
        let entries = self.entries.as_ref()?;
        let found = entries.lock().get(key).cloned();
        match found.and_then(|value| value.downcast::<T>().ok()) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn store<T: Any + Send + Sync>(&self, key: CacheKey, value: &Arc<T>) {
        if let Some(entries) = &self.entries {
            entries.lock().insert(key, value.clone());
        }
    }

    pub fn get_or_create<T, F>(&self, key: CacheKey, creator: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        if let Some(value) = self.lookup::<T>(&key) {
            return value;
        }
        let value = Arc::new(creator());
        self.store(key, &value);
        value
    }

    /// Like [`get_or_create`](Self::get_or_create); errors are returned and not cached
    pub fn get_or_try_create<T, E, F>(&self, key: CacheKey, creator: F) -> Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.lookup::<T>(&key) {
            return Ok(value);
        }
        let value = Arc::new(creator()?);
        self.store(key, &value);
        Ok(value)
    }

    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            let mut entries = entries.lock();
            debug!(entries = entries.len(), "clearing computation cache");
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map(|e| e.lock().len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl Default for ComputationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ComputationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputationCache")
            .field("null", &self.is_null())
            .field("entries", &self.len())
            .finish()
    }
}
