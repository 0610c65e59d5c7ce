//! Host contracts: record tree access, dependency recording and the
//! record-scoped cache for virtual objects.

use crate::record::Record;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Handle on the host's record tree for one build (or one request)
pub trait Pad: Send + Sync {
    /// Look up a record by path and alt
    fn get(&self, path: &str, alt: &str) -> Option<Arc<Record>>;

    /// Child records of `record`, in the host's configured order
    fn children(&self, record: &Record) -> Vec<Arc<Record>>;

    /// Dependency recorder of the build context this pad serves
    fn dependencies(&self) -> &DependencyRecorder;

    /// Cache of virtual objects scoped to their backing record
    fn virtual_cache(&self) -> &VirtualCache;
}

/// Collects the source files the current build step depends on
///
/// Recording can be suspended for internal scans whose results are
/// covered by a checksum instead of fine-grained dependencies.
#[derive(Default)]
pub struct DependencyRecorder {
    recorded: Mutex<Vec<PathBuf>>,
    suspended: AtomicUsize,
}

impl DependencyRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dependency unless recording is suspended
    pub fn record(&self, path: impl AsRef<Path>) {
        if self.is_suspended() {
            return;
        }
        let path = path.as_ref();
        let mut recorded = self.recorded.lock();
        if !recorded.iter().any(|p| p == path) {
            recorded.push(path.to_path_buf());
        }
    }

    /// Suspend recording until the returned guard is dropped
    pub fn suspend(&self) -> SuspendGuard<'_> {
        self.suspended.fetch_add(1, Ordering::SeqCst);
        SuspendGuard { recorder: self }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst) > 0
    }

    /// Dependencies recorded so far, in first-seen order
    pub fn recorded(&self) -> Vec<PathBuf> {
        self.recorded.lock().clone()
    }

    /// Drain the recorded dependencies
    pub fn take(&self) -> Vec<PathBuf> {
        std::mem::take(&mut *self.recorded.lock())
    }
}

impl fmt::Debug for DependencyRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyRecorder")
            .field("recorded", &self.recorded.lock().len())
            .field("suspended", &self.is_suspended())
            .finish()
    }
}

/// Keeps dependency recording suspended while alive
#[must_use = "recording resumes as soon as the guard is dropped"]
pub struct SuspendGuard<'a> {
    recorder: &'a DependencyRecorder,
}

impl Drop for SuspendGuard<'_> {
    fn drop(&mut self) {
        self.recorder.suspended.fetch_sub(1, Ordering::SeqCst);
    }
}

impl fmt::Debug for SuspendGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SuspendGuard")
    }
}

/// Identity of a virtual object: backing record, alt and virtual path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualKey {
    pub record_path: String,
    pub alt: String,
    pub virtual_path: String,
}

impl VirtualKey {
    pub fn new(record: &Record, virtual_path: impl Into<String>) -> Self {
        Self {
            record_path: record.path.clone(),
            alt: record.alt.clone(),
            virtual_path: virtual_path.into(),
        }
    }
}

/// Record-scoped get-or-create cache for virtual objects
///
/// Creators run without the lock held, so they may themselves create
/// other virtual objects. When two creators race for the same key the
/// first stored value wins and both callers receive it.
#[derive(Default)]
pub struct VirtualCache {
    entries: Mutex<HashMap<VirtualKey, Arc<dyn Any + Send + Sync>>>,
}

impl VirtualCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached object if present and of type `T`
    pub fn get<T: Any + Send + Sync>(&self, key: &VirtualKey) -> Option<Arc<T>> {
        let entry = self.entries.lock().get(key).cloned()?;
        entry.downcast::<T>().ok()
    }

    /// Get the cached object for `key`, creating it if absent
    pub fn get_or_create<T, F>(&self, key: VirtualKey, creator: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Arc<T>,
    {
        match self.get_or_try_create::<T, Infallible, _>(key, || Ok(creator())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Fallible [`get_or_create`](Self::get_or_create); errors are not cached
    pub fn get_or_try_create<T, E, F>(&self, key: VirtualKey, creator: F) -> Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<Arc<T>, E>,
    {
        if let Some(existing) = self.get::<T>(&key) {
            return Ok(existing);
        }

        let created = creator()?;
        let stored = {
            let mut entries = self.entries.lock();
            entries
                .entry(key)
                .or_insert_with(|| created.clone() as Arc<dyn Any + Send + Sync>)
                .clone()
        };
        Ok(stored.downcast::<T>().unwrap_or(created))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl fmt::Debug for VirtualCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualCache")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_dedupes() {
        let deps = DependencyRecorder::new();
        deps.record("a.md");
        deps.record("b.md");
        deps.record("a.md");
        assert_eq!(deps.recorded(), vec![PathBuf::from("a.md"), PathBuf::from("b.md")]);
    }

    #[test]
    fn test_suspend_guard() {
        let deps = DependencyRecorder::new();
        {
            let _outer = deps.suspend();
            {
                let _inner = deps.suspend();
                deps.record("hidden.md");
            }
            deps.record("still-hidden.md");
            assert!(deps.is_suspended());
        }
        assert!(!deps.is_suspended());
        deps.record("visible.md");
        assert_eq!(deps.take(), vec![PathBuf::from("visible.md")]);
        assert!(deps.recorded().is_empty());
    }

    #[test]
    fn test_virtual_cache_identity() {
        let cache = VirtualCache::new();
        let record = Record::new("/blog");
        let key = VirtualKey::new(&record, "index-pages/x");

        let first = cache.get_or_create(key.clone(), || Arc::new("first".to_string()));
        let second = cache.get_or_create(key, || Arc::new("second".to_string()));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_virtual_cache_scoped_by_alt() {
        let cache = VirtualCache::new();
        let en = Record::new("/blog");
        let de = Record::new("/blog").with_alt("de");

        cache.get_or_create(VirtualKey::new(&en, "index-pages/x"), || Arc::new(1u32));
        let other = cache.get_or_create(VirtualKey::new(&de, "index-pages/x"), || Arc::new(2u32));

        assert_eq!(*other, 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_virtual_cache_does_not_store_errors() {
        let cache = VirtualCache::new();
        let record = Record::new("/blog");
        let key = VirtualKey::new(&record, "index-pages/broken");

        let rv = cache.get_or_try_create::<String, &str, _>(key, || Err("boom"));
        assert_eq!(rv.unwrap_err(), "boom");
        assert!(cache.is_empty());
    }
}
