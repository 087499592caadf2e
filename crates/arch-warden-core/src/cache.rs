//! Run-scoped, write-once-per-key caches.
//!
//! Both caches are constructed per orchestrator run and discarded with it,
//! never shared process-wide, so repeated runs and tests stay isolated.
//! Entries are populated lazily and never invalidated mid-run: concurrent
//! readers observe a miss followed by a fill, never a stale overwrite.

use crate::registry::Registry;
use crate::report::CacheStats;
use crate::resolver::{resolve, ResolveError, ResolveOptions, ResolvedArchitecture};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Caches file contents so each file is read from disk at most once per run.
#[derive(Debug, Default)]
pub struct ContentCache {
    inner: RwLock<HashMap<PathBuf, Arc<str>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ContentCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached content of a file, if present.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Arc<str>> {
        read_lock(&self.inner).get(path).cloned()
    }

    /// Pre-populates an entry, for callers that already hold the content.
    /// A previously filled entry wins; entries are write-once.
    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<Arc<str>>) {
        let mut inner = write_lock(&self.inner);
        inner.entry(path.into()).or_insert_with(|| content.into());
    }

    /// Returns the content of a file, reading it on first access.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the file cannot be read.
    pub async fn get_or_read(&self, path: &Path) -> std::io::Result<Arc<str>> {
        if let Some(content) = self.get(path) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(content);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let content: Arc<str> = tokio::fs::read_to_string(path).await?.into();
        Ok(self.fill(path, content))
    }

    /// Synchronous variant of [`ContentCache::get_or_read`] for blocking
    /// contexts (graph build, project-level checks).
    ///
    /// # Errors
    ///
    /// Returns the IO error if the file cannot be read.
    pub fn get_or_read_blocking(&self, path: &Path) -> std::io::Result<Arc<str>> {
        if let Some(content) = self.get(path) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(content);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let content: Arc<str> = std::fs::read_to_string(path)?.into();
        Ok(self.fill(path, content))
    }

    /// Write-once fill: if a concurrent reader filled the key first, the
    /// first fill wins and is returned.
    fn fill(&self, path: &Path, content: Arc<str>) -> Arc<str> {
        let mut inner = write_lock(&self.inner);
        inner
            .entry(path.to_path_buf())
            .or_insert(content)
            .clone()
    }

    /// Returns (hits, misses) counters.
    #[must_use]
    pub fn counters(&self) -> (usize, usize) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

/// Memoizes [`resolve`] results per architecture id for one run.
///
/// The resolution engine itself is stateless; the same architecture id
/// recurs across many files, so callers resolve through this cache.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    inner: RwLock<HashMap<String, Arc<ResolvedArchitecture>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ResolutionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves an architecture through the cache.
    ///
    /// # Errors
    ///
    /// Propagates resolution failures; failures are not cached.
    pub fn resolve(
        &self,
        registry: &Registry,
        arch_id: &str,
    ) -> Result<Arc<ResolvedArchitecture>, ResolveError> {
        if let Some(resolved) = read_lock(&self.inner).get(arch_id).cloned() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(resolved);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let resolved = Arc::new(resolve(registry, arch_id, &ResolveOptions::default())?);
        let mut inner = write_lock(&self.inner);
        Ok(inner
            .entry(arch_id.to_string())
            .or_insert(resolved)
            .clone())
    }

    /// Returns (hits, misses) counters.
    #[must_use]
    pub fn counters(&self) -> (usize, usize) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

/// Snapshots both caches into report statistics.
#[must_use]
pub fn stats(content: &ContentCache, resolution: &ResolutionCache) -> CacheStats {
    let (content_hits, content_misses) = content.counters();
    let (resolution_hits, resolution_misses) = resolution.counters();
    CacheStats {
        content_hits,
        content_misses,
        resolution_hits,
        resolution_misses,
    }
}
