//! Read-through cache for hierarchy queries.
//!
//! Entries are keyed by `(workstream, operation)` and carry a *footprint*: the
//! set of workstream ids whose change can alter the cached value. Mutations
//! call [`HierarchyCache::invalidate`] with the nodes they touched, which drops
//! every entry whose footprint contains one of them.
//!
//! A computation that overlaps an invalidation must not be cached, or a value
//! computed from the old snapshot would outlive the write. Every invalidation
//! bumps a version counter under `gate`; an insert happens under the same gate
//! and only if the version is unchanged since the computation started.
//!
//! The cache fails open: when disabled, or when an entry holds an unexpected
//! value, the query runs against the database.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use moka::sync::Cache;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{CacheConfig, CacheMode};
use crate::error::Result;
use crate::types::{PermissionSet, PrincipalId, RollupReport, TreeNode, Workstream, WorkstreamId};

/// Which query an entry caches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum CacheOp {
    Ancestors,
    Descendants,
    Depth,
    Tree,
    Rollup,
    Permissions(PrincipalId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    pub node: WorkstreamId,
    pub op: CacheOp,
}

impl CacheKey {
    pub(crate) fn new(node: WorkstreamId, op: CacheOp) -> Self {
        Self { node, op }
    }
}

#[derive(Debug)]
pub(crate) enum CachedValue {
    Workstreams(Vec<Workstream>),
    Depth(u32),
    Tree(TreeNode),
    Rollup(RollupReport),
    Permissions(PermissionSet),
}

/// Values that can be stored in the cache.
pub(crate) trait Cacheable: Sized {
    fn into_cached(self) -> CachedValue;
    fn from_cached(value: &CachedValue) -> Option<Self>;
}

impl Cacheable for Vec<Workstream> {
    fn into_cached(self) -> CachedValue {
        CachedValue::Workstreams(self)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Workstreams(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl Cacheable for u32 {
    fn into_cached(self) -> CachedValue {
        CachedValue::Depth(self)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Depth(d) => Some(*d),
            _ => None,
        }
    }
}

impl Cacheable for TreeNode {
    fn into_cached(self) -> CachedValue {
        CachedValue::Tree(self)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Tree(t) => Some(t.clone()),
            _ => None,
        }
    }
}

impl Cacheable for RollupReport {
    fn into_cached(self) -> CachedValue {
        CachedValue::Rollup(self)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Rollup(r) => Some(r.clone()),
            _ => None,
        }
    }
}

impl Cacheable for PermissionSet {
    fn into_cached(self) -> CachedValue {
        CachedValue::Permissions(self)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Permissions(p) => Some(p.clone()),
            _ => None,
        }
    }
}

/// A freshly computed value and the nodes it depends on.
pub(crate) struct Computed<T> {
    pub value: T,
    pub footprint: HashSet<WorkstreamId>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Arc<CachedValue>,
    version: u64,
    footprint: Arc<HashSet<WorkstreamId>>,
}

/// Counters describing cache behaviour since open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Whether caching is enabled
    pub enabled: bool,
    /// Entries currently held (approximate)
    pub entry_count: u64,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that ran the query
    pub misses: u64,
    /// Entries dropped by mutations
    pub invalidated: u64,
    /// Results not stored because a mutation overlapped their computation
    pub stale_discards: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    invalidated: AtomicU64,
    stale_discards: AtomicU64,
}

/// Footprint-invalidated cache shared by all readers of one store.
pub(crate) struct HierarchyCache {
    inner: Option<Cache<CacheKey, CacheEntry>>,
    version: AtomicU64,
    gate: Mutex<()>,
    counters: Counters,
}

impl HierarchyCache {
    pub(crate) fn new(config: &CacheConfig) -> Self {
        let inner = match config.mode {
            CacheMode::Disabled => None,
            CacheMode::Enabled => {
                let mut builder = Cache::builder().max_capacity(config.max_capacity);
                if let Some(ttl) = config.ttl() {
                    builder = builder.time_to_live(ttl);
                }
                Some(builder.build())
            }
        };

        Self {
            inner,
            version: AtomicU64::new(0),
            gate: Mutex::new(()),
            counters: Counters::default(),
        }
    }

    // The gate protects no data, so a poisoned lock is still usable.
    fn gate(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached value for `key`, or run `compute` and cache it.
    pub(crate) fn get_or_compute<T, F>(&self, key: CacheKey, compute: F) -> Result<T>
    where
        T: Cacheable + Clone,
        F: FnOnce() -> Result<Computed<T>>,
    {
        let Some(inner) = &self.inner else {
            return compute().map(|c| c.value);
        };

        if let Some(entry) = inner.get(&key) {
            if let Some(value) = T::from_cached(&entry.value) {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(?key, version = entry.version, "Cache hit");
                return Ok(value);
            }
            warn!(?key, "Cache entry holds an unexpected value type; recomputing");
            inner.invalidate(&key);
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        let version = self.version.load(Ordering::Acquire);
        let computed = compute()?;

        let _gate = self.gate();
        if self.version.load(Ordering::Acquire) == version {
            inner.insert(
                key,
                CacheEntry {
                    value: Arc::new(computed.value.clone().into_cached()),
                    version,
                    footprint: Arc::new(computed.footprint),
                },
            );
        } else {
            self.counters.stale_discards.fetch_add(1, Ordering::Relaxed);
            debug!(?key, "Hierarchy changed during computation; result not cached");
        }

        Ok(computed.value)
    }

    /// Drop every entry whose footprint contains any of `nodes`.
    pub(crate) fn invalidate(&self, nodes: &[WorkstreamId]) {
        let Some(inner) = &self.inner else {
            return;
        };

        let _gate = self.gate();
        self.version.fetch_add(1, Ordering::AcqRel);

        let mut dropped = 0u64;
        for (key, entry) in inner.iter() {
            if nodes.iter().any(|n| entry.footprint.contains(n)) {
                inner.invalidate(key.as_ref());
                dropped += 1;
            }
        }

        self.counters.invalidated.fetch_add(dropped, Ordering::Relaxed);
        debug!(?nodes, dropped, "Invalidated cache entries");
    }

    /// Drop every entry depending on `node`.
    pub(crate) fn invalidate_subtree(&self, node: WorkstreamId) {
        self.invalidate(&[node]);
    }

    pub(crate) fn stats(&self) -> CacheStats {
        let entry_count = self.inner.as_ref().map_or(0, |inner| {
            inner.run_pending_tasks();
            inner.entry_count()
        });

        CacheStats {
            enabled: self.inner.is_some(),
            entry_count,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            invalidated: self.counters.invalidated.load(Ordering::Relaxed),
            stale_discards: self.counters.stale_discards.load(Ordering::Relaxed),
        }
    }
}
