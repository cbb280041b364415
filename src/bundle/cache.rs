//! Compiled bundle cache.

use std::sync::Arc;

use axum::body::Bytes;
use dashmap::DashMap;

use crate::observability::metrics;

/// A thread-safe, process-lifetime cache of compiled bundles.
///
/// Keys are resolved request paths, not route templates. Entries are never
/// evicted: a bundle is derived from fixed server-side inputs, so the bytes
/// for a key never change.
#[derive(Debug, Clone, Default)]
pub struct BundleCache {
    inner: Arc<DashMap<String, Bytes>>,
}

impl BundleCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached bytes for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    /// Store bytes for `key`. A later write for the same key replaces the earlier one.
    pub fn set(&self, key: impl Into<String>, contents: Bytes) {
        let key = key.into();
        tracing::debug!(key = %key, bytes = contents.len(), "Bundle cached");
        self.inner.insert(key, contents);
        metrics::record_cache_size(self.inner.len());
    }

    /// Number of cached bundles.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Cached keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Total size of all cached bundles in bytes.
    pub fn total_bytes(&self) -> usize {
        self.inner.iter().map(|r| r.value().len()).sum()
    }
}
