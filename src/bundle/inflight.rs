//! Per-key in-flight build registry.
//!
//! When enabled, concurrent cache misses for the same path await one shared
//! build instead of each compiling the same source.

use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;

use crate::bundle::compiler::BundleError;

type BuildFuture = Shared<BoxFuture<'static, Result<Option<Bytes>, Arc<BundleError>>>>;

#[derive(Clone, Default)]
pub struct InflightBuilds {
    pending: Arc<DashMap<String, BuildFuture>>,
}

impl InflightBuilds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of builds currently running.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Run `build` for `key` unless a build for `key` is already running, in
    /// which case its result is awaited instead.
    pub async fn run<F>(&self, key: &str, build: F) -> Result<Option<Bytes>, BundleError>
    where
        F: Future<Output = Result<Option<Bytes>, BundleError>> + Send + 'static,
    {
        let shared = match self.pending.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                tracing::debug!(key, "Joining in-flight build");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let shared = build.map(|r| r.map_err(Arc::new)).boxed().shared();
                entry.insert(shared.clone());
                shared
            }
        };

        let result = shared.clone().await;
        self.pending
            .remove_if(key, |_, running| running.ptr_eq(&shared));

        result.map_err(BundleError::Shared)
    }
}
