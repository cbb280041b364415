//! Client bundle subsystem.
//!
//! # Data Flow
//! ```text
//! Bundle request (resolved path)
//!     → cache.rs (hit: return bytes)
//!     → inflight.rs (optional: join a running build for the same path)
//!     → gate.rs (initialize the compiler once)
//!     → compiler.rs / esbuild.rs (build)
//!     → cache.rs (store first artifact)
//! ```
//!
//! # Design Decisions
//! - Cache and gate are owned by an explicit `Bundle` context, injected
//!   into handlers through application state
//! - Cache entries live as long as the context; no eviction
//! - Redundant concurrent builds are allowed unless coalescing is enabled

pub mod cache;
pub mod compiler;
pub mod esbuild;
pub mod gate;
pub mod inflight;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;

use crate::observability::metrics;

pub use cache::BundleCache;
pub use compiler::{
    BuildInput, BuildOptions, BuildOutput, BundleError, Compiler, EntryPoint, InlineSource, Loader,
    OutputFile,
};
pub use esbuild::EsbuildCompiler;
pub use gate::{BuildGate, GateStatus, InitMode};
pub use inflight::InflightBuilds;

/// Shared bundling context: cache, gate and compiler.
#[derive(Clone)]
pub struct Bundle {
    cache: BundleCache,
    gate: Arc<BuildGate>,
    compiler: Arc<dyn Compiler>,
    working_dir: PathBuf,
    inflight: Option<InflightBuilds>,
}

impl Bundle {
    pub fn new(compiler: Arc<dyn Compiler>, mode: InitMode, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache: BundleCache::new(),
            gate: Arc::new(BuildGate::new(mode)),
            compiler,
            working_dir: working_dir.into(),
            inflight: None,
        }
    }

    /// Share one build between concurrent misses for the same key.
    pub fn with_coalescing(mut self) -> Self {
        self.inflight = Some(InflightBuilds::new());
        self
    }

    pub fn cache(&self) -> &BundleCache {
        &self.cache
    }

    pub fn gate(&self) -> &BuildGate {
        &self.gate
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn coalescing(&self) -> bool {
        self.inflight.is_some()
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.cache.get(key)
    }

    pub fn set(&self, key: impl Into<String>, contents: Bytes) {
        self.cache.set(key, contents)
    }

    /// Initialize the compiler if needed, then build.
    pub async fn build(&self, input: BuildInput) -> Result<BuildOutput, BundleError> {
        self.gate.ensure_ready(&self.compiler).await?;
        match self.compiler.build(input).await {
            Ok(output) => {
                metrics::record_build(if output.output_files.is_empty() { "empty" } else { "ok" });
                Ok(output)
            }
            Err(e) => {
                metrics::record_build("error");
                Err(e)
            }
        }
    }

    /// Cached bytes for `key`, or build, cache and return the first artifact.
    ///
    /// `Ok(None)` means the build succeeded but emitted nothing.
    pub async fn get_or_build<F>(&self, key: &str, input: F) -> Result<Option<Bytes>, BundleError>
    where
        F: FnOnce() -> BuildInput,
    {
        if let Some(bytes) = self.cache.get(key) {
            metrics::record_cache_hit();
            tracing::debug!(key, bytes = bytes.len(), "Bundle cache hit");
            return Ok(Some(bytes));
        }
        metrics::record_cache_miss();

        let this = self.clone();
        let owned_key = key.to_string();
        let input = input();
        let build = async move { this.build_and_store(owned_key, input).await };

        match &self.inflight {
            Some(inflight) => inflight.run(key, build).await,
            None => build.await,
        }
    }

    async fn build_and_store(&self, key: String, input: BuildInput) -> Result<Option<Bytes>, BundleError> {
        let output = self.build(input).await?;
        tracing::debug!(key = %key, outputs = output.output_files.len(), "Bundle built");

        match output.output_files.into_iter().next() {
            Some(first) => {
                self.cache.set(key, first.contents.clone());
                Ok(Some(first.contents))
            }
            None => {
                tracing::warn!(key = %key, "Build produced no output files");
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for Bundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundle")
            .field("cache_entries", &self.cache.len())
            .field("gate", &self.gate)
            .field("working_dir", &self.working_dir)
            .field("coalescing", &self.coalescing())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Counting {
        builds: AtomicUsize,
        empty: bool,
    }

    #[async_trait]
    impl Compiler for Counting {
        async fn initialize(&self, _mode: InitMode) -> Result<(), BundleError> {
            Ok(())
        }

        async fn build(&self, _input: BuildInput) -> Result<BuildOutput, BundleError> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.empty {
                return Ok(BuildOutput::default());
            }
            Ok(BuildOutput {
                output_files: vec![
                    OutputFile {
                        path: "stdin.js".into(),
                        contents: Bytes::from_static(b"entry"),
                    },
                    OutputFile {
                        path: "chunk.js".into(),
                        contents: Bytes::from_static(b"chunk"),
                    },
                ],
            })
        }
    }

    fn input() -> BuildInput {
        BuildInput::Inline(InlineSource {
            contents: String::new(),
            sourcefile: "x.jsx".into(),
            resolve_dir: PathBuf::from("."),
            loader: Loader::Jsx,
        })
    }

    fn bundle(compiler: Arc<Counting>) -> Bundle {
        Bundle::new(compiler, InitMode::Native, ".")
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let compiler = Arc::new(Counting::default());
        let bundle = bundle(compiler.clone());

        let first = bundle.get_or_build("/a.js", input).await.unwrap();
        let second = bundle.get_or_build("/a.js", input).await.unwrap();

        assert_eq!(first, Some(Bytes::from_static(b"entry")));
        assert_eq!(first, second);
        assert_eq!(compiler.builds.load(Ordering::SeqCst), 1);
        assert_eq!(bundle.gate().init_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_build_is_not_cached() {
        let compiler = Arc::new(Counting {
            empty: true,
            ..Default::default()
        });
        let bundle = bundle(compiler.clone());

        assert_eq!(bundle.get_or_build("/a.js", input).await.unwrap(), None);
        assert!(bundle.cache().is_empty());
        assert_eq!(bundle.get_or_build("/a.js", input).await.unwrap(), None);
        assert_eq!(compiler.builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_build_redundantly_without_coalescing() {
        let compiler = Arc::new(Counting::default());
        let bundle = bundle(compiler.clone());

        let (a, b) = tokio::join!(
            bundle.get_or_build("/a.js", input),
            bundle.get_or_build("/a.js", input)
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(compiler.builds.load(Ordering::SeqCst), 2);
        assert_eq!(bundle.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_coalescing_shares_one_build() {
        let compiler = Arc::new(Counting::default());
        let bundle = bundle(compiler.clone()).with_coalescing();

        let (a, b) = tokio::join!(
            bundle.get_or_build("/a.js", input),
            bundle.get_or_build("/a.js", input)
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(compiler.builds.load(Ordering::SeqCst), 1);
    }
}
