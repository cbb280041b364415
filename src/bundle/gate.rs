//! One-time lazy compiler initialization.
//!
//! # States
//! ```text
//! NotStarted → InProgress(shared future) → Ready
//!                                        → Failed(error)
//! ```
//!
//! # Design Decisions
//! - The first caller starts initialization; everyone else awaits the same
//!   shared future
//! - The lock is never held across an await
//! - Failure is remembered: the state never returns to NotStarted
//! - The strategy is fixed at construction from an environment check

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use serde::Serialize;

use crate::bundle::compiler::{BundleError, Compiler};

/// How the compiler gets initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InitMode {
    /// A native bundler executable can be spawned as a subprocess.
    Native,
    /// No subprocess capability; builds go to a remote build service.
    Sandboxed,
}

impl InitMode {
    /// Native when `executable` resolves on `PATH`, sandboxed otherwise.
    pub fn detect(executable: &str) -> Self {
        match which::which(executable) {
            Ok(path) => {
                tracing::info!(executable = %path.display(), "Native bundler available");
                InitMode::Native
            }
            Err(e) => {
                tracing::info!(executable, error = %e, "Native bundler unavailable, using sandboxed mode");
                InitMode::Sandboxed
            }
        }
    }
}

impl fmt::Display for InitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitMode::Native => f.write_str("native"),
            InitMode::Sandboxed => f.write_str("sandboxed"),
        }
    }
}

/// Observable gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    NotStarted,
    InProgress,
    Ready,
    Failed,
}

type InitFuture = Shared<BoxFuture<'static, Result<(), Arc<BundleError>>>>;

enum GateState {
    NotStarted,
    InProgress(InitFuture),
    Ready,
    Failed(Arc<BundleError>),
}

/// Ensures the compiler is initialized exactly once.
pub struct BuildGate {
    mode: InitMode,
    state: Mutex<GateState>,
    init_calls: AtomicUsize,
}

impl BuildGate {
    pub fn new(mode: InitMode) -> Self {
        Self {
            mode,
            state: Mutex::new(GateState::NotStarted),
            init_calls: AtomicUsize::new(0),
        }
    }

    pub fn mode(&self) -> InitMode {
        self.mode
    }

    pub fn status(&self) -> GateStatus {
        match &*self.state.lock().expect("build gate mutex poisoned") {
            GateState::NotStarted => GateStatus::NotStarted,
            GateState::InProgress(_) => GateStatus::InProgress,
            GateState::Ready => GateStatus::Ready,
            GateState::Failed(_) => GateStatus::Failed,
        }
    }

    /// Number of `Compiler::initialize` calls issued (0 or 1).
    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    /// Initialize `compiler` if needed and wait until it is ready.
    pub async fn ensure_ready(&self, compiler: &Arc<dyn Compiler>) -> Result<(), BundleError> {
        let pending = {
            let mut state = self.state.lock().expect("build gate mutex poisoned");
            match &*state {
                GateState::Ready => return Ok(()),
                GateState::Failed(err) => return Err(BundleError::InitFailed(Arc::clone(err))),
                GateState::InProgress(pending) => pending.clone(),
                GateState::NotStarted => {
                    self.init_calls.fetch_add(1, Ordering::SeqCst);
                    tracing::info!(mode = %self.mode, "Initializing compiler");

                    let compiler = Arc::clone(compiler);
                    let mode = self.mode;
                    let pending = async move { compiler.initialize(mode).await.map_err(Arc::new) }
                        .boxed()
                        .shared();
                    *state = GateState::InProgress(pending.clone());
                    pending
                }
            }
        };

        let result = pending.await;

        let mut state = self.state.lock().expect("build gate mutex poisoned");
        if let GateState::InProgress(_) = &*state {
            *state = match &result {
                Ok(()) => {
                    tracing::info!(mode = %self.mode, "Compiler ready");
                    GateState::Ready
                }
                Err(err) => {
                    tracing::error!(mode = %self.mode, error = %err, "Compiler initialization failed");
                    GateState::Failed(Arc::clone(err))
                }
            };
        }

        result.map_err(BundleError::InitFailed)
    }
}

impl fmt::Debug for BuildGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildGate")
            .field("mode", &self.mode)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::compiler::{BuildInput, BuildOutput};
    use async_trait::async_trait;
    use std::time::Duration;

    struct SlowInit {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Compiler for SlowInit {
        async fn initialize(&self, _mode: InitMode) -> Result<(), BundleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            if self.fail {
                Err(BundleError::NoBuildService)
            } else {
                Ok(())
            }
        }

        async fn build(&self, _input: BuildInput) -> Result<BuildOutput, BundleError> {
            Ok(BuildOutput::default())
        }
    }

    fn compiler(fail: bool) -> (Arc<SlowInit>, Arc<dyn Compiler>) {
        let inner = Arc::new(SlowInit {
            calls: AtomicUsize::new(0),
            fail,
        });
        let dynamic: Arc<dyn Compiler> = inner.clone();
        (inner, dynamic)
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_initialization() {
        let (inner, compiler) = compiler(false);
        let gate = Arc::new(BuildGate::new(InitMode::Native));
        assert_eq!(gate.status(), GateStatus::NotStarted);

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let gate = gate.clone();
            let compiler = compiler.clone();
            tasks.push(tokio::spawn(async move { gate.ensure_ready(&compiler).await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(gate.init_calls(), 1);
        assert_eq!(gate.status(), GateStatus::Ready);

        // Ready: returns immediately without re-initializing.
        gate.ensure_ready(&compiler).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_sticky() {
        let (inner, compiler) = compiler(true);
        let gate = BuildGate::new(InitMode::Sandboxed);

        let first = gate.ensure_ready(&compiler).await;
        assert!(matches!(first, Err(BundleError::InitFailed(_))));
        assert_eq!(gate.status(), GateStatus::Failed);

        let second = gate.ensure_ready(&compiler).await;
        assert!(matches!(second, Err(BundleError::InitFailed(_))));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detect_unknown_executable_is_sandboxed() {
        assert_eq!(
            InitMode::detect("definitely-not-a-real-bundler-binary"),
            InitMode::Sandboxed
        );
    }
}
