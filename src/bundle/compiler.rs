//! Compiler interface consumed by the bundle layer.
//!
//! The compiler itself is an external collaborator; this module only fixes
//! the shape of what goes in and what comes out.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bundle::gate::InitMode;

/// Errors raised by compiler initialization or builds.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("bundler executable `{0}` was not found on PATH")]
    ExecutableNotFound(String),

    #[error("no build service configured for sandboxed builds")]
    NoBuildService,

    #[error("compiler used before initialization")]
    NotInitialized,

    #[error("compiler initialization failed: {0}")]
    InitFailed(Arc<BundleError>),

    #[error("failed to spawn bundler: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("I/O error during build: {0}")]
    Io(#[from] std::io::Error),

    #[error("bundler exited with {status}: {stderr}")]
    BuildFailed { status: String, stderr: String },

    #[error("build service request failed: {0}")]
    Service(#[from] reqwest::Error),

    #[error("build service answered {0}")]
    ServiceStatus(u16),

    #[error("build did not finish within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Shared(Arc<BundleError>),
}

/// Source loader used for inline sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Js,
    Jsx,
    Ts,
    Tsx,
}

impl Loader {
    pub fn as_str(&self) -> &'static str {
        match self {
            Loader::Js => "js",
            Loader::Jsx => "jsx",
            Loader::Ts => "ts",
            Loader::Tsx => "tsx",
        }
    }
}

/// A named entry point resolvable by the compiler (file path or URL).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub name: String,
    pub location: String,
}

/// A source document handed to the compiler directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineSource {
    pub contents: String,
    /// Synthetic file name used in diagnostics and for the loader.
    pub sourcefile: String,
    /// Directory relative imports resolve against.
    pub resolve_dir: PathBuf,
    pub loader: Loader,
}

/// What to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildInput {
    EntryPoints {
        entries: Vec<EntryPoint>,
        working_dir: PathBuf,
    },
    Inline(InlineSource),
}

/// Fixed build settings shared by every build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    pub bundle: bool,
    pub minify: bool,
    pub format: String,
    pub platform: String,
    pub splitting: bool,
    pub tree_shaking: bool,
    pub targets: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            bundle: true,
            minify: true,
            format: "esm".to_string(),
            platform: "neutral".to_string(),
            splitting: true,
            tree_shaking: true,
            targets: default_targets(),
        }
    }
}

pub fn default_targets() -> Vec<String> {
    vec![
        "chrome96".to_string(),
        "firefox95".to_string(),
        "safari14".to_string(),
    ]
}

/// One emitted artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: String,
    pub contents: Bytes,
}

/// Everything a build produced. Entry outputs come first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutput {
    pub output_files: Vec<OutputFile>,
}

impl BuildOutput {
    pub fn first(&self) -> Option<&OutputFile> {
        self.output_files.first()
    }
}

/// An initializable JavaScript compiler/bundler.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// One-time setup. Called at most once per gate.
    async fn initialize(&self, mode: InitMode) -> Result<(), BundleError>;

    /// Compile one input. Only called after a successful `initialize`.
    async fn build(&self, input: BuildInput) -> Result<BuildOutput, BundleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_input_serializes_tagged() {
        let input = BuildInput::Inline(InlineSource {
            contents: "export {}".into(),
            sourcefile: "app.jsx".into(),
            resolve_dir: PathBuf::from("/srv"),
            loader: Loader::Jsx,
        });
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["kind"], "inline");
        assert_eq!(json["loader"], "jsx");
        assert_eq!(json["sourcefile"], "app.jsx");
    }

    #[test]
    fn test_default_options() {
        let options = BuildOptions::default();
        assert!(options.bundle && options.minify && options.splitting && options.tree_shaking);
        assert_eq!(options.format, "esm");
        assert_eq!(options.platform, "neutral");
        assert_eq!(options.targets, vec!["chrome96", "firefox95", "safari14"]);
    }

    #[test]
    fn test_init_failure_message_keeps_cause() {
        let err = BundleError::InitFailed(Arc::new(BundleError::NoBuildService));
        assert_eq!(
            err.to_string(),
            "compiler initialization failed: no build service configured for sandboxed builds"
        );
    }
}
