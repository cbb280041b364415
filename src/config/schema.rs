//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML; every field
//! has a default so an empty file is a valid configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::bundle::compiler::default_targets;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HydrateConfig {
    /// Listener configuration (bind address, in-flight limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Bundler settings.
    pub bundler: BundlerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Client bundle routes served by the hydration route factory.
    pub client_routes: Vec<ClientRouteConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum requests processed concurrently; excess requests get 503.
    pub max_in_flight: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_in_flight: 10_000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Bundler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BundlerConfig {
    /// Native bundler executable, resolved on PATH.
    pub executable: String,

    /// Remote build service used when the executable is unavailable.
    pub service_url: Option<String>,

    /// Directory imports resolve against (default: current directory).
    pub working_dir: Option<PathBuf>,

    /// Browser targets.
    pub targets: Vec<String>,

    /// Share one build between concurrent misses for the same path.
    pub coalesce_builds: bool,

    /// Upper bound for a single build in seconds.
    pub build_timeout_secs: u64,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            executable: "esbuild".to_string(),
            service_url: None,
            working_dir: None,
            targets: default_targets(),
            coalesce_builds: false,
            build_timeout_secs: 60,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter (e.g. "info" or "hydrate_router=debug"); RUST_LOG wins.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// One client bundle route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientRouteConfig {
    /// Path the bundle is served at (e.g. "/islands/counter.js").
    pub path: String,

    /// Import header prepended to the generated source.
    #[serde(default)]
    pub import: Option<String>,

    /// Components mounted by the bundle, in order.
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
}

/// One component of a client bundle.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComponentConfig {
    /// Exported identifier. Extracted from the source when absent.
    #[serde(default)]
    pub name: Option<String>,

    /// Component source file, relative to the bundler working directory.
    pub source_path: PathBuf,

    /// DOM element the component is mounted into.
    pub mount_id: String,

    /// Remove existing children of the mount element first.
    #[serde(default = "default_clear_children")]
    pub clear_children: bool,
}

fn default_clear_children() -> bool {
    true
}
