//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use hydrate_router::bundle::{
    BuildInput, BuildOutput, BundleError, Compiler, InitMode, OutputFile,
};
use hydrate_router::config::{ClientRouteConfig, ComponentConfig, HydrateConfig};
use hydrate_router::http::HttpServer;
use hydrate_router::lifecycle::{build_app_with, Shutdown};
use hydrate_router::routing::Dispatcher;
use tokio::net::TcpListener;

pub const COUNTER_SOURCE: &str = "export class Counter extends Component {\n  render() { return <button>0</button>; }\n}\n";

pub const BUNDLE_PATH: &str = "/islands/counter.js";

/// In-process stand-in for esbuild that records what it was asked to do.
#[derive(Default)]
pub struct FakeCompiler {
    pub inits: AtomicUsize,
    pub builds: AtomicUsize,
    pub sources: Mutex<Vec<String>>,
    pub fail_init: bool,
    pub empty_output: bool,
    pub delay: Duration,
}

impl FakeCompiler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    pub fn failing_init() -> Arc<Self> {
        Arc::new(Self {
            fail_init: true,
            ..Self::default()
        })
    }

    pub fn empty_output() -> Arc<Self> {
        Arc::new(Self {
            empty_output: true,
            ..Self::default()
        })
    }

    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Compiler for FakeCompiler {
    async fn initialize(&self, _mode: InitMode) -> Result<(), BundleError> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err(BundleError::ExecutableNotFound("esbuild".into()));
        }
        Ok(())
    }

    async fn build(&self, input: BuildInput) -> Result<BuildOutput, BundleError> {
        let n = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
        if let BuildInput::Inline(inline) = input {
            self.sources.lock().unwrap().push(inline.contents);
        }
        tokio::time::sleep(self.delay).await;

        if self.empty_output {
            return Ok(BuildOutput::default());
        }
        Ok(BuildOutput {
            output_files: vec![OutputFile {
                path: "stdin.js".into(),
                contents: Bytes::from(format!("console.log(\"build {n}\");")),
            }],
        })
    }
}

/// Config with one client route serving `counter.jsx` from `dir`.
pub fn counter_config(addr: SocketAddr, dir: &Path) -> HydrateConfig {
    std::fs::write(dir.join("counter.jsx"), COUNTER_SOURCE).unwrap();

    let mut config = HydrateConfig::default();
    config.listener.bind_address = addr.to_string();
    config.bundler.working_dir = Some(dir.to_path_buf());
    config.client_routes.push(ClientRouteConfig {
        path: BUNDLE_PATH.into(),
        import: None,
        components: vec![ComponentConfig {
            name: None,
            source_path: "counter.jsx".into(),
            mount_id: "counter".into(),
            clear_children: true,
        }],
    });
    config
}

/// Assemble the app around `compiler` and serve it on `bind_address`.
pub async fn start_app(config: HydrateConfig, compiler: Arc<FakeCompiler>) -> Shutdown {
    let working_dir = config.bundler.working_dir.clone().unwrap();
    let addr: SocketAddr = config.listener.bind_address.parse().unwrap();
    let app = build_app_with(config, compiler, InitMode::Native, working_dir).unwrap();

    let shutdown = Shutdown::new();
    let listener = TcpListener::bind(addr).await.unwrap();
    let server = app.into_server();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown
}

/// A client without pooling or system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Serve a bare dispatcher with unit state on `addr`.
pub async fn start_dispatcher(addr: SocketAddr, dispatcher: Dispatcher<()>) -> Shutdown {
    let mut config = HydrateConfig::default();
    config.listener.bind_address = addr.to_string();

    let shutdown = Shutdown::new();
    let listener = TcpListener::bind(addr).await.unwrap();
    let server = HttpServer::new(config, dispatcher, ());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown
}
