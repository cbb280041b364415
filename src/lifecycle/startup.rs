//! Startup orchestration.
//!
//! # Responsibilities
//! - Pick the compiler initialization mode and build the bundle context
//! - Read component sources and compile the route table
//! - Hand the server everything it needs to accept traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The compiler itself is initialized lazily by the first bundle request
//! - Listeners start last (traffic only when ready)

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::admin::status_route;
use crate::bundle::{Bundle, BuildOptions, Compiler, EsbuildCompiler, InitMode};
use crate::config::{ClientRouteConfig, HydrateConfig};
use crate::http::{AppState, HttpServer};
use crate::hydrate::{client_route, CodegenError, HydrateComponent, DEFAULT_IMPORT};
use crate::routing::{Dispatcher, RouteError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to resolve working directory: {0}")]
    WorkingDir(#[source] std::io::Error),

    #[error("failed to read component source {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("client route `{route}`: {source}")]
    Component {
        route: String,
        #[source]
        source: CodegenError,
    },

    #[error("invalid build service URL: {0}")]
    ServiceUrl(#[from] url::ParseError),

    #[error(transparent)]
    Routes(#[from] RouteError),
}

/// Everything the HTTP server needs, assembled from configuration.
pub struct App {
    pub state: AppState,
    pub dispatcher: Dispatcher<AppState>,
}

impl App {
    pub fn into_server(self) -> HttpServer<AppState> {
        let config = (*self.state.config).clone();
        HttpServer::new(config, self.dispatcher, self.state)
    }
}

/// Build the bundle context, read every component and compile the routes.
pub fn build_app(config: HydrateConfig) -> Result<App, StartupError> {
    let working_dir = resolve_working_dir(&config)?;
    let mode = InitMode::detect(&config.bundler.executable);
    let compiler = build_compiler(&config)?;
    build_app_with(config, compiler, mode, working_dir)
}

/// Like [`build_app`] with an explicit compiler, mode and working directory.
pub fn build_app_with(
    config: HydrateConfig,
    compiler: Arc<dyn Compiler>,
    mode: InitMode,
    working_dir: PathBuf,
) -> Result<App, StartupError> {
    let mut bundle = Bundle::new(compiler, mode, working_dir.clone());
    if config.bundler.coalesce_builds {
        bundle = bundle.with_coalescing();
    }

    let mut routes = status_route::<AppState>();
    for route in &config.client_routes {
        let components = load_components(route, &working_dir)?;
        let import = route.import.as_deref().unwrap_or(DEFAULT_IMPORT);
        routes = routes.merge(client_route(&route.path, &components, import));
    }

    let dispatcher = Dispatcher::register(routes)?;

    tracing::info!(
        mode = %mode,
        working_dir = %working_dir.display(),
        routes = dispatcher.table().len(),
        coalescing = config.bundler.coalesce_builds,
        "Application assembled"
    );

    Ok(App {
        state: AppState {
            bundle,
            config: Arc::new(config),
        },
        dispatcher,
    })
}

fn resolve_working_dir(config: &HydrateConfig) -> Result<PathBuf, StartupError> {
    match &config.bundler.working_dir {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir().map_err(StartupError::WorkingDir),
    }
}

fn build_compiler(config: &HydrateConfig) -> Result<Arc<dyn Compiler>, StartupError> {
    let bundler = &config.bundler;
    let options = BuildOptions {
        targets: bundler.targets.clone(),
        ..BuildOptions::default()
    };
    let mut compiler = EsbuildCompiler::new(
        bundler.executable.clone(),
        options,
        Duration::from_secs(bundler.build_timeout_secs),
    );
    if let Some(raw) = &bundler.service_url {
        compiler = compiler.with_service(Url::parse(raw)?);
    }
    Ok(Arc::new(compiler))
}

/// Read each component source relative to `working_dir`.
pub fn load_components(
    route: &ClientRouteConfig,
    working_dir: &Path,
) -> Result<Vec<HydrateComponent>, StartupError> {
    route
        .components
        .iter()
        .map(|component| {
            let path = working_dir.join(&component.source_path);
            let source = fs::read_to_string(&path)
                .map_err(|source| StartupError::Source { path, source })?;

            let built = match &component.name {
                Some(name) => HydrateComponent::new(name.clone(), source, component.mount_id.clone()),
                None => HydrateComponent::from_source(source, component.mount_id.clone()),
            };
            built
                .map(|c| c.clear_children(component.clear_children))
                .map_err(|source| StartupError::Component {
                    route: route.path.clone(),
                    source,
                })
        })
        .collect()
}
