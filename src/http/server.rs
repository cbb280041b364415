//! HTTP server setup.
//!
//! # Responsibilities
//! - Wrap the route dispatcher in an Axum fallback handler
//! - Supply the connection context (local and remote addresses)
//! - Wire up middleware (request ID, tracing, timeout, in-flight limit)
//! - Serve with graceful shutdown
//! - Record request metrics

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRef, State},
    http::Request,
    middleware,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::bundle::Bundle;
use crate::config::HydrateConfig;
use crate::http::limit::{limit_middleware, InFlightLimit};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::lifecycle::signals::shutdown_signal;
use crate::observability::metrics;
use crate::routing::{Dispatcher, HandlerContext};

/// Application state injected into route handlers.
#[derive(Clone)]
pub struct AppState {
    pub bundle: Bundle,
    pub config: Arc<HydrateConfig>,
}

impl FromRef<AppState> for Bundle {
    fn from_ref(state: &AppState) -> Bundle {
        state.bundle.clone()
    }
}

/// Per-server state seen by the fallback handler.
struct ServerState<S> {
    dispatcher: Arc<Dispatcher<S>>,
    state: S,
    local_addr: SocketAddr,
}

impl<S: Clone> Clone for ServerState<S> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            state: self.state.clone(),
            local_addr: self.local_addr,
        }
    }
}

/// HTTP front end for a [`Dispatcher`].
pub struct HttpServer<S> {
    dispatcher: Arc<Dispatcher<S>>,
    state: S,
    config: HydrateConfig,
}

impl<S: Clone + Send + Sync + 'static> HttpServer<S> {
    pub fn new(config: HydrateConfig, dispatcher: Dispatcher<S>, state: S) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            state,
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(&self, local_addr: SocketAddr) -> Router {
        let server_state = ServerState {
            dispatcher: Arc::clone(&self.dispatcher),
            state: self.state.clone(),
            local_addr,
        };
        let limit = InFlightLimit::new(self.config.listener.max_in_flight);

        Router::new()
            .fallback(dispatch_handler::<S>)
            .with_state(server_state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.timeouts.request_secs,
            )))
            .layer(middleware::from_fn_with_state(limit, limit_middleware))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server until Ctrl+C or a shutdown broadcast.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .build_router(addr)
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &HydrateConfig {
        &self.config
    }
}

/// Feeds every request through the dispatcher.
async fn dispatch_handler<S: Clone + Send + Sync + 'static>(
    State(server): State<ServerState<S>>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();

    tracing::debug!(
        request_id = %request.request_id(),
        method = %method,
        path = %request.uri().path(),
        remote = %remote_addr,
        "Dispatching request"
    );

    let ctx = HandlerContext::new(server.local_addr, remote_addr, server.state.clone());
    let response = server.dispatcher.handle(request, ctx).await;

    metrics::record_request(&method, response.status().as_u16(), start_time);
    response
}
