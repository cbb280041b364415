//! Request dispatch.
//!
//! # Responsibilities
//! - Hold the compiled route table and the three fallback handlers
//! - Resolve a request to a handler, a method mismatch, or no match
//! - Run the matched handler and route its faults to the error handler
//!
//! # Design Decisions
//! - Immutable after construction (shared without locks)
//! - First matching template wins, in registration order
//! - Lookup outcome is an explicit enum; only handler faults take the error path
//! - Panics inside handlers are caught and treated as faults
//! - Every request yields exactly one response

use std::panic::AssertUnwindSafe;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use futures_util::FutureExt;

use crate::routing::handler::{
    ErrorHandler, Handler, HandlerContext, HandlerError, OtherHandler, RequestHead,
    UnknownMethodHandler,
};
use crate::routing::matcher::Params;
use crate::routing::method::RouteMethod;
use crate::routing::table::{RouteError, RouteSet, RouteTable};

/// Result of resolving a request against the route table.
pub enum Lookup<'a, S> {
    /// A template matched and a handler exists for the method.
    Matched {
        template: &'a str,
        handler: &'a Handler<S>,
        params: Params,
    },
    /// A template matched but neither the method nor "any" is registered.
    MethodNotAllowed {
        template: &'a str,
        known: Vec<RouteMethod>,
    },
    /// No template matched.
    NotFound,
}

/// Method-aware request dispatcher.
pub struct Dispatcher<S> {
    table: RouteTable<S>,
    other: OtherHandler<S>,
    error: ErrorHandler<S>,
    unknown_method: UnknownMethodHandler<S>,
}

impl<S: Clone + Send + Sync + 'static> Dispatcher<S> {
    /// Compile `routes` with the default fallback handlers.
    pub fn register(routes: RouteSet<S>) -> Result<Self, RouteError> {
        Self::builder(routes).build()
    }

    /// Start a builder to override the fallback handlers.
    pub fn builder(routes: RouteSet<S>) -> DispatcherBuilder<S> {
        DispatcherBuilder {
            routes,
            other: OtherHandler::default(),
            error: ErrorHandler::default(),
            unknown_method: UnknownMethodHandler::default(),
        }
    }

    pub fn table(&self) -> &RouteTable<S> {
        &self.table
    }

    /// Resolve a method and path without running anything.
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup<'_, S> {
        for entry in self.table.entries() {
            let Some(params) = entry.pattern().matches(path) else {
                continue;
            };

            return match entry.handler_for(method) {
                Some(handler) => Lookup::Matched {
                    template: entry.template(),
                    handler,
                    params,
                },
                None => Lookup::MethodNotAllowed {
                    template: entry.template(),
                    known: entry.known_methods(),
                },
            };
        }
        Lookup::NotFound
    }

    /// Dispatch a request and produce its response.
    pub async fn handle(&self, req: Request<Body>, ctx: HandlerContext<S>) -> Response {
        let path = req.uri().path().to_string();

        match self.lookup(req.method(), &path) {
            Lookup::Matched {
                template,
                handler,
                params,
            } => {
                tracing::trace!(template = %template, path = %path, "Route matched");
                let head = RequestHead::of(&req);
                match run_handler(handler, req, ctx.clone(), params).await {
                    Ok(response) => response,
                    Err(err) => self.error.call(head, ctx, err).await,
                }
            }
            Lookup::MethodNotAllowed { template, known } => {
                tracing::debug!(
                    template = %template,
                    method = %req.method(),
                    "Method not registered for route"
                );
                self.unknown_method.call(req, ctx, known).await
            }
            Lookup::NotFound => {
                tracing::debug!(path = %path, "No route matched");
                self.other.call(req, ctx).await
            }
        }
    }
}

async fn run_handler<S: Send + 'static>(
    handler: &Handler<S>,
    req: Request<Body>,
    ctx: HandlerContext<S>,
    params: Params,
) -> Result<Response, HandlerError> {
    // A handler may panic while building its future or while it runs.
    let future = std::panic::catch_unwind(AssertUnwindSafe(|| handler.call(req, ctx, params)))
        .map_err(HandlerError::from_panic)?;

    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(HandlerError::from_panic)?
}

/// Builder for a [`Dispatcher`] with custom fallback handlers.
pub struct DispatcherBuilder<S> {
    routes: RouteSet<S>,
    other: OtherHandler<S>,
    error: ErrorHandler<S>,
    unknown_method: UnknownMethodHandler<S>,
}

impl<S: Clone + Send + Sync + 'static> DispatcherBuilder<S> {
    /// Handler for requests matching no template (default: 404).
    pub fn other(mut self, handler: OtherHandler<S>) -> Self {
        self.other = handler;
        self
    }

    /// Handler for faults raised by matched handlers (default: log + 500).
    pub fn error(mut self, handler: ErrorHandler<S>) -> Self {
        self.error = handler;
        self
    }

    /// Handler for unregistered methods on a matched path (default: 405).
    pub fn unknown_method(mut self, handler: UnknownMethodHandler<S>) -> Self {
        self.unknown_method = handler;
        self
    }

    pub fn build(self) -> Result<Dispatcher<S>, RouteError> {
        let table = RouteTable::compile(self.routes)?;
        tracing::info!(templates = table.len(), "Route table compiled");
        Ok(Dispatcher {
            table,
            other: self.other,
            error: self.error,
            unknown_method: self.unknown_method,
        })
    }
}
