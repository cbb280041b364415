//! Handler types and the default fallback handlers.
//!
//! Every handler is an `Arc`'d async closure so the compiled route table can
//! be shared across connections without cloning the closures themselves.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode, Uri, Version};
use axum::response::Response;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use thiserror::Error;

use crate::http::response::empty;
use crate::routing::matcher::Params;
use crate::routing::method::RouteMethod;

/// Connection context handed to every handler.
#[derive(Debug, Clone)]
pub struct HandlerContext<S> {
    /// The local address of the connection.
    pub local_addr: SocketAddr,
    /// The remote address of the connection.
    pub remote_addr: SocketAddr,
    /// Application state shared by all requests.
    pub state: S,
}

impl<S> HandlerContext<S> {
    pub fn new(local_addr: SocketAddr, remote_addr: SocketAddr, state: S) -> Self {
        Self {
            local_addr,
            remote_addr,
            state,
        }
    }
}

/// The parts of a request that survive after the body was handed to a handler.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
}

impl RequestHead {
    pub fn of(req: &Request<Body>) -> Self {
        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
            version: req.version(),
            headers: req.headers().clone(),
        }
    }
}

/// A fault raised by a matched handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        HandlerError::Failed(err.into())
    }

    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        HandlerError::Panicked(message)
    }
}

impl From<crate::bundle::BundleError> for HandlerError {
    fn from(err: crate::bundle::BundleError) -> Self {
        HandlerError::new(err)
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        HandlerError::new(err)
    }
}

pub type HandlerResult = Result<Response, HandlerError>;

type MatchFn<S> =
    dyn Fn(Request<Body>, HandlerContext<S>, Params) -> BoxFuture<'static, HandlerResult> + Send + Sync;
type OtherFn<S> = dyn Fn(Request<Body>, HandlerContext<S>) -> BoxFuture<'static, Response> + Send + Sync;
type ErrorFn<S> =
    dyn Fn(RequestHead, HandlerContext<S>, HandlerError) -> BoxFuture<'static, Response> + Send + Sync;
type UnknownMethodFn<S> = dyn Fn(Request<Body>, HandlerContext<S>, Vec<RouteMethod>) -> BoxFuture<'static, Response>
    + Send
    + Sync;

/// Handler for a matched route; receives the extracted path parameters.
pub struct Handler<S>(Arc<MatchFn<S>>);

impl<S> Clone for Handler<S> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<S: Send + 'static> Handler<S> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Request<Body>, HandlerContext<S>, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self(Arc::new(move |req, ctx, params| f(req, ctx, params).boxed()))
    }

    pub fn call(
        &self,
        req: Request<Body>,
        ctx: HandlerContext<S>,
        params: Params,
    ) -> BoxFuture<'static, HandlerResult> {
        (self.0)(req, ctx, params)
    }
}

/// Handler for requests that match no path template.
pub struct OtherHandler<S>(Arc<OtherFn<S>>);

impl<S: Send + 'static> OtherHandler<S> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Request<Body>, HandlerContext<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self(Arc::new(move |req, ctx| f(req, ctx).boxed()))
    }

    pub fn call(&self, req: Request<Body>, ctx: HandlerContext<S>) -> BoxFuture<'static, Response> {
        (self.0)(req, ctx)
    }
}

impl<S: Send + 'static> Default for OtherHandler<S> {
    fn default() -> Self {
        Self::new(|_req, _ctx| async { default_other() })
    }
}

/// Handler invoked with the fault raised by a matched handler.
pub struct ErrorHandler<S>(Arc<ErrorFn<S>>);

impl<S: Send + 'static> ErrorHandler<S> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(RequestHead, HandlerContext<S>, HandlerError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self(Arc::new(move |head, ctx, err| f(head, ctx, err).boxed()))
    }

    pub fn call(
        &self,
        head: RequestHead,
        ctx: HandlerContext<S>,
        err: HandlerError,
    ) -> BoxFuture<'static, Response> {
        (self.0)(head, ctx, err)
    }
}

impl<S: Send + 'static> Default for ErrorHandler<S> {
    fn default() -> Self {
        Self::new(|head, _ctx, err| async move { default_error(&head, &err) })
    }
}

/// Handler for a matched path whose method has no registration.
pub struct UnknownMethodHandler<S>(Arc<UnknownMethodFn<S>>);

impl<S: Send + 'static> UnknownMethodHandler<S> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Request<Body>, HandlerContext<S>, Vec<RouteMethod>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self(Arc::new(move |req, ctx, known| f(req, ctx, known).boxed()))
    }

    pub fn call(
        &self,
        req: Request<Body>,
        ctx: HandlerContext<S>,
        known: Vec<RouteMethod>,
    ) -> BoxFuture<'static, Response> {
        (self.0)(req, ctx, known)
    }
}

impl<S: Send + 'static> Default for UnknownMethodHandler<S> {
    fn default() -> Self {
        Self::new(|_req, _ctx, known| async move { default_unknown_method(&known) })
    }
}

/// 404 with an empty body.
pub fn default_other() -> Response {
    empty(StatusCode::NOT_FOUND)
}

/// Logs the fault and answers 500 with an empty body.
pub fn default_error(head: &RequestHead, err: &HandlerError) -> Response {
    tracing::error!(
        method = %head.method,
        uri = %head.uri,
        error = %err,
        "Route handler failed"
    );
    empty(StatusCode::INTERNAL_SERVER_ERROR)
}

/// 405 with an `Accept` header listing the registered methods.
pub fn default_unknown_method(known: &[RouteMethod]) -> Response {
    let accept = known
        .iter()
        .map(RouteMethod::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let mut response = empty(StatusCode::METHOD_NOT_ALLOWED);
    // Method names are plain ASCII tokens, so this conversion cannot fail.
    if let Ok(value) = HeaderValue::from_str(&accept) {
        response.headers_mut().insert(header::ACCEPT, value);
    }
    response
}
