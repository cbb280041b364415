//! In-flight request limit.
//!
//! Requests beyond `max_in_flight` are rejected with 503 instead of queueing,
//! so a burst of cold bundle builds cannot pile up behind the compiler.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tokio::sync::Semaphore;

use crate::http::response::empty;

#[derive(Debug, Clone)]
pub struct InFlightLimit {
    permits: Arc<Semaphore>,
}

impl InFlightLimit {
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight)),
        }
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

/// Middleware holding one permit for the lifetime of each request.
pub async fn limit_middleware(
    State(limit): State<InFlightLimit>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match Arc::clone(&limit.permits).try_acquire_owned() {
        Ok(_permit) => next.run(request).await,
        Err(_) => {
            tracing::warn!(path = %request.uri().path(), "In-flight request limit reached");
            empty(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
