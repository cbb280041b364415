//! Read-only status endpoint for operators and `hydrate-cli`.

pub mod handlers;

use axum::extract::FromRef;

use crate::bundle::Bundle;
use crate::routing::RouteSet;

pub use handlers::{CacheSummary, GateSummary, SystemStatus};

pub const STATUS_PATH: &str = "/_hydrate/status";

/// `GET /_hydrate/status` reporting gate state and cache contents as JSON.
pub fn status_route<S>() -> RouteSet<S>
where
    S: Clone + Send + Sync + 'static,
    Bundle: FromRef<S>,
{
    RouteSet::new().route(format!("GET@{STATUS_PATH}"), |_req, ctx, _params| {
        handlers::get_status(ctx.state)
    })
}
