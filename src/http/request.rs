//! Request identification.
//!
//! # Responsibilities
//! - Assign a UUID v4 request ID to every incoming request
//! - Echo the ID back on the response
//! - Let handlers read the ID for log correlation
//!
//! # Design Decisions
//! - Request ID added as early as possible (outermost layer) so the trace
//!   span already carries it
//! - An ID supplied by the client is kept as-is

use axum::body::Body;
use axum::http::{HeaderName, Request};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Layer that assigns a request ID when the client did not send one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Layer that copies the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Read access to the request ID.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl RequestIdExt for Request<Body> {
    fn request_id(&self) -> &str {
        self.headers()
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}
