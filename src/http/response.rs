//! Response construction helpers.
//!
//! # Design Decisions
//! - Fallback responses carry no body and no content type
//! - Compiled bundles are served as `application/javascript; charset=UTF-8`

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;

/// Content type of compiled client bundles.
pub const JAVASCRIPT_CONTENT_TYPE: &str = "application/javascript; charset=UTF-8";

/// A response with the given status and an empty body.
pub fn empty(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

/// 200 with a compiled JavaScript module.
pub fn javascript(contents: Bytes) -> Response {
    let mut response = Response::new(Body::from(contents));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JAVASCRIPT_CONTENT_TYPE),
    );
    response
}

/// 200 with a plain-text body.
pub fn text(body: impl Into<String>) -> Response {
    let mut response = Response::new(Body::from(body.into()));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
