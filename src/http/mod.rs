//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, connect info)
//!     → request.rs (request ID)
//!     → limit.rs (in-flight limit)
//!     → routing::Dispatcher (match, dispatch, fallbacks)
//!     → response.rs (empty / javascript / text bodies)
//!     → Send to client
//! ```

pub mod limit;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
