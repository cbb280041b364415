//! Hydrate Router Library
//!
//! An HTTP route dispatcher with an on-demand client bundle cache: routes are
//! declared as `METHOD@/path` keys, and client routes compile hydration
//! bundles through esbuild the first time they are requested.

pub mod admin;
pub mod bundle;
pub mod config;
pub mod http;
pub mod hydrate;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use bundle::Bundle;
pub use config::schema::HydrateConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
pub use routing::{Dispatcher, RouteSet};
