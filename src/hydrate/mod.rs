//! Client-side hydration.
//!
//! # Data Flow
//! ```text
//! HydrateComponent[] + import header
//!     → codegen.rs (one JSX document, generated at startup)
//!     → route.rs (GET route; cache lookup, build on miss)
//! ```

pub mod codegen;
pub mod route;

pub use codegen::{
    extract_component_name, generate, CodegenError, HydrateComponent, DEFAULT_IMPORT,
};
pub use route::{client_route, source_file_name};
