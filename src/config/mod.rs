//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → HydrateConfig (validated, immutable)
//!     → lifecycle::startup builds the bundle context and route table
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the route table is built from it once
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BundlerConfig, ClientRouteConfig, ComponentConfig, HydrateConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
