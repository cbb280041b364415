//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteSet [(key, handler), ...]
//!     → method.rs (split `METHOD@/path` keys)
//!     → matcher.rs (compile path templates)
//!     → table.rs (group handlers per template, keep order)
//!     → Freeze as immutable Dispatcher
//!
//! Incoming Request (method, path)
//!     → router.rs (first matching template)
//!     → Matched / MethodNotAllowed / NotFound
//!     → handler, unknown-method handler, or other handler
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in the hot path (segment matching only)
//! - Deterministic: first registered template wins

pub mod handler;
pub mod matcher;
pub mod method;
pub mod router;
pub mod table;

pub use handler::{
    ErrorHandler, Handler, HandlerContext, HandlerError, HandlerResult, OtherHandler, RequestHead,
    UnknownMethodHandler,
};
pub use matcher::{Params, PathPattern, PatternError};
pub use method::{MethodSlot, RouteKey, RouteMethod};
pub use router::{Dispatcher, DispatcherBuilder, Lookup};
pub use table::{RouteError, RouteSet, RouteTable};
