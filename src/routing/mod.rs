//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     endpoints.rs standard set (+ debug set when debug mode is on)
//!     → router.rs (resolve against API prefix and backends)
//!     → matcher.rs (compile path patterns)
//!     → reject duplicates, freeze as immutable RouteTable
//!
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (segment match, extract path params)
//!     → Return: Matched route, MethodNotAllowed or NotFound
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment matching only)
//! - Deterministic: same input always matches same route
//! - Debug routes are a separate set merged at build time

pub mod endpoints;
pub mod matcher;
pub mod router;
pub mod template;

pub use endpoints::{LocalHandler, RouteDescriptor, RouteSet, Service, Visibility};
pub use matcher::PathPattern;
pub use router::{
    BackendTarget, BackendTargets, BackendUrlError, Resolution, Route, RouteTable, RouteTableError, Target,
};
pub use template::{make_url_to_endpoint, PathParams, TemplateError, UrlTemplate};
