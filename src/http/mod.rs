//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch)
//!     → request.rs (request ID)
//!     → [routing layer resolves the route]
//!     → handlers.rs / profiling.rs (served locally)
//!       or proxy.rs (forwarded to the aggregator or content service)
//!     → response.rs (diagnostic bodies, hop-by-hop stripping)
//!     → Send to client
//! ```

pub mod handlers;
pub mod profiling;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use proxy::{ProxyForwarder, ProxyHandler};
pub use request::{RequestIdLayer, X_REQUEST_ID};
pub use server::{HttpServer, ServerError};
