//! Smart proxy gateway library.
//!
//! A gateway in front of the aggregator and content services: it resolves
//! each request against an immutable route table and either serves it
//! locally or forwards it verbatim to the owning backend.

pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{make_url_to_endpoint, RouteTable};
