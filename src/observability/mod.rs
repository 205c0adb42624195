//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stderr (human-readable or JSON lines)
//!     → GET {api_prefix}metrics (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID (x-request-id) is attached to every proxied request
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
