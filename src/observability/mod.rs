//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! resolution pipeline and HTTP host produce:
//!     → logging.rs (structured log events, request id on every event)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the `x-request-id` header into the RequestContext
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
