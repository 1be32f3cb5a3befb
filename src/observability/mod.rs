//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID is generated per dispatch and carried on the span
//! - Metric updates are fire-and-forget; no recorder installed means
//!   they are no-ops
//! - Labels stay low-cardinality (route name, not raw URI)

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
