//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gatekeeper and sessions produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Every session logs inside its own span carrying the connection id
//! - Metrics are cheap (atomic increments) and optional

pub mod logging;
pub mod metrics;
