//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! switch, engine, capabilities produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → optional Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level
//! - Metrics are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
