//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! resilience::retries (failed attempt / recovery)
//!     → sink.rs (FailureRecord → ObservabilitySink)
//!         → TracingSink: logging.rs subscriber + metrics.rs counters
//!
//! snapshot::serializer (cycle / truncation)
//!     → metrics.rs counters
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Context labels flow from the caller into every record
//! - Metrics are cheap (facade counters, no-op without a recorder)

pub mod logging;
pub mod metrics;
pub mod sink;

pub use sink::{FailurePhase, FailureRecord, MemorySink, ObservabilitySink, TracingSink};
