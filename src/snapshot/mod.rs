//! State snapshot subsystem.
//!
//! # Data Flow
//! ```text
//! app state (Value graph, possibly shared or cyclic)
//!     → serializer.rs (depth guard, cycle guard, date normalization)
//!     → Snapshot (JSON-safe)
//!     → storage::state_file (persist) or any serde serializer
//!
//! dates.rs is used by the serializer and directly by app code
//! for display (relative time) and round-tripping ISO text.
//! ```
//!
//! # Design Decisions
//! - Serialization is synchronous and allocates its visited set per call
//! - Failures degrade to "return the original value" instead of erroring

pub mod dates;
pub mod serializer;
pub mod value;

pub use dates::{format_relative, format_relative_now, from_text, to_text};
pub use serializer::{
    serialize, serialize_default, Snapshot, SnapshotSerializer, CYCLE_MARKER, DEFAULT_DEPTH_LIMIT,
};
pub use value::{DateError, RemoteTimestamp, ToDate, Value};
