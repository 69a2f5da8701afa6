//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call into a backend collaborator:
//!     → retries.rs (run operation, sequential attempts)
//!     → On failure: classify.rs (transient infrastructure or not?)
//!         transient → recovery.rs (clear local cache) → fixed delay → retry
//!         other     → retry immediately
//!     → Every failure: observability::sink (FailureRecord)
//!     → Exhausted: errors.rs (ClassifiedError) → messages.rs (user text)
//! ```
//!
//! # Design Decisions
//! - Classification is a pure function of the error's code and message
//! - Only transient failures pay for recovery and the delay
//! - No jitter, no circuit breaker; the executor stays a bounded loop

pub mod classify;
pub mod errors;
pub mod messages;
pub mod recovery;
pub mod retries;

pub use classify::{classify, is_transient, ErrorKind};
pub use errors::{BackendError, ClassifiedError, ErrorCode};
pub use messages::describe;
pub use recovery::{CacheInvalidator, NoopInvalidator};
pub use retries::{RetryExecutor, DEFAULT_MAX_RETRIES, DEFAULT_RECOVERY_DELAY};
