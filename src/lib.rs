//! FitSync core library.
//!
//! # Architecture Overview
//!
//! ```text
//!   app state (Value graph)                    backend call (async closure)
//!          │                                             │
//!          ▼                                             ▼
//!   ┌──────────────┐                            ┌─────────────────┐
//!   │   snapshot   │                            │   resilience    │
//!   │  serializer  │                            │ RetryExecutor   │
//!   │  + dates     │                            │ classify/retry  │
//!   └──────┬───────┘                            └───┬─────────┬───┘
//!          │                                        │         │
//!          ▼                                        ▼         ▼
//!   ┌──────────────┐   clear_local_cache    ┌───────────┐ ┌──────────────┐
//!   │   storage    │◀───────────────────────│ recovery  │ │observability │
//!   │ LocalCache   │                        │   hook    │ │ sink/metrics │
//!   │ StateFile    │                        └───────────┘ └──────────────┘
//!   │ blob stores  │
//!   └──────────────┘
//!
//!   config (TOML, hot reload) feeds every subsystem.
//! ```

pub mod config;
pub mod observability;
pub mod resilience;
pub mod snapshot;
pub mod storage;

pub use config::CoreConfig;
pub use resilience::{BackendError, ClassifiedError, ErrorKind, RetryExecutor};
pub use snapshot::{Snapshot, Value};
pub use storage::upload_blob;
