//! Failure reporting.
//!
//! # Responsibilities
//! - Define the record the executor reports for each failed attempt and recovery
//! - Provide the default sink (tracing + metrics) and an in-memory sink
//!
//! # Design Decisions
//! - Fire-and-forget: `report` returns nothing and must not block
//! - Records are plain data so any sink can forward them elsewhere

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::observability::metrics;
use crate::resilience::classify::ErrorKind;
use crate::resilience::errors::BackendError;

/// Where in the retry loop the record was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum FailurePhase {
    /// Attempt number `attempt` (0-based) failed.
    Attempt { attempt: u32 },
    /// The cache recovery hook ran.
    Recovery { cleared: bool },
}

/// Structured failure report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub error_code: Option<String>,
    pub message: String,
    pub stack_trace: Option<String>,
    pub is_transient: bool,
    pub platform: String,
    pub context: String,
    #[serde(flatten)]
    pub phase: FailurePhase,
}

impl FailureRecord {
    pub fn new(
        error: &BackendError,
        kind: ErrorKind,
        platform: &str,
        context: &str,
        phase: FailurePhase,
    ) -> Self {
        Self {
            error_code: error.code().map(ToString::to_string),
            message: error.message().to_string(),
            stack_trace: error.source_chain(),
            is_transient: kind.is_transient(),
            platform: platform.to_string(),
            context: context.to_string(),
            phase,
        }
    }
}

/// Receiver of failure records.
pub trait ObservabilitySink: Send + Sync {
    fn report(&self, record: &FailureRecord);
}

/// Logs records through `tracing` and counts them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ObservabilitySink for TracingSink {
    fn report(&self, record: &FailureRecord) {
        match record.phase {
            FailurePhase::Attempt { attempt } => {
                tracing::warn!(
                    context = %record.context,
                    attempt,
                    code = record.error_code.as_deref().unwrap_or("none"),
                    transient = record.is_transient,
                    platform = %record.platform,
                    stack = record.stack_trace.as_deref().unwrap_or(""),
                    "Operation attempt failed: {}",
                    record.message
                );
                metrics::record_attempt_failure(&record.context, record.is_transient);
            }
            FailurePhase::Recovery { cleared } => {
                if cleared {
                    tracing::info!(context = %record.context, "Local cache cleared, retrying");
                } else {
                    tracing::warn!(context = %record.context, "Local cache clear failed, retrying anyway");
                }
                metrics::record_recovery(&record.context, cleared);
            }
        }
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<FailureRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<FailureRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObservabilitySink for MemorySink {
    fn report(&self, record: &FailureRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}
