//! Error classification.
//!
//! An error is transient infrastructure when its code is in a fixed set, or
//! when its message mentions one of a fixed set of markers. The marker list is
//! a heuristic taken from the backend's observed error text; keep it in sync
//! with that surface rather than widening it.

use std::fmt;

use serde::Serialize;

use crate::resilience::errors::{BackendError, ErrorCode};

/// Message fragments that only surface as free text, never as codes.
const TRANSIENT_MESSAGE_MARKERS: [&str; 6] = [
    "BloomFilterError",
    "IndexedDB",
    "persistence",
    "cache",
    "offline",
    "permissions",
];

/// Judgment over a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Likely fixed by clearing local cache state and retrying.
    TransientInfrastructure,
    Permission,
    NotFound,
    Unavailable,
    Deadline,
    ResourceExhausted,
    Unknown,
}

impl ErrorKind {
    pub fn is_transient(self) -> bool {
        self == ErrorKind::TransientInfrastructure
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::TransientInfrastructure => "transient-infrastructure",
            ErrorKind::Permission => "permission",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Deadline => "deadline",
            ErrorKind::ResourceExhausted => "resource-exhausted",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_transient_code(code: &ErrorCode) -> bool {
    matches!(
        code,
        ErrorCode::PermissionDenied
            | ErrorCode::FailedPrecondition
            | ErrorCode::Aborted
            | ErrorCode::Unavailable
            | ErrorCode::Internal
            | ErrorCode::Unknown
    )
}

fn has_transient_marker(message: &str) -> bool {
    TRANSIENT_MESSAGE_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// True when the error should trigger cache recovery before the next attempt.
pub fn is_transient(error: &BackendError) -> bool {
    error.code().is_some_and(is_transient_code) || has_transient_marker(error.message())
}

/// Classify a failed attempt.
///
/// Permission-denied and unavailable codes are part of the transient set, so
/// they classify as `TransientInfrastructure` before the per-code mapping is
/// consulted.
pub fn classify(error: &BackendError) -> ErrorKind {
    if is_transient(error) {
        return ErrorKind::TransientInfrastructure;
    }

    match error.code() {
        Some(ErrorCode::PermissionDenied) => ErrorKind::Permission,
        Some(ErrorCode::NotFound) => ErrorKind::NotFound,
        Some(ErrorCode::Unavailable) => ErrorKind::Unavailable,
        Some(ErrorCode::DeadlineExceeded) => ErrorKind::Deadline,
        Some(ErrorCode::ResourceExhausted) => ErrorKind::ResourceExhausted,
        _ => ErrorKind::Unknown,
    }
}
