//! User-facing error messages.

use crate::resilience::classify::is_transient;
use crate::resilience::errors::{BackendError, ErrorCode};

pub const UNKNOWN_ERROR: &str = "An unknown error occurred. Please try again.";
pub const RECONNECTING: &str =
    "We hit a connection hiccup and are reconnecting automatically. Please wait a moment.";
pub const PERMISSION_DENIED: &str = "You don't have permission to perform this action.";
pub const NOT_FOUND: &str = "We couldn't find what you were looking for.";
pub const UNAVAILABLE: &str = "The service is temporarily unavailable. Please try again shortly.";
pub const DEADLINE_EXCEEDED: &str =
    "The request took too long. Check your connection and try again.";
pub const RESOURCE_EXHAUSTED: &str = "Too many requests right now. Please wait a moment and try again.";
pub const TRY_AGAIN: &str = "Something went wrong. Please try again.";

/// Sentence to show the user for `error`. Never empty.
pub fn describe(error: Option<&BackendError>) -> &'static str {
    let Some(error) = error else {
        return UNKNOWN_ERROR;
    };

    if is_transient(error) {
        return RECONNECTING;
    }

    match error.code() {
        Some(ErrorCode::PermissionDenied) => PERMISSION_DENIED,
        Some(ErrorCode::NotFound) => NOT_FOUND,
        Some(ErrorCode::Unavailable) => UNAVAILABLE,
        Some(ErrorCode::DeadlineExceeded) => DEADLINE_EXCEEDED,
        Some(ErrorCode::ResourceExhausted) => RESOURCE_EXHAUSTED,
        _ => TRY_AGAIN,
    }
}
