//! Backend error model.

use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resilience::classify::ErrorKind;
use crate::resilience::messages;

/// Machine-readable code attached to a backend failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ErrorCode {
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
    /// A code this crate has no variant for, kept verbatim.
    Other(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::Cancelled => "cancelled",
            ErrorCode::Unknown => "unknown",
            ErrorCode::InvalidArgument => "invalid-argument",
            ErrorCode::DeadlineExceeded => "deadline-exceeded",
            ErrorCode::NotFound => "not-found",
            ErrorCode::AlreadyExists => "already-exists",
            ErrorCode::PermissionDenied => "permission-denied",
            ErrorCode::ResourceExhausted => "resource-exhausted",
            ErrorCode::FailedPrecondition => "failed-precondition",
            ErrorCode::Aborted => "aborted",
            ErrorCode::OutOfRange => "out-of-range",
            ErrorCode::Unimplemented => "unimplemented",
            ErrorCode::Internal => "internal",
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::DataLoss => "data-loss",
            ErrorCode::Unauthenticated => "unauthenticated",
            ErrorCode::Other(code) => code,
        }
    }

    /// Parse a code, accepting `not-found`, `not_found` and `NOT_FOUND` alike.
    pub fn parse(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "cancelled" => ErrorCode::Cancelled,
            "unknown" => ErrorCode::Unknown,
            "invalid-argument" => ErrorCode::InvalidArgument,
            "deadline-exceeded" => ErrorCode::DeadlineExceeded,
            "not-found" => ErrorCode::NotFound,
            "already-exists" => ErrorCode::AlreadyExists,
            "permission-denied" => ErrorCode::PermissionDenied,
            "resource-exhausted" => ErrorCode::ResourceExhausted,
            "failed-precondition" => ErrorCode::FailedPrecondition,
            "aborted" => ErrorCode::Aborted,
            "out-of-range" => ErrorCode::OutOfRange,
            "unimplemented" => ErrorCode::Unimplemented,
            "internal" => ErrorCode::Internal,
            "unavailable" => ErrorCode::Unavailable,
            "data-loss" => ErrorCode::DataLoss,
            "unauthenticated" => ErrorCode::Unauthenticated,
            _ => ErrorCode::Other(code.to_string()),
        }
    }

    /// Code for an HTTP status returned by a storage endpoint.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 => ErrorCode::InvalidArgument,
            401 | 403 => ErrorCode::PermissionDenied,
            404 => ErrorCode::NotFound,
            408 | 504 => ErrorCode::DeadlineExceeded,
            409 => ErrorCode::Aborted,
            412 => ErrorCode::FailedPrecondition,
            429 => ErrorCode::ResourceExhausted,
            500 => ErrorCode::Internal,
            501 => ErrorCode::Unimplemented,
            503 => ErrorCode::Unavailable,
            _ => ErrorCode::Unknown,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ErrorCode::parse(s))
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        ErrorCode::parse(&code)
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.as_str().to_string()
    }
}

/// A failure reported by a backend collaborator.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct BackendError {
    code: Option<ErrorCode>,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl BackendError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
            source: None,
        }
    }

    /// A failure that carries no machine-readable code.
    pub fn uncoded(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::from_http_status(status), message)
    }

    /// Attach the underlying cause.
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> Option<&ErrorCode> {
        self.code.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Rendered chain of underlying causes, one per line. `None` when the
    /// error has no source.
    pub fn source_chain(&self) -> Option<String> {
        let mut current = self.source.as_deref().map(|e| e as &(dyn StdError + 'static));
        let mut lines = Vec::new();
        while let Some(err) = current {
            lines.push(format!("caused by: {}", err));
            current = err.source();
        }
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

impl From<String> for BackendError {
    fn from(message: String) -> Self {
        BackendError::uncoded(message)
    }
}

impl From<&str> for BackendError {
    fn from(message: &str) -> Self {
        BackendError::uncoded(message)
    }
}

/// The error surfaced once every attempt of an operation failed.
#[derive(Debug, Error)]
#[error("{kind} failure after {attempts} attempt(s): {cause}")]
pub struct ClassifiedError {
    kind: ErrorKind,
    attempts: u32,
    #[source]
    cause: BackendError,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, cause: BackendError, attempts: u32) -> Self {
        Self {
            kind,
            attempts,
            cause,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn cause(&self) -> &BackendError {
        &self.cause
    }

    pub fn into_cause(self) -> BackendError {
        self.cause
    }

    /// Sentence suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        messages::describe(Some(&self.cause))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("socket closed")]
    struct SocketClosed;

    #[derive(Debug, Error)]
    #[error("connect failed")]
    struct ConnectFailed(#[source] SocketClosed);

    #[test]
    fn test_code_parsing() {
        assert_eq!(ErrorCode::parse("permission-denied"), ErrorCode::PermissionDenied);
        assert_eq!(ErrorCode::parse("PERMISSION_DENIED"), ErrorCode::PermissionDenied);
        assert_eq!(ErrorCode::parse(" not_found "), ErrorCode::NotFound);
        assert_eq!(
            ErrorCode::parse("storage/quota"),
            ErrorCode::Other("storage/quota".to_string())
        );
        assert_eq!("aborted".parse::<ErrorCode>().unwrap(), ErrorCode::Aborted);
    }

    #[test]
    fn test_code_serde() {
        let json = serde_json::to_string(&ErrorCode::DeadlineExceeded).unwrap();
        assert_eq!(json, "\"deadline-exceeded\"");
        let code: ErrorCode = serde_json::from_str("\"unavailable\"").unwrap();
        assert_eq!(code, ErrorCode::Unavailable);
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(ErrorCode::from_http_status(403), ErrorCode::PermissionDenied);
        assert_eq!(ErrorCode::from_http_status(404), ErrorCode::NotFound);
        assert_eq!(ErrorCode::from_http_status(429), ErrorCode::ResourceExhausted);
        assert_eq!(ErrorCode::from_http_status(503), ErrorCode::Unavailable);
        assert_eq!(ErrorCode::from_http_status(504), ErrorCode::DeadlineExceeded);
        assert_eq!(ErrorCode::from_http_status(418), ErrorCode::Unknown);
    }

    #[test]
    fn test_non_error_causes_are_wrapped() {
        let err = BackendError::from("quota gone");
        assert!(err.code().is_none());
        assert_eq!(err.to_string(), "quota gone");
        assert!(err.source_chain().is_none());
    }

    #[test]
    fn test_source_chain() {
        let err = BackendError::new(ErrorCode::Unavailable, "upload failed")
            .with_source(ConnectFailed(SocketClosed));
        assert_eq!(
            err.source_chain().unwrap(),
            "caused by: connect failed\ncaused by: socket closed"
        );
    }

    #[test]
    fn test_classified_error_display() {
        let err = ClassifiedError::new(
            ErrorKind::NotFound,
            BackendError::new(ErrorCode::NotFound, "no such video"),
            3,
        );
        assert_eq!(err.to_string(), "not-found failure after 3 attempt(s): no such video");
        assert_eq!(err.attempts(), 3);
        assert!(!err.is_transient());
        assert!(StdError::source(&err).is_some());
    }
}
