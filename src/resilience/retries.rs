//! Retry logic.
//!
//! # Responsibilities
//! - Run a caller-supplied async operation, retrying up to `max_retries` times
//! - Classify each failure and run cache recovery + a fixed delay for transient ones
//! - Report every failed attempt and every recovery to the observability sink
//!
//! # Design Decisions
//! - Attempts are strictly sequential; the executor keeps no per-call state in `self`
//! - Non-transient failures are retried immediately, without recovery or delay
//! - The recovery result never changes control flow, it is only reported
//! - No cancellation; callers wrap the future in `tokio::time::timeout` if needed

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::config::RetryConfig;
use crate::observability::sink::{FailurePhase, FailureRecord, ObservabilitySink};
use crate::resilience::classify::{classify, ErrorKind};
use crate::resilience::errors::{BackendError, ClassifiedError};
use crate::resilience::recovery::CacheInvalidator;

/// Retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Pause after a transient failure, once recovery has run.
pub const DEFAULT_RECOVERY_DELAY: Duration = Duration::from_secs(1);

/// Executes backend operations with classification and cache recovery.
#[derive(Clone)]
pub struct RetryExecutor {
    invalidator: Arc<dyn CacheInvalidator>,
    sink: Arc<dyn ObservabilitySink>,
    max_retries: u32,
    recovery_delay: Duration,
    platform: String,
}

impl RetryExecutor {
    pub fn new(invalidator: Arc<dyn CacheInvalidator>, sink: Arc<dyn ObservabilitySink>) -> Self {
        Self {
            invalidator,
            sink,
            max_retries: DEFAULT_MAX_RETRIES,
            recovery_delay: DEFAULT_RECOVERY_DELAY,
            platform: std::env::consts::OS.to_string(),
        }
    }

    /// Build an executor with limits taken from configuration.
    pub fn from_config(
        config: &RetryConfig,
        invalidator: Arc<dyn CacheInvalidator>,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Self {
        Self::new(invalidator, sink)
            .with_max_retries(config.max_retries)
            .with_recovery_delay(config.recovery_delay())
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_recovery_delay(mut self, delay: Duration) -> Self {
        self.recovery_delay = delay;
        self
    }

    /// Platform tag written into failure records.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn recovery_delay(&self) -> Duration {
        self.recovery_delay
    }

    /// Run `operation` until it succeeds or `max_retries` retries are used up.
    ///
    /// `context` labels every record reported for this call. On exhaustion the
    /// last failure is returned, classified.
    pub async fn retry_with_recovery<T, E, F, Fut>(
        &self,
        context: &str,
        mut operation: F,
    ) -> Result<T, ClassifiedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BackendError>,
    {
        let mut attempt: u32 = 0;

        loop {
            let error: BackendError = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(context, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e.into(),
            };

            let kind = classify(&error);
            self.report(&error, kind, context, FailurePhase::Attempt { attempt });

            if attempt >= self.max_retries {
                tracing::error!(context, attempts = attempt + 1, kind = %kind, "Retries exhausted");
                return Err(ClassifiedError::new(kind, error, attempt + 1));
            }

            if kind.is_transient() {
                let cleared = self.invalidator.clear_local_cache().await;
                self.report(&error, kind, context, FailurePhase::Recovery { cleared });
                sleep(self.recovery_delay).await;
            }

            attempt += 1;
        }
    }

    fn report(&self, error: &BackendError, kind: ErrorKind, context: &str, phase: FailurePhase) {
        let record = FailureRecord::new(error, kind, &self.platform, context, phase);
        self.sink.report(&record);
    }
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("max_retries", &self.max_retries)
            .field("recovery_delay", &self.recovery_delay)
            .field("platform", &self.platform)
            .finish()
    }
}
