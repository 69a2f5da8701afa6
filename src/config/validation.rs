//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (depth limit, retry count, delay)
//! - Check the blob endpoint URL is usable as a join base
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CoreConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::path::Path;

use thiserror::Error;
use url::Url;

use crate::config::schema::CoreConfig;

pub const MAX_DEPTH_LIMIT: usize = 64;
pub const MAX_RETRIES: u32 = 10;
pub const MAX_RECOVERY_DELAY_MS: u64 = 60_000;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("serializer.depth_limit must be between 1 and {max}, got {actual}")]
    DepthLimit { actual: usize, max: usize },

    #[error("retry.max_retries must be at most {max}, got {actual}")]
    MaxRetries { actual: u32, max: u32 },

    #[error("retry.recovery_delay_ms must be at most {max}, got {actual}")]
    RecoveryDelay { actual: u64, max: u64 },

    #[error("observability.log_level '{0}' is not one of trace, debug, info, warn, error")]
    LogLevel(String),

    #[error("storage.base_url '{url}' is invalid: {reason}")]
    BaseUrl { url: String, reason: String },

    #[error("storage.request_timeout_secs must be greater than zero")]
    RequestTimeout,

    #[error("storage.cache_path '{path}' is invalid: {reason}")]
    CachePath { path: String, reason: String },
}

/// Check `config`, collecting every violation.
pub fn validate_config(config: &CoreConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let depth = config.serializer.depth_limit;
    if depth == 0 || depth > MAX_DEPTH_LIMIT {
        errors.push(ValidationError::DepthLimit {
            actual: depth,
            max: MAX_DEPTH_LIMIT,
        });
    }

    if config.retry.max_retries > MAX_RETRIES {
        errors.push(ValidationError::MaxRetries {
            actual: config.retry.max_retries,
            max: MAX_RETRIES,
        });
    }

    if config.retry.recovery_delay_ms > MAX_RECOVERY_DELAY_MS {
        errors.push(ValidationError::RecoveryDelay {
            actual: config.retry.recovery_delay_ms,
            max: MAX_RECOVERY_DELAY_MS,
        });
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if let Err(reason) = check_base_url(&config.storage.base_url) {
        errors.push(ValidationError::BaseUrl {
            url: config.storage.base_url.clone(),
            reason,
        });
    }

    if config.storage.request_timeout_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }

    if let Err(reason) = check_cache_path(&config.storage.cache_path, &config.storage.state_path) {
        errors.push(ValidationError::CachePath {
            path: config.storage.cache_path.clone(),
            reason,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_base_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    // Url::join replaces the last segment unless the base ends with '/'
    if !url.path().ends_with('/') {
        return Err("must end with '/'".to_string());
    }
    Ok(())
}

fn check_cache_path(cache: &str, state: &str) -> Result<(), String> {
    let cache = Path::new(cache.trim());
    if cache.as_os_str().is_empty() {
        return Err("must not be empty".to_string());
    }
    // clearing the cache deletes this path, and everything below it
    if Path::new(state.trim()).starts_with(cache) {
        return Err("must not contain storage.state_path".to_string());
    }
    Ok(())
}
