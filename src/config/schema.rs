//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the core.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    /// State serializer settings.
    pub serializer: SerializerConfig,

    /// Retry executor settings.
    pub retry: RetryConfig,

    /// Logging and failure reporting.
    pub observability: ObservabilityConfig,

    /// Blob store and local state file.
    pub storage: StorageConfig,
}

/// Serializer configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SerializerConfig {
    /// Maximum nesting depth that is descended into.
    pub depth_limit: usize,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self { depth_limit: 10 }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Delay after a transient failure, in milliseconds.
    pub recovery_delay_ms: u64,
}

impl RetryConfig {
    pub fn recovery_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            recovery_delay_ms: 1000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON lines instead of human readable output.
    pub json_logs: bool,

    /// Platform tag for failure records. Defaults to the host OS.
    pub platform: Option<String>,
}

impl ObservabilityConfig {
    pub fn platform_tag(&self) -> String {
        self.platform
            .clone()
            .unwrap_or_else(|| std::env::consts::OS.to_string())
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            platform: None,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Base URL of the blob endpoint; object keys are joined onto it.
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Path of the persisted state snapshot.
    pub state_path: String,

    /// Offline cache dropped by the recovery hook. Must not be `state_path`.
    pub cache_path: String,
}

impl StorageConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000/blobs/".to_string(),
            request_timeout_secs: 30,
            state_path: "state.json".to_string(),
            cache_path: ".fitsync-cache".to_string(),
        }
    }
}
