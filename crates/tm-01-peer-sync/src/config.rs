//! Synchronization tunables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry policy for rate-limited calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Backoff {
    /// Total attempts, the first one included. `1` disables retries.
    pub attempts: u32,
    /// Pause between attempts when the remote does not suggest one.
    pub delay_ms: u64,
}

impl Backoff {
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            attempts: 1,
            delay_ms: 0,
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 500,
        }
    }
}

/// Configuration of the synchronization client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Blocks requested per page during block history sync.
    pub page_size: u64,
    pub backoff: Backoff,
    /// Timeout of a single HTTP request to a remote node.
    pub request_timeout_ms: u64,
}

impl SyncConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            backoff: Backoff::default(),
            request_timeout_ms: 10_000,
        }
    }
}
