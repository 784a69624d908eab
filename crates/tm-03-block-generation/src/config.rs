//! Generation tunables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Pause after an attempt that produced nothing. `0` disables it.
    pub idle_pause_ms: u64,
    /// Pause after a failed attempt. `0` disables it.
    pub retry_pause_ms: u64,
}

impl GenerationConfig {
    #[must_use]
    pub fn idle_pause(&self) -> Duration {
        Duration::from_millis(self.idle_pause_ms)
    }

    #[must_use]
    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.retry_pause_ms)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            idle_pause_ms: 1_000,
            retry_pause_ms: 5_000,
        }
    }
}
