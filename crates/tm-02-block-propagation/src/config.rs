//! Propagation tunables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Upper bound on a single peer delivery.
    pub peer_timeout_ms: u64,
    /// Documents remembered by the router for duplicate suppression.
    pub seen_capacity: usize,
    /// Multicasts allowed to run at once; the pipeline stops reading the
    /// bus while all of them are busy.
    pub max_in_flight: usize,
}

impl PropagationConfig {
    #[must_use]
    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            peer_timeout_ms: 10_000,
            seen_capacity: 10_000,
            max_in_flight: 32,
        }
    }
}
