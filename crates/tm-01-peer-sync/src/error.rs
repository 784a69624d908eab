//! Error types for peer synchronization.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while talking to a remote node or applying what it sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The remote declined to answer now. Retry later.
    #[error("Remote node is rate limiting requests")]
    RateLimited {
        /// Delay suggested by the remote, if any.
        retry_after: Option<Duration>,
    },

    /// The remote answered with an error status.
    #[error("Remote node answered {status}: {message}")]
    Remote { status: u16, message: String },

    /// The remote could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote answer could not be decoded.
    #[error("Cannot decode remote answer: {0}")]
    Decode(String),

    /// A document fetched from the remote was refused locally.
    #[error("Document rejected: {0}")]
    Rejected(String),

    /// The peer announces no endpoint this node can contact.
    #[error("Peer {0} has no reachable endpoint")]
    Unreachable(String),
}

impl SyncError {
    /// Whether this error only asks the caller to slow down.
    #[must_use]
    pub fn is_backoff(&self) -> bool {
        matches!(self, SyncError::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rate_limit_is_backoff() {
        assert!(SyncError::RateLimited { retry_after: None }.is_backoff());
        assert!(!SyncError::Transport("refused".into()).is_backoff());
        assert!(!SyncError::Remote {
            status: 500,
            message: "boom".into()
        }
        .is_backoff());
    }
}
