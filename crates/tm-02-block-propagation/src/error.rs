//! Error types for document propagation.

use std::time::Duration;

use thiserror::Error;

/// Failure to hand a document to one peer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PropagationError {
    #[error("Peer {peer} did not answer within {after:?}")]
    Timeout { peer: String, after: Duration },

    #[error("Cannot reach peer {peer}: {reason}")]
    Transport { peer: String, reason: String },

    #[error("Peer {peer} refused the document ({status}): {message}")]
    Rejected {
        peer: String,
        status: u16,
        message: String,
    },

    #[error("Peer {0} announces no usable endpoint")]
    NoEndpoint(String),

    #[error("Cannot encode document: {0}")]
    Encode(String),

    #[error("Local node refused the document: {0}")]
    Local(String),
}
