//! Error types for block generation.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Consensus failed while trying to produce a block.
    #[error("Block generation failed: {0}")]
    Forge(String),

    /// The produced block could not be handed to the transport.
    #[error("Block broadcast failed: {0}")]
    Broadcast(String),
}
