//! Outbound ports (SPI) for block generation.

use async_trait::async_trait;
use shared_types::{Block, Peer};

use crate::error::GenerationError;

/// Consensus side: attempts to produce the next block.
#[async_trait]
pub trait BlockForge: Send + Sync {
    /// `Ok(None)` when there is nothing to produce right now.
    async fn start_generation(&self) -> Result<Option<Block>, GenerationError>;
}

/// Transport side: hands a produced block to a target peer.
#[async_trait]
pub trait BlockBroadcaster: Send + Sync {
    async fn send_block(&self, target: &Peer, block: &Block) -> Result<(), GenerationError>;
}
