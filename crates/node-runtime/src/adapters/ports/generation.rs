//! Generation port adapters: consensus through the blockchain service,
//! broadcast through the multicaster.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::{Block, Peer};
use tm_02_block_propagation::Multicaster;
use tm_03_block_generation::{BlockBroadcaster, BlockForge, GenerationError};

use crate::services::BlockchainService;

pub struct ForgePort {
    blockchain: Arc<dyn BlockchainService>,
}

impl ForgePort {
    pub fn new(blockchain: Arc<dyn BlockchainService>) -> Self {
        Self { blockchain }
    }
}

#[async_trait]
impl BlockForge for ForgePort {
    async fn start_generation(&self) -> Result<Option<Block>, GenerationError> {
        self.blockchain
            .start_generation()
            .await
            .map_err(|e| GenerationError::Forge(e.to_string()))
    }
}

pub struct BroadcastPort {
    multicaster: Arc<Multicaster>,
}

impl BroadcastPort {
    pub fn new(multicaster: Arc<Multicaster>) -> Self {
        Self { multicaster }
    }
}

#[async_trait]
impl BlockBroadcaster for BroadcastPort {
    async fn send_block(&self, target: &Peer, block: &Block) -> Result<(), GenerationError> {
        self.multicaster
            .send_block(target, block)
            .await
            .map_err(|e| GenerationError::Broadcast(e.to_string()))
    }
}
