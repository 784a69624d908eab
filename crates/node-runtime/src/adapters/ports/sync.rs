//! # Sync Port Adapters
//!
//! Bind tm-01's `LocalChain` / `LocalPeers` ports to the node services.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::{Block, MerkleSummary, Peer};
use tm_01_peer_sync::{LocalChain, LocalPeers, SyncError};

use crate::services::{BlockchainService, PeeringService};

/// The local chain, through the blockchain service.
#[derive(Clone)]
pub struct ChainPort {
    blockchain: Arc<dyn BlockchainService>,
}

impl ChainPort {
    pub fn new(blockchain: Arc<dyn BlockchainService>) -> Self {
        Self { blockchain }
    }
}

#[async_trait]
impl LocalChain for ChainPort {
    async fn current_number(&self) -> Result<Option<u64>, SyncError> {
        Ok(self.blockchain.current().await?.map(|b| b.number))
    }

    async fn blocks(&self, count: u64, from: u64) -> Result<Vec<Block>, SyncError> {
        Ok(self.blockchain.blocks(count, from).await?)
    }

    async fn block(&self, number: u64) -> Result<Option<Block>, SyncError> {
        Ok(self.blockchain.block(number).await?)
    }

    async fn apply_block(&self, block: Block) -> Result<(), SyncError> {
        self.blockchain.submit_block(block, true).await?;
        Ok(())
    }
}

/// Owned view of a [`PeeringService`] as tm-01's peer registry.
#[derive(Clone)]
pub struct PeeringPort {
    peering: Arc<dyn PeeringService>,
}

impl PeeringPort {
    pub fn new(peering: Arc<dyn PeeringService>) -> Self {
        Self { peering }
    }
}

#[async_trait]
impl LocalPeers for PeeringPort {
    async fn self_peer(&self) -> Result<Peer, SyncError> {
        self.peering.self_peer().await
    }

    async fn submit_peer(&self, peer: Peer) -> Result<Peer, SyncError> {
        self.peering.submit_peer(peer).await
    }

    async fn merkle(&self) -> Result<MerkleSummary, SyncError> {
        self.peering.merkle().await
    }

    async fn peer_by_leaf(&self, leaf: &str) -> Result<Option<Peer>, SyncError> {
        self.peering.peer_by_leaf(leaf).await
    }

    async fn refresh_merkle(&self) -> Result<(), SyncError> {
        self.peering.refresh_merkle().await
    }
}
