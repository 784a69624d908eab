//! # Sync Read Endpoints
//!
//! The synchronization surface a node exposes to others, independent of
//! the transport that carries it. An HTTP server maps its routes onto these
//! methods; in-process tests use it directly as a [`RemoteNode`].

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::{Block, Peer};
use tracing::debug;

use crate::error::SyncError;
use crate::ports::{
    LeafEntry, LocalChain, LocalPeers, MerkleQuery, MerkleResponse, RemoteNode, RequestLimiter,
};
use crate::LOG_PREFIX;

/// Rate-limited read endpoints over the local chain and peer list.
#[derive(Clone)]
pub struct SyncEndpoints {
    chain: Arc<dyn LocalChain>,
    peers: Arc<dyn LocalPeers>,
    limiter: Arc<dyn RequestLimiter>,
}

impl SyncEndpoints {
    pub fn new(
        chain: Arc<dyn LocalChain>,
        peers: Arc<dyn LocalPeers>,
        limiter: Arc<dyn RequestLimiter>,
    ) -> Self {
        Self {
            chain,
            peers,
            limiter,
        }
    }

    /// Admit one request or signal back-off.
    fn admit(&self, route: &str) -> Result<(), SyncError> {
        if !self.limiter.can_answer_now() {
            debug!("{LOG_PREFIX} Declining {route}: rate limited");
            return Err(SyncError::RateLimited {
                retry_after: self.limiter.retry_after(),
            });
        }
        self.limiter.process_request();
        Ok(())
    }
}

#[async_trait]
impl RemoteNode for SyncEndpoints {
    async fn peering(&self) -> Result<Peer, SyncError> {
        self.admit("peering")?;
        self.peers.self_peer().await
    }

    async fn peers_merkle(&self, query: MerkleQuery) -> Result<MerkleResponse, SyncError> {
        self.admit("peering/peers")?;
        let summary = self.peers.merkle().await?;
        Ok(match query {
            MerkleQuery::Summary => MerkleResponse {
                summary: summary.without_leaves(),
                leaf: None,
            },
            MerkleQuery::Leaves => MerkleResponse {
                summary,
                leaf: None,
            },
            MerkleQuery::Leaf(hash) => {
                let leaf = self
                    .peers
                    .peer_by_leaf(&hash)
                    .await?
                    .map(|value| LeafEntry { hash, value });
                MerkleResponse {
                    summary: summary.without_leaves(),
                    leaf,
                }
            }
        })
    }

    async fn blocks(&self, count: u64, from: u64) -> Result<Vec<Block>, SyncError> {
        self.admit("blockchain/blocks")?;
        if count == 0 {
            return Ok(Vec::new());
        }
        self.chain.blocks(count, from).await
    }

    async fn block(&self, number: u64) -> Result<Option<Block>, SyncError> {
        self.admit("blockchain/block")?;
        self.chain.block(number).await
    }

    async fn add_peer(&self, peer: Peer) -> Result<Peer, SyncError> {
        self.peers.submit_peer(peer).await
    }
}
