//! Outbound ports (SPI) for the sync subsystem.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shared_types::{Block, MerkleSummary, Peer};

use crate::error::SyncError;
use crate::ports::types::{MerkleQuery, MerkleResponse};

/// The read/write surface another node exposes for synchronization.
#[async_trait]
pub trait RemoteNode: Send + Sync {
    /// The remote node's own peer document.
    async fn peering(&self) -> Result<Peer, SyncError>;

    /// Merkle summary of the remote peer list.
    async fn peers_merkle(&self, query: MerkleQuery) -> Result<MerkleResponse, SyncError>;

    /// Up to `count` blocks starting at number `from`. Empty when out of range.
    async fn blocks(&self, count: u64, from: u64) -> Result<Vec<Block>, SyncError>;

    /// Block `number`, if the remote has it.
    async fn block(&self, number: u64) -> Result<Option<Block>, SyncError>;

    /// Submit a signed peer document to the remote.
    async fn add_peer(&self, peer: Peer) -> Result<Peer, SyncError>;
}

/// Opens a [`RemoteNode`] for a known peer.
pub trait RemoteConnector: Send + Sync {
    /// `None` when the peer has no endpoint this connector can use.
    fn connect(&self, peer: &Peer) -> Option<Arc<dyn RemoteNode>>;
}

/// Admission control consulted before answering a sync read.
pub trait RequestLimiter: Send + Sync {
    /// Whether a request may be answered right now.
    fn can_answer_now(&self) -> bool;

    /// Record that a request is being answered.
    fn process_request(&self);

    /// How long until the next request would be admitted.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Local chain as seen by the sync subsystem.
#[async_trait]
pub trait LocalChain: Send + Sync {
    /// Number of the current head block, `None` for an empty chain.
    async fn current_number(&self) -> Result<Option<u64>, SyncError>;

    /// Up to `count` local blocks starting at number `from`.
    async fn blocks(&self, count: u64, from: u64) -> Result<Vec<Block>, SyncError>;

    async fn block(&self, number: u64) -> Result<Option<Block>, SyncError>;

    /// Apply a block fetched from a remote node.
    async fn apply_block(&self, block: Block) -> Result<(), SyncError>;
}

/// Local peer registry as seen by the sync subsystem.
#[async_trait]
pub trait LocalPeers: Send + Sync {
    /// This node's own signed peer document.
    async fn self_peer(&self) -> Result<Peer, SyncError>;

    /// Add or update a peer through the peering service.
    async fn submit_peer(&self, peer: Peer) -> Result<Peer, SyncError>;

    /// Current merkle summary of the local peer list, leaves included.
    async fn merkle(&self) -> Result<MerkleSummary, SyncError>;

    async fn peer_by_leaf(&self, leaf: &str) -> Result<Option<Peer>, SyncError>;

    /// Recompute the peer-list merkle index.
    async fn refresh_merkle(&self) -> Result<(), SyncError>;
}
