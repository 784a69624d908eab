//! # Backing Services
//!
//! The services documents are submitted to. The runtime only ever sees them
//! as trait objects collected in a [`ServiceGateway`], built once by a
//! [`ServiceFactory`].
//!
//! ```text
//! IdentityService ──→ BlockchainService ──→ Storage
//! PeeringService  ──→ BlockchainService, Storage, SignatureProvider
//! TransactionsService ──→ Storage
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{Block, MerkleSummary, Membership, Peer, PeerStatus};
use thiserror::Error;
use tm_01_peer_sync::{LocalPeers, SyncError};

use crate::container::NodeConfig;
use crate::keys::{KeyError, SignatureProvider};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The document was refused by the service.
    #[error("{0}")]
    Rejected(String),

    #[error("Already known: {0}")]
    AlreadyKnown(String),

    #[error("Signing failed: {0}")]
    Signing(#[from] KeyError),

    #[error("Sync failed: {0}")]
    Sync(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<SyncError> for ServiceError {
    fn from(e: SyncError) -> Self {
        ServiceError::Sync(e.to_string())
    }
}

impl From<ServiceError> for SyncError {
    fn from(e: ServiceError) -> Self {
        SyncError::Rejected(e.to_string())
    }
}

/// Figures computed in the background after blocks are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStats {
    pub blocks: u64,
    pub members: u64,
    pub pending_memberships: u64,
    /// Head block number at computation time.
    pub head: Option<u64>,
}

// =============================================================================
// SERVICES
// =============================================================================

#[async_trait]
pub trait BlockchainService: Send + Sync {
    async fn submit_membership(&self, membership: Membership) -> Result<Membership, ServiceError>;

    /// Accept a block. With `check`, the block must extend the current head.
    async fn submit_block(&self, block: Block, check: bool) -> Result<Block, ServiceError>;

    /// Try to produce the next block. `None` when there is nothing to do.
    async fn start_generation(&self) -> Result<Option<Block>, ServiceError>;

    async fn current(&self) -> Result<Option<Block>, ServiceError>;

    async fn blocks(&self, count: u64, from: u64) -> Result<Vec<Block>, ServiceError>;

    async fn block(&self, number: u64) -> Result<Option<Block>, ServiceError>;

    async fn is_member(&self, pubkey: &str) -> Result<bool, ServiceError>;

    /// Ask for a statistics computation. Never blocks, never fails.
    fn add_stat_computing(&self);

    /// Resolves when a statistics computation has been asked for.
    async fn stat_requested(&self);

    async fn compute_stats(&self) -> Result<ChainStats, ServiceError>;
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn submit_identity(&self, identity: Value) -> Result<Value, ServiceError>;

    async fn is_member(&self, pubkey: &str) -> Result<bool, ServiceError>;
}

/// Peer registry. The sync client talks to it through [`LocalPeers`].
#[async_trait]
pub trait PeeringService: LocalPeers + Send + Sync {
    /// Base58 public key of this node.
    fn pubkey(&self) -> String;

    async fn submit(&self, peer: Peer) -> Result<Peer, ServiceError>;

    /// Build and sign this node's current peer document.
    async fn regular_peer_signal(&self) -> Result<Peer, ServiceError>;

    /// Ping every known peer and record whether it answered.
    async fn test_peers(&self) -> Result<(), ServiceError>;

    /// One sync round against reachable peers. Returns blocks applied.
    async fn regular_sync_block(&self) -> Result<u64, ServiceError>;

    async fn known_peers(&self) -> Result<Vec<Peer>, ServiceError>;
}

#[async_trait]
pub trait TransactionsService: Send + Sync {
    async fn process_tx(&self, transaction: Value) -> Result<Value, ServiceError>;
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn save_peer(&self, peer: Peer) -> Result<(), ServiceError>;
    async fn peers(&self) -> Result<Vec<Peer>, ServiceError>;
    async fn peer(&self, pubkey: &str) -> Result<Option<Peer>, ServiceError>;
    async fn set_peer_status(&self, pubkey: &str, status: PeerStatus) -> Result<(), ServiceError>;

    /// Recompute the peer-list merkle index.
    async fn update_merkle_for_peers(&self) -> Result<MerkleSummary, ServiceError>;
    /// Last computed peer-list merkle index, leaves included.
    async fn peers_merkle(&self) -> Result<MerkleSummary, ServiceError>;
    async fn peer_by_leaf(&self, leaf: &str) -> Result<Option<Peer>, ServiceError>;

    async fn save_block(&self, block: Block) -> Result<(), ServiceError>;
    async fn current_block(&self) -> Result<Option<Block>, ServiceError>;
    async fn blocks(&self, count: u64, from: u64) -> Result<Vec<Block>, ServiceError>;
    async fn block(&self, number: u64) -> Result<Option<Block>, ServiceError>;

    async fn save_membership(&self, membership: Membership) -> Result<bool, ServiceError>;
    async fn pending_memberships(&self) -> Result<Vec<Membership>, ServiceError>;
    async fn remove_memberships(&self, accepted: &[Membership]) -> Result<(), ServiceError>;

    async fn save_identity(&self, identity: Value) -> Result<bool, ServiceError>;
    async fn save_transaction(&self, transaction: Value) -> Result<bool, ServiceError>;
    async fn pending_transactions(&self) -> Result<Vec<Value>, ServiceError>;
    async fn remove_transactions(&self, accepted: &[Value]) -> Result<(), ServiceError>;
}

/// Every service of a node, as shared trait objects.
#[derive(Clone)]
pub struct ServiceGateway {
    pub identity: Arc<dyn IdentityService>,
    pub peering: Arc<dyn PeeringService>,
    pub blockchain: Arc<dyn BlockchainService>,
    pub transactions: Arc<dyn TransactionsService>,
    pub storage: Arc<dyn Storage>,
}

/// Builds the services of a node once its signing capability exists.
pub trait ServiceFactory: Send + Sync {
    fn wire(
        &self,
        config: &NodeConfig,
        signer: Arc<dyn SignatureProvider>,
    ) -> Result<ServiceGateway, ServiceError>;
}
