//! # Node Context
//!
//! Everything the lifecycle wires at startup, assembled once and shared
//! read-only afterwards. Key material enters through the signer given to
//! the [`ServiceFactory`](crate::services::ServiceFactory); nothing in the
//! context is replaced after it is built.

pub mod config;

use std::sync::Arc;

use shared_bus::InMemoryEventBus;
use shared_types::Peer;
use tm_01_peer_sync::{RequestLimiter, SyncEndpoints};
use tm_02_block_propagation::Multicaster;

pub use config::{ConfigError, NodeConfig, PairConfig, SyncSettings, DEFAULT_PORT};

use crate::adapters::ports::{ChainPort, PeeringPort};
use crate::handlers::{DocumentDispatcher, DocumentInbox};
use crate::keys::SignatureProvider;
use crate::services::ServiceGateway;

#[derive(Clone)]
pub struct NodeContext {
    pub config: Arc<NodeConfig>,
    /// Base58 public key of this node.
    pub public_key: String,
    pub signer: Arc<dyn SignatureProvider>,
    pub services: ServiceGateway,
    pub bus: Arc<InMemoryEventBus>,
    pub dispatcher: Arc<DocumentDispatcher>,
    /// Entry point for documents received from transports.
    pub inbox: DocumentInbox,
    pub multicaster: Arc<Multicaster>,
}

impl NodeContext {
    /// Synthetic peer standing for this node's public endpoint. Freshly
    /// generated blocks are addressed to it.
    #[must_use]
    pub fn self_target(&self) -> Peer {
        Peer::from_endpoint(self.config.self_endpoint())
    }

    /// Read side other nodes synchronize against.
    pub fn sync_endpoints(&self, limiter: Arc<dyn RequestLimiter>) -> SyncEndpoints {
        SyncEndpoints::new(
            Arc::new(ChainPort::new(Arc::clone(&self.services.blockchain))),
            Arc::new(PeeringPort::new(Arc::clone(&self.services.peering))),
            limiter,
        )
    }
}
