//! Outbound ports (SPI) for the propagation subsystem.

use async_trait::async_trait;
use shared_types::Peer;

use crate::domain::document::OutboundDocument;
use crate::error::PropagationError;

/// Source of the peers a document may be forwarded to.
#[async_trait]
pub trait PeerDirectory: Send + Sync {
    async fn known_peers(&self) -> Vec<Peer>;

    /// Public key of the local node, never a forwarding target.
    fn local_pubkey(&self) -> Option<String>;
}

/// Chooses which of the known peers receive a document.
pub trait FanoutPolicy: Send + Sync {
    fn select(
        &self,
        document: &OutboundDocument,
        candidates: Vec<Peer>,
        local_pubkey: Option<&str>,
    ) -> Vec<Peer>;
}

/// Delivers one document to one peer.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn deliver(&self, peer: &Peer, document: &OutboundDocument)
        -> Result<(), PropagationError>;

    /// Whether `peer` designates this very node. Local deliveries are still
    /// performed when the node is isolated from the network.
    fn is_local(&self, _peer: &Peer) -> bool {
        false
    }
}
