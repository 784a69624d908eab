//! # Propagation Port Adapters
//!
//! - [`DirectoryPort`]: forwarding targets come from the peering service.
//! - [`NodeTransport`]: documents addressed to this node go to its own
//!   inbox, everything else to the network transport.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::{Document, Endpoint, Peer};
use tm_02_block_propagation::{OutboundDocument, PeerDirectory, PeerTransport, PropagationError};
use tracing::warn;

use crate::handlers::DocumentInbox;
use crate::services::PeeringService;
use crate::LOG_PREFIX;

pub struct DirectoryPort {
    peering: Arc<dyn PeeringService>,
}

impl DirectoryPort {
    pub fn new(peering: Arc<dyn PeeringService>) -> Self {
        Self { peering }
    }
}

#[async_trait]
impl PeerDirectory for DirectoryPort {
    async fn known_peers(&self) -> Vec<Peer> {
        match self.peering.known_peers().await {
            Ok(peers) => peers,
            Err(e) => {
                warn!("{LOG_PREFIX} Cannot list peers: {e}");
                Vec::new()
            }
        }
    }

    fn local_pubkey(&self) -> Option<String> {
        Some(self.peering.pubkey())
    }
}

pub struct NodeTransport {
    pubkey: String,
    endpoint: Endpoint,
    inbox: DocumentInbox,
    remote: Arc<dyn PeerTransport>,
}

impl NodeTransport {
    pub fn new(
        pubkey: impl Into<String>,
        endpoint: Endpoint,
        inbox: DocumentInbox,
        remote: Arc<dyn PeerTransport>,
    ) -> Self {
        Self {
            pubkey: pubkey.into(),
            endpoint,
            inbox,
            remote,
        }
    }
}

#[async_trait]
impl PeerTransport for NodeTransport {
    async fn deliver(
        &self,
        peer: &Peer,
        document: &OutboundDocument,
    ) -> Result<(), PropagationError> {
        if !self.is_local(peer) {
            return self.remote.deliver(peer, document).await;
        }
        self.inbox
            .submit(Document::from(document.clone()))
            .await
            .map(|_| ())
            .map_err(|e| PropagationError::Local(e.to_string()))
    }

    fn is_local(&self, peer: &Peer) -> bool {
        (!peer.pubkey.is_empty() && peer.pubkey == self.pubkey)
            || peer.endpoints.contains(&self.endpoint)
    }
}
