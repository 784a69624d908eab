//! # In-memory Peering Service
//!
//! Peer registry over [`Storage`], plus the client side of the sync
//! protocol: probing peers and pulling peer lists and blocks from them.
//!
//! A failing peer never fails a round; it is logged and marked down.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use shared_types::digest::sha256_hex;
use shared_types::{Endpoint, MerkleSummary, Peer, PeerStatus, DOCUMENT_VERSION};
use tm_01_peer_sync::{LocalPeers, PeerSyncService, RemoteConnector, SyncError};
use tracing::{debug, info, warn};

use crate::adapters::ports::ChainPort;
use crate::container::NodeConfig;
use crate::keys::{self, SignatureProvider};
use crate::services::{BlockchainService, PeeringService, ServiceError, Storage};
use crate::LOG_PREFIX;

pub struct MemoryPeering {
    currency: String,
    endpoint: Endpoint,
    isolate: bool,
    ping_timeout: Duration,
    storage: Arc<dyn Storage>,
    blockchain: Arc<dyn BlockchainService>,
    signer: Arc<dyn SignatureProvider>,
    connector: Arc<dyn RemoteConnector>,
    sync: PeerSyncService,
}

impl MemoryPeering {
    pub fn new(
        config: &NodeConfig,
        storage: Arc<dyn Storage>,
        blockchain: Arc<dyn BlockchainService>,
        signer: Arc<dyn SignatureProvider>,
        connector: Arc<dyn RemoteConnector>,
    ) -> Self {
        Self {
            currency: config.currency.clone(),
            endpoint: config.self_endpoint(),
            isolate: config.isolate,
            ping_timeout: config.sync.client.request_timeout(),
            storage,
            blockchain,
            signer,
            connector,
            sync: PeerSyncService::new(config.sync.client.clone()),
        }
    }

    /// Peers other than this node, optionally only the reachable ones.
    async fn others(&self, reachable_only: bool) -> Result<Vec<Peer>, ServiceError> {
        let me = self.pubkey();
        Ok(self
            .storage
            .peers()
            .await?
            .into_iter()
            .filter(|p| p.pubkey != me && (!reachable_only || p.is_reachable()))
            .collect())
    }

    async fn ping(&self, peer: &Peer) -> PeerStatus {
        let Some(remote) = self.connector.connect(peer) else {
            return PeerStatus::Down;
        };
        match tokio::time::timeout(self.ping_timeout, remote.peering()).await {
            Ok(Ok(_)) => PeerStatus::Up,
            Ok(Err(SyncError::RateLimited { .. })) => PeerStatus::Up,
            Ok(Err(e)) => {
                debug!("{LOG_PREFIX} Peer {} did not answer: {e}", peer.pubkey);
                PeerStatus::Down
            }
            Err(_) => PeerStatus::Down,
        }
    }
}

/// Block number of a `number-hash` reference.
fn block_number(reference: &str) -> Option<u64> {
    reference.split('-').next().and_then(|n| n.parse().ok())
}

#[async_trait]
impl PeeringService for MemoryPeering {
    fn pubkey(&self) -> String {
        self.signer.public_key()
    }

    async fn submit(&self, mut peer: Peer) -> Result<Peer, ServiceError> {
        if !peer.currency.is_empty() && peer.currency != self.currency {
            return Err(ServiceError::Rejected(format!(
                "Wrong currency {}, expected {}",
                peer.currency, self.currency
            )));
        }
        if peer.pubkey.is_empty() {
            return Err(ServiceError::Rejected("Peer has no public key".into()));
        }
        if peer.endpoints.is_empty() {
            return Err(ServiceError::Rejected("Peer has no endpoint".into()));
        }
        keys::verify(&peer.pubkey, peer.raw().as_bytes(), &peer.signature)
            .map_err(|e| ServiceError::Rejected(format!("Peer signature: {e}")))?;

        let known = self.storage.peer(&peer.pubkey).await?;
        if let Some(known) = &known {
            if known.leaf_hash() == peer.leaf_hash() {
                return Ok(known.clone());
            }
            if block_number(&known.block) > block_number(&peer.block) {
                return Err(ServiceError::Rejected(format!(
                    "Peer document of {} is older than the recorded one",
                    peer.pubkey
                )));
            }
        }

        peer.status = if peer.pubkey == self.pubkey() {
            PeerStatus::Up
        } else {
            known.map(|k| k.status).unwrap_or_default()
        };
        self.storage.save_peer(peer.clone()).await?;
        self.storage.update_merkle_for_peers().await?;
        Ok(peer)
    }

    async fn regular_peer_signal(&self) -> Result<Peer, ServiceError> {
        let block = match self.blockchain.current().await? {
            Some(head) => head.reference(),
            None => format!("0-{}", sha256_hex(b"")),
        };
        let mut peer = Peer {
            version: DOCUMENT_VERSION,
            currency: self.currency.clone(),
            pubkey: self.pubkey(),
            block,
            endpoints: vec![self.endpoint.clone()],
            signature: String::new(),
            status: PeerStatus::Up,
        };
        peer.signature = self.signer.sign(peer.raw().as_bytes()).await?;
        Ok(peer)
    }

    async fn test_peers(&self) -> Result<(), ServiceError> {
        if self.isolate {
            debug!("{LOG_PREFIX} Isolated, not testing peers");
            return Ok(());
        }
        let peers = self.others(false).await?;
        let statuses = join_all(peers.iter().map(|peer| self.ping(peer))).await;

        for (peer, status) in peers.iter().zip(statuses) {
            if status != peer.status {
                info!("{LOG_PREFIX} Peer {} ({}) is {:?}", peer.pubkey, peer.address(), status);
            }
            self.storage.set_peer_status(&peer.pubkey, status).await?;
        }
        Ok(())
    }

    async fn regular_sync_block(&self) -> Result<u64, ServiceError> {
        if self.isolate {
            return Ok(0);
        }
        let chain = ChainPort::new(Arc::clone(&self.blockchain));
        let mut applied = 0;
        for peer in self.others(true).await? {
            let Some(remote) = self.connector.connect(&peer) else {
                continue;
            };
            if let Err(e) = self.sync.sync_peer_list(remote.as_ref(), self).await {
                warn!("{LOG_PREFIX} Peer list sync with {} failed: {e}", peer.pubkey);
            }
            match self.sync.sync_blocks(remote.as_ref(), &chain).await {
                Ok(n) => applied += n,
                Err(e) => warn!("{LOG_PREFIX} Block sync with {} failed: {e}", peer.pubkey),
            }
        }
        Ok(applied)
    }

    async fn known_peers(&self) -> Result<Vec<Peer>, ServiceError> {
        self.storage.peers().await
    }
}

#[async_trait]
impl LocalPeers for MemoryPeering {
    async fn self_peer(&self) -> Result<Peer, SyncError> {
        match self.storage.peer(&self.pubkey()).await? {
            Some(peer) => Ok(peer),
            None => Ok(self.regular_peer_signal().await?),
        }
    }

    async fn submit_peer(&self, peer: Peer) -> Result<Peer, SyncError> {
        Ok(self.submit(peer).await?)
    }

    async fn merkle(&self) -> Result<MerkleSummary, SyncError> {
        Ok(self.storage.peers_merkle().await?)
    }

    async fn peer_by_leaf(&self, leaf: &str) -> Result<Option<Peer>, SyncError> {
        Ok(self.storage.peer_by_leaf(leaf).await?)
    }

    async fn refresh_merkle(&self) -> Result<(), SyncError> {
        self.storage.update_merkle_for_peers().await?;
        Ok(())
    }
}
