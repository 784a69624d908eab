//! # Peer Sync Service
//!
//! Client side of the synchronization protocol. The service holds no state
//! of its own: every call names the remote node and the local collaborator
//! it works against.

use std::future::Future;

use shared_types::Peer;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::ports::{LocalChain, LocalPeers, MerkleQuery, RemoteNode};
use crate::LOG_PREFIX;

/// Outcome of one peer-list synchronization round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerListSync {
    /// Root announced by the remote.
    pub remote_root: String,
    /// Peers fetched from the remote and accepted locally.
    pub imported: usize,
    /// Peers fetched but refused locally.
    pub refused: usize,
}

/// Synchronization client.
#[derive(Debug, Clone, Default)]
pub struct PeerSyncService {
    config: SyncConfig,
}

impl PeerSyncService {
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run `call`, retrying while the remote asks to back off.
    async fn with_backoff<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let attempts = self.config.backoff.attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Err(SyncError::RateLimited { retry_after }) if attempt < attempts => {
                    let pause = retry_after.unwrap_or_else(|| self.config.backoff.delay());
                    debug!(
                        "{LOG_PREFIX} {what} rate limited, retrying in {:?} ({attempt}/{attempts})",
                        pause
                    );
                    tokio::time::sleep(pause).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Fetch the remote's own peer document and add it to the local peers.
    pub async fn bootstrap_peer(
        &self,
        remote: &dyn RemoteNode,
        local: &dyn LocalPeers,
    ) -> Result<Peer, SyncError> {
        let peer = self.with_backoff("peering", || remote.peering()).await?;
        debug!("{LOG_PREFIX} Bootstrapping peer {}", peer.pubkey);
        local.submit_peer(peer).await
    }

    /// Exchange peer documents with `remote` in both directions.
    pub async fn share_peering_with(
        &self,
        remote: &dyn RemoteNode,
        local: &dyn LocalPeers,
    ) -> Result<Peer, SyncError> {
        let theirs = self.bootstrap_peer(remote, local).await?;
        let mine = local.self_peer().await?;
        self.with_backoff("add peer", || remote.add_peer(mine.clone()))
            .await?;
        info!(
            "{LOG_PREFIX} Shared peering with {} ({})",
            theirs.pubkey,
            theirs.address()
        );
        Ok(theirs)
    }

    /// Align the local peer list with the remote one.
    ///
    /// Peers behind remote leaves missing locally are fetched one by one and
    /// submitted through the local peering service. A refused peer does not
    /// abort the round. The local merkle index is refreshed at the end.
    pub async fn sync_peer_list(
        &self,
        remote: &dyn RemoteNode,
        local: &dyn LocalPeers,
    ) -> Result<PeerListSync, SyncError> {
        let remote_summary = self
            .with_backoff("peers merkle", || remote.peers_merkle(MerkleQuery::Summary))
            .await?
            .summary;
        let local_summary = local.merkle().await?;

        let mut outcome = PeerListSync {
            remote_root: remote_summary.root.clone(),
            ..PeerListSync::default()
        };

        if remote_summary.root != local_summary.root {
            let remote_leaves = self
                .with_backoff("peers leaves", || remote.peers_merkle(MerkleQuery::Leaves))
                .await?
                .summary
                .leaves;

            for leaf in remote_leaves.iter().filter(|l| !local_summary.contains(l)) {
                let answer = self
                    .with_backoff("peer leaf", || {
                        remote.peers_merkle(MerkleQuery::Leaf(leaf.clone()))
                    })
                    .await?;
                let Some(entry) = answer.leaf else {
                    debug!("{LOG_PREFIX} Leaf {leaf} vanished on remote");
                    continue;
                };
                match local.submit_peer(entry.value).await {
                    Ok(_) => outcome.imported += 1,
                    Err(e) => {
                        warn!("{LOG_PREFIX} Peer from leaf {leaf} refused: {e}");
                        outcome.refused += 1;
                    }
                }
            }
        }

        local.refresh_merkle().await?;
        Ok(outcome)
    }

    /// Pull blocks above the local head from `remote` until it has no more.
    ///
    /// Returns the number of blocks applied.
    pub async fn sync_blocks(
        &self,
        remote: &dyn RemoteNode,
        chain: &dyn LocalChain,
    ) -> Result<u64, SyncError> {
        let page_size = self.config.page_size.max(1);
        let mut next = match chain.current_number().await? {
            Some(head) => head.checked_add(1),
            None => Some(0),
        };
        let mut head = None;
        let mut applied = 0u64;

        // `None` once the highest possible block number has been applied.
        while let Some(from) = next {
            let page = self
                .with_backoff("blocks", || remote.blocks(page_size, from))
                .await?;
            let Some(last) = page.last().map(|b| b.number) else {
                break;
            };
            for block in page {
                chain.apply_block(block).await?;
                applied += 1;
            }
            head = Some(last);
            next = last.checked_add(1);
        }

        if let Some(head) = head {
            info!("{LOG_PREFIX} Applied {applied} block(s), local head now #{head}");
        }
        Ok(applied)
    }
}
