//! # Router
//!
//! Turns one accepted document into zero or more forwarding instructions.

use std::sync::Arc;

use shared_types::{Peer, PeerStatus};
use tracing::debug;

use crate::domain::document::OutboundDocument;
use crate::domain::seen_cache::SeenCache;
use crate::ports::{FanoutPolicy, PeerDirectory};
use crate::LOG_PREFIX;

/// Send `document` to `peer`.
#[derive(Debug, Clone)]
pub struct ForwardInstruction {
    pub peer: Peer,
    pub document: Arc<OutboundDocument>,
}

/// Default fan-out: every peer not known to be down, except this node and,
/// for a peer document, the announced peer itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllUpPeersExceptOrigin;

impl FanoutPolicy for AllUpPeersExceptOrigin {
    fn select(
        &self,
        document: &OutboundDocument,
        candidates: Vec<Peer>,
        local_pubkey: Option<&str>,
    ) -> Vec<Peer> {
        let announced = document.announced_peer().map(|p| p.pubkey.as_str());
        candidates
            .into_iter()
            .filter(|p| matches!(p.status, PeerStatus::Up | PeerStatus::Unknown))
            .filter(|p| Some(p.pubkey.as_str()) != local_pubkey)
            .filter(|p| Some(p.pubkey.as_str()) != announced)
            .collect()
    }
}

pub struct Router {
    directory: Arc<dyn PeerDirectory>,
    policy: Arc<dyn FanoutPolicy>,
    seen: SeenCache,
}

impl Router {
    pub fn new(
        directory: Arc<dyn PeerDirectory>,
        policy: Arc<dyn FanoutPolicy>,
        seen_capacity: usize,
    ) -> Self {
        Self {
            directory,
            policy,
            seen: SeenCache::new(seen_capacity),
        }
    }

    /// Router with the [`AllUpPeersExceptOrigin`] policy.
    pub fn with_default_policy(directory: Arc<dyn PeerDirectory>, seen_capacity: usize) -> Self {
        Self::new(directory, Arc::new(AllUpPeersExceptOrigin), seen_capacity)
    }

    /// Instructions for `document`; empty if it was routed before.
    pub async fn route(&self, document: OutboundDocument) -> Vec<ForwardInstruction> {
        let digest = document.digest();
        if !self.seen.mark_seen(&digest) {
            debug!("{LOG_PREFIX} Already routed {} {digest}, dropping", document.kind());
            return Vec::new();
        }

        let candidates = self.directory.known_peers().await;
        let local = self.directory.local_pubkey();
        let targets = self
            .policy
            .select(&document, candidates, local.as_deref());

        debug!(
            "{LOG_PREFIX} Routing {} to {} peer(s)",
            document.kind(),
            targets.len()
        );

        let document = Arc::new(document);
        targets
            .into_iter()
            .map(|peer| ForwardInstruction {
                peer,
                document: Arc::clone(&document),
            })
            .collect()
    }

    #[must_use]
    pub fn seen(&self) -> &SeenCache {
        &self.seen
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::document::tests::{block, peer};
    use async_trait::async_trait;

    pub(crate) struct StaticDirectory {
        pub peers: Vec<Peer>,
        pub me: Option<String>,
    }

    #[async_trait]
    impl PeerDirectory for StaticDirectory {
        async fn known_peers(&self) -> Vec<Peer> {
            self.peers.clone()
        }

        fn local_pubkey(&self) -> Option<String> {
            self.me.clone()
        }
    }

    fn router(peers: Vec<Peer>) -> Router {
        Router::with_default_policy(
            Arc::new(StaticDirectory {
                peers,
                me: Some("me".into()),
            }),
            100,
        )
    }

    #[tokio::test]
    async fn test_routes_to_reachable_peers_only() {
        let router = router(vec![
            peer("alice", 1, PeerStatus::Up),
            peer("bob", 2, PeerStatus::Down),
            peer("carol", 3, PeerStatus::Unknown),
            peer("me", 4, PeerStatus::Up),
        ]);
        let targets: Vec<String> = router
            .route(block(1))
            .await
            .into_iter()
            .map(|i| i.peer.pubkey)
            .collect();
        assert_eq!(targets, vec!["alice", "carol"]);
    }

    #[tokio::test]
    async fn test_peer_document_skips_announced_peer() {
        let alice = peer("alice", 1, PeerStatus::Up);
        let router = router(vec![alice.clone(), peer("bob", 2, PeerStatus::Up)]);
        let targets = router.route(OutboundDocument::Peer(alice)).await;
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].peer.pubkey, "bob");
    }

    #[tokio::test]
    async fn test_second_route_of_same_document_is_empty() {
        let router = router(vec![peer("alice", 1, PeerStatus::Up)]);
        assert_eq!(router.route(block(7)).await.len(), 1);
        assert!(router.route(block(7)).await.is_empty());
        assert_eq!(router.route(block(8)).await.len(), 1);
        assert_eq!(router.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_no_peers_no_instructions() {
        let router = router(vec![]);
        assert!(router.route(block(1)).await.is_empty());
    }
}
