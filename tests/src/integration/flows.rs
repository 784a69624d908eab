//! # Integration Test Flows
//!
//! Nodes on an [`InMemoryNetwork`](super::InMemoryNetwork) running the full
//! stack: dispatcher → event bus → propagation pipeline → peer inboxes,
//! and the generation loop feeding the same path.
//!
//! ## Flows Tested:
//!
//! 1. **Peering**: two nodes exchange peer documents both ways
//! 2. **Propagation**: a membership accepted by one node reaches the other
//! 3. **Relay**: a relayed document is refused as known and not amplified
//! 4. **Generation**: produced blocks are stored locally and reach peers
//! 5. **Isolation**: an isolated node generates without touching the network

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::time::Duration;

    use futures::future::join;
    use node_runtime::{LifecycleState, NodeConfig, NodeRuntime};
    use shared_types::{Document, DocumentKind, Membership, MembershipType};
    use tokio::time::{sleep, timeout};

    use crate::integration::{node_config, start_node, InMemoryNetwork, CURRENCY};

    const A: &str = "127.0.0.1:9001";
    const B: &str = "127.0.0.1:9002";

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    async fn wait_until<F, Fut>(what: &str, mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        timeout(Duration::from_secs(3), async {
            while !check().await {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timeout waiting for {what}"));
    }

    fn membership(userid: &str) -> Membership {
        Membership {
            version: 1,
            currency: CURRENCY.into(),
            issuer: format!("issuer-of-{userid}"),
            block: String::new(),
            membership: MembershipType::In,
            userid: userid.into(),
            certts: String::new(),
            signature: "SIG".into(),
        }
    }

    /// Start two nodes and let `a` share peering with `b`.
    async fn peered(
        network: &InMemoryNetwork,
        a: NodeConfig,
        b: NodeConfig,
    ) -> (NodeRuntime, NodeRuntime) {
        let (a, b) = join(start_node(network, a), start_node(network, b)).await;
        let (a, b) = (a.unwrap(), b.unwrap());
        let remote_b = network.remote(B).expect("b registered");
        a.share_peering_with(remote_b.as_ref()).await.unwrap();
        (a, b)
    }

    async fn head(node: &NodeRuntime) -> Option<u64> {
        let context = node.context()?;
        context
            .services
            .blockchain
            .current()
            .await
            .ok()
            .flatten()
            .map(|b| b.number)
    }

    // =============================================================================
    // INTEGRATION TESTS: PEERING
    // =============================================================================

    #[tokio::test]
    async fn test_two_nodes_share_peering() {
        let network = InMemoryNetwork::new();
        let (a, b) = peered(&network, node_config(1, 9001), node_config(2, 9002)).await;

        for node in [&a, &b] {
            let peers = node
                .context()
                .unwrap()
                .services
                .peering
                .known_peers()
                .await
                .unwrap();
            let mut keys: Vec<_> = peers.into_iter().map(|p| p.pubkey).collect();
            keys.sort();
            let mut expected = vec![a.public_key().unwrap(), b.public_key().unwrap()];
            expected.sort();
            assert_eq!(keys, expected);
        }

        a.shutdown().await;
        b.shutdown().await;
    }

    // =============================================================================
    // INTEGRATION TESTS: PROPAGATION AND RELAY
    // =============================================================================

    #[tokio::test]
    async fn test_membership_reaches_peer_and_relay_stops() {
        let network = InMemoryNetwork::new();
        let (a, b) = peered(&network, node_config(1, 9001), node_config(2, 9002)).await;
        let b_storage = b.context().unwrap().services.storage;

        a.context()
            .unwrap()
            .inbox
            .submit(Document::Membership(membership("cat")))
            .await
            .unwrap();

        wait_until("membership at b", || {
            let storage = b_storage.clone();
            async move {
                storage
                    .pending_memberships()
                    .await
                    .unwrap()
                    .iter()
                    .any(|m| m.userid == "cat")
            }
        })
        .await;
        // B relays it back once; A refuses it as known and stops there.
        wait_until("relay back to a", || {
            let delivered = network.delivered(A, DocumentKind::Membership);
            async move { delivered == 1 }
        })
        .await;
        sleep(Duration::from_millis(200)).await;

        assert_eq!(network.delivered(B, DocumentKind::Membership), 1);
        assert_eq!(network.delivered(A, DocumentKind::Membership), 1);

        a.shutdown().await;
        b.shutdown().await;
    }

    // =============================================================================
    // INTEGRATION TESTS: GENERATION
    // =============================================================================

    #[tokio::test]
    async fn test_generated_blocks_reach_synced_peer() {
        let network = InMemoryNetwork::new();
        let mut producer = node_config(1, 9001);
        producer.participate = true;
        let (a, b) = peered(&network, producer, node_config(2, 9002)).await;
        assert_eq!(a.state(), LifecycleState::Running { generating: true });

        let producer = &a;
        wait_until("root block at a", || async move { head(producer).await.is_some() }).await;

        // B catches up on the root block, then follows new blocks by propagation.
        let applied = b
            .context()
            .unwrap()
            .services
            .peering
            .regular_sync_block()
            .await
            .unwrap();
        assert_eq!(applied, 1);
        assert_eq!(head(&b).await, Some(0));

        a.context()
            .unwrap()
            .inbox
            .submit(Document::Membership(membership("cat")))
            .await
            .unwrap();
        let follower = &b;
        wait_until("block #1 at b", || async move { head(follower).await >= Some(1) }).await;

        let block = b
            .context()
            .unwrap()
            .services
            .blockchain
            .block(1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(Some(block.issuer), a.public_key());
        assert_eq!(block.joiners[0].userid, "cat");
        assert!(a.generation_stats().unwrap().produced >= 2);

        a.shutdown().await;
        b.shutdown().await;
    }

    #[tokio::test]
    async fn test_isolated_node_generates_without_network() {
        let network = InMemoryNetwork::new();
        let mut config = node_config(3, 9003);
        config.participate = true;
        config.isolate = true;
        let node = start_node(&network, config).await.unwrap();

        let isolated = &node;
        wait_until("root block", || async move { head(isolated).await.is_some() }).await;
        assert!(network.deliveries().is_empty());

        node.shutdown().await;
        assert_eq!(node.state(), LifecycleState::Stopped);
    }
}
