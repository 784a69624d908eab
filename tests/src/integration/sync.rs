//! # Synchronization Against Scripted Remotes
//!
//! A remote built from `SyncEndpoints` over a fixed chain and a single
//! self peer, registered on the in-process network next to a real node.
//!
//! ## Flows Tested:
//!
//! 1. **Catch-up**: an empty node pulls the whole remote chain
//! 2. **Idempotence**: repeated range reads and sync rounds change nothing
//! 3. **Back-off**: a limiter declining requests slows the client down
//!    without failing the round

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use node_runtime::{KeyPair, NodeRuntime};
    use shared_types::{Block, BlockType, Document, MerkleSummary, Peer, PeerStatus};
    use tm_01_peer_sync::{
        Backoff, LocalChain, LocalPeers, NoLimit, RemoteNode, RequestLimiter, SyncEndpoints,
        SyncError,
    };

    use crate::integration::{node_config, start_node, InMemoryNetwork, CURRENCY};

    const REMOTE_SEED: u8 = 9;
    const REMOTE: &str = "127.0.0.1:9009";

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Fixed chain and peer list of a remote that never changes.
    struct ScriptedRemote {
        blocks: Vec<Block>,
        peer: Peer,
    }

    impl ScriptedRemote {
        fn new(len: u64) -> Self {
            let pair = KeyPair::from_seed([REMOTE_SEED; 32]);
            let mut blocks: Vec<Block> = Vec::new();
            for number in 0..len {
                let mut block = Block {
                    document_type: BlockType::Block,
                    version: 1,
                    number,
                    currency: CURRENCY.into(),
                    previous_hash: blocks.last().map(|b| b.hash.clone()),
                    issuer: pair.public_key(),
                    time: 1_000 + number,
                    joiners: vec![],
                    transactions: vec![],
                    hash: String::new(),
                    signature: String::new(),
                };
                block.hash = block.compute_hash();
                block.signature = pair.sign(block.hash.as_bytes());
                blocks.push(block);
            }

            let mut peer = Peer {
                version: 1,
                currency: CURRENCY.into(),
                pubkey: pair.public_key(),
                block: blocks.last().map(Block::reference).unwrap_or_default(),
                endpoints: vec![format!("BASIC_MERKLED_API {}", REMOTE.replace(':', " "))
                    .parse()
                    .unwrap()],
                signature: String::new(),
                status: PeerStatus::Up,
            };
            peer.signature = pair.sign(peer.raw().as_bytes());
            Self { blocks, peer }
        }
    }

    #[async_trait]
    impl LocalChain for ScriptedRemote {
        async fn current_number(&self) -> Result<Option<u64>, SyncError> {
            Ok(self.blocks.last().map(|b| b.number))
        }

        async fn blocks(&self, count: u64, from: u64) -> Result<Vec<Block>, SyncError> {
            Ok(self
                .blocks
                .iter()
                .skip(from as usize)
                .take(count as usize)
                .cloned()
                .collect())
        }

        async fn block(&self, number: u64) -> Result<Option<Block>, SyncError> {
            Ok(self.blocks.get(number as usize).cloned())
        }

        async fn apply_block(&self, _block: Block) -> Result<(), SyncError> {
            Err(SyncError::Rejected("read-only remote".into()))
        }
    }

    #[async_trait]
    impl LocalPeers for ScriptedRemote {
        async fn self_peer(&self) -> Result<Peer, SyncError> {
            Ok(self.peer.clone())
        }

        async fn submit_peer(&self, peer: Peer) -> Result<Peer, SyncError> {
            Ok(peer)
        }

        async fn merkle(&self) -> Result<MerkleSummary, SyncError> {
            Ok(MerkleSummary::from_leaves([self.peer.leaf_hash()]))
        }

        async fn peer_by_leaf(&self, leaf: &str) -> Result<Option<Peer>, SyncError> {
            Ok((leaf == self.peer.leaf_hash()).then(|| self.peer.clone()))
        }

        async fn refresh_merkle(&self) -> Result<(), SyncError> {
            Ok(())
        }
    }

    /// Declines the first `n` requests, then answers everything.
    struct DeclineFirst {
        remaining: AtomicU32,
    }

    impl RequestLimiter for DeclineFirst {
        fn can_answer_now(&self) -> bool {
            self.remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_err()
        }

        fn process_request(&self) {}
    }

    fn endpoints(remote: Arc<ScriptedRemote>, limiter: Arc<dyn RequestLimiter>) -> SyncEndpoints {
        SyncEndpoints::new(remote.clone(), remote, limiter)
    }

    /// Node on `network` that knows the scripted remote.
    async fn node_knowing_remote(network: &InMemoryNetwork, remote: &ScriptedRemote) -> NodeRuntime {
        let mut config = node_config(1, 9001);
        config.sync.client.backoff = Backoff {
            attempts: 5,
            delay_ms: 5,
        };
        let node = start_node(network, config).await.unwrap();
        node.context()
            .unwrap()
            .inbox
            .submit(Document::Peer(remote.peer.clone()))
            .await
            .unwrap();
        node
    }

    // =============================================================================
    // INTEGRATION TESTS
    // =============================================================================

    #[tokio::test]
    async fn test_range_reads_are_idempotent_and_bounded() {
        let remote = endpoints(Arc::new(ScriptedRemote::new(3)), Arc::new(NoLimit));

        let first = remote.blocks(5, 0).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(remote.blocks(5, 0).await.unwrap(), first);
        assert!(remote.blocks(5, 10).await.unwrap().is_empty());
        assert_eq!(remote.block(10).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_node_catches_up_with_remote() {
        let network = InMemoryNetwork::new();
        let scripted = Arc::new(ScriptedRemote::new(3));
        network.register_remote(REMOTE, Arc::new(endpoints(scripted.clone(), Arc::new(NoLimit))));
        let node = node_knowing_remote(&network, &scripted).await;
        let services = node.context().unwrap().services;

        assert_eq!(services.peering.regular_sync_block().await.unwrap(), 3);
        let head = services.blockchain.current().await.unwrap().unwrap();
        assert_eq!(head, scripted.blocks[2]);

        // Nothing new on the remote: a second round is a no-op.
        assert_eq!(services.peering.regular_sync_block().await.unwrap(), 0);
        assert_eq!(services.blockchain.blocks(10, 0).await.unwrap().len(), 3);

        node.shutdown().await;
    }

    #[tokio::test]
    async fn test_rate_limited_remote_is_retried() {
        let network = InMemoryNetwork::new();
        let scripted = Arc::new(ScriptedRemote::new(2));
        let limiter = Arc::new(DeclineFirst {
            remaining: AtomicU32::new(2),
        });
        network.register_remote(REMOTE, Arc::new(endpoints(scripted.clone(), limiter)));
        let node = node_knowing_remote(&network, &scripted).await;
        let services = node.context().unwrap().services;

        assert_eq!(services.peering.regular_sync_block().await.unwrap(), 2);
        assert_eq!(
            services.blockchain.current().await.unwrap().map(|b| b.number),
            Some(1)
        );

        node.shutdown().await;
    }
}
