//! In-memory [`Storage`].

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use shared_types::{Block, MerkleSummary, Membership, Peer, PeerStatus};

use crate::services::{ServiceError, Storage};

#[derive(Default)]
struct State {
    peers: HashMap<String, Peer>,
    merkle: MerkleSummary,
    leaves: HashMap<String, String>,
    blocks: Vec<Block>,
    memberships: Vec<Membership>,
    identities: Vec<Value>,
    transactions: Vec<Value>,
}

/// Process-local storage. Blocks are kept contiguous from number 0.
#[derive(Default)]
pub struct MemoryStorage {
    state: RwLock<State>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save_peer(&self, peer: Peer) -> Result<(), ServiceError> {
        self.state.write().peers.insert(peer.pubkey.clone(), peer);
        Ok(())
    }

    async fn peers(&self) -> Result<Vec<Peer>, ServiceError> {
        let mut peers: Vec<Peer> = self.state.read().peers.values().cloned().collect();
        peers.sort_by(|a, b| a.pubkey.cmp(&b.pubkey));
        Ok(peers)
    }

    async fn peer(&self, pubkey: &str) -> Result<Option<Peer>, ServiceError> {
        Ok(self.state.read().peers.get(pubkey).cloned())
    }

    async fn set_peer_status(&self, pubkey: &str, status: PeerStatus) -> Result<(), ServiceError> {
        match self.state.write().peers.get_mut(pubkey) {
            Some(peer) => {
                peer.status = status;
                Ok(())
            }
            None => Err(ServiceError::Storage(format!("unknown peer {pubkey}"))),
        }
    }

    async fn update_merkle_for_peers(&self) -> Result<MerkleSummary, ServiceError> {
        let mut state = self.state.write();
        let leaves: HashMap<String, String> = state
            .peers
            .values()
            .map(|peer| (peer.leaf_hash(), peer.pubkey.clone()))
            .collect();
        state.merkle = MerkleSummary::from_leaves(leaves.keys().cloned());
        state.leaves = leaves;
        Ok(state.merkle.clone())
    }

    async fn peers_merkle(&self) -> Result<MerkleSummary, ServiceError> {
        Ok(self.state.read().merkle.clone())
    }

    async fn peer_by_leaf(&self, leaf: &str) -> Result<Option<Peer>, ServiceError> {
        let state = self.state.read();
        Ok(state
            .leaves
            .get(leaf)
            .and_then(|pubkey| state.peers.get(pubkey))
            .filter(|peer| peer.leaf_hash() == leaf)
            .cloned())
    }

    async fn save_block(&self, block: Block) -> Result<(), ServiceError> {
        let mut state = self.state.write();
        let expected = state.blocks.len() as u64;
        if block.number != expected {
            return Err(ServiceError::Storage(format!(
                "block #{} would leave a gap, next is #{expected}",
                block.number
            )));
        }
        state.blocks.push(block);
        Ok(())
    }

    async fn current_block(&self) -> Result<Option<Block>, ServiceError> {
        Ok(self.state.read().blocks.last().cloned())
    }

    async fn blocks(&self, count: u64, from: u64) -> Result<Vec<Block>, ServiceError> {
        let state = self.state.read();
        let from = usize::try_from(from).unwrap_or(usize::MAX);
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        Ok(state.blocks.iter().skip(from).take(count).cloned().collect())
    }

    async fn block(&self, number: u64) -> Result<Option<Block>, ServiceError> {
        let state = self.state.read();
        Ok(usize::try_from(number)
            .ok()
            .and_then(|n| state.blocks.get(n))
            .cloned())
    }

    async fn save_membership(&self, membership: Membership) -> Result<bool, ServiceError> {
        let mut state = self.state.write();
        if state.memberships.contains(&membership) {
            return Ok(false);
        }
        state.memberships.push(membership);
        Ok(true)
    }

    async fn pending_memberships(&self) -> Result<Vec<Membership>, ServiceError> {
        Ok(self.state.read().memberships.clone())
    }

    async fn remove_memberships(&self, accepted: &[Membership]) -> Result<(), ServiceError> {
        self.state
            .write()
            .memberships
            .retain(|m| !accepted.contains(m));
        Ok(())
    }

    async fn save_identity(&self, identity: Value) -> Result<bool, ServiceError> {
        let mut state = self.state.write();
        if state.identities.contains(&identity) {
            return Ok(false);
        }
        state.identities.push(identity);
        Ok(true)
    }

    async fn save_transaction(&self, transaction: Value) -> Result<bool, ServiceError> {
        let mut state = self.state.write();
        if state.transactions.contains(&transaction) {
            return Ok(false);
        }
        state.transactions.push(transaction);
        Ok(true)
    }

    async fn pending_transactions(&self) -> Result<Vec<Value>, ServiceError> {
        Ok(self.state.read().transactions.clone())
    }

    async fn remove_transactions(&self, accepted: &[Value]) -> Result<(), ServiceError> {
        self.state
            .write()
            .transactions
            .retain(|t| !accepted.contains(t));
        Ok(())
    }
}
