//! In-memory [`BlockchainService`].
//!
//! Consensus is deliberately small: a block is produced when the chain is
//! empty (root block) or when memberships or transactions are waiting, and
//! every produced block is signed by this node.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use shared_types::{Block, BlockType, Membership, MembershipType, DOCUMENT_VERSION};
use tokio::sync::Notify;
use tracing::debug;

use crate::keys::{self, SignatureProvider};
use crate::services::{BlockchainService, ChainStats, ServiceError, Storage};
use crate::LOG_PREFIX;

pub struct MemoryBlockchain {
    currency: String,
    storage: Arc<dyn Storage>,
    signer: Arc<dyn SignatureProvider>,
    stat_request: Notify,
}

impl MemoryBlockchain {
    pub fn new(
        currency: impl Into<String>,
        storage: Arc<dyn Storage>,
        signer: Arc<dyn SignatureProvider>,
    ) -> Self {
        Self {
            currency: currency.into(),
            storage,
            signer,
            stat_request: Notify::new(),
        }
    }

    fn check_currency(&self, currency: &str) -> Result<(), ServiceError> {
        if !currency.is_empty() && currency != self.currency {
            return Err(ServiceError::Rejected(format!(
                "Wrong currency {currency}, expected {}",
                self.currency
            )));
        }
        Ok(())
    }

    /// Check that `block` is a valid successor of the current head.
    async fn check_block(&self, block: &Block) -> Result<(), ServiceError> {
        if block.hash != block.compute_hash() {
            return Err(ServiceError::Rejected(format!(
                "Block #{} hash does not match its content",
                block.number
            )));
        }
        keys::verify(&block.issuer, block.hash.as_bytes(), &block.signature).map_err(|e| {
            ServiceError::Rejected(format!("Block #{} signature: {e}", block.number))
        })?;

        let head = self.storage.current_block().await?;
        match head {
            Some(head) if block.number <= head.number => {
                let known = self.storage.block(block.number).await?;
                if known.is_some_and(|known| known.hash == block.hash) {
                    Err(ServiceError::AlreadyKnown(format!("block #{}", block.number)))
                } else {
                    Err(ServiceError::Rejected(format!(
                        "Block #{} conflicts with the local chain",
                        block.number
                    )))
                }
            }
            Some(head) if block.number != head.number + 1 => Err(ServiceError::Rejected(format!(
                "Block #{} does not follow head #{}",
                block.number, head.number
            ))),
            Some(head) if block.previous_hash.as_deref() != Some(head.hash.as_str()) => {
                Err(ServiceError::Rejected(format!(
                    "Block #{} does not link to head #{}",
                    block.number, head.number
                )))
            }
            None if block.number != 0 || block.previous_hash.is_some() => Err(
                ServiceError::Rejected(format!("Block #{} on an empty chain", block.number)),
            ),
            _ => Ok(()),
        }
    }

    async fn members(&self) -> Result<BTreeSet<String>, ServiceError> {
        let mut members = BTreeSet::new();
        for block in self.storage.blocks(u64::MAX, 0).await? {
            for joiner in block.joiners {
                match joiner.membership {
                    MembershipType::In => members.insert(joiner.issuer),
                    MembershipType::Out => members.remove(&joiner.issuer),
                };
            }
        }
        Ok(members)
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[async_trait]
impl BlockchainService for MemoryBlockchain {
    async fn submit_membership(&self, membership: Membership) -> Result<Membership, ServiceError> {
        self.check_currency(&membership.currency)?;
        if membership.issuer.is_empty() {
            return Err(ServiceError::Rejected("Membership has no issuer".into()));
        }
        if !self.storage.save_membership(membership.clone()).await? {
            return Err(ServiceError::AlreadyKnown(format!(
                "membership of {}",
                membership.userid
            )));
        }
        debug!("{LOG_PREFIX} Membership {} {:?} pending", membership.userid, membership.membership);
        Ok(membership)
    }

    async fn submit_block(&self, block: Block, check: bool) -> Result<Block, ServiceError> {
        self.check_currency(&block.currency)?;
        if check {
            self.check_block(&block).await?;
        }
        self.storage.save_block(block.clone()).await?;
        self.storage.remove_memberships(&block.joiners).await?;
        self.storage.remove_transactions(&block.transactions).await?;
        debug!("{LOG_PREFIX} Block #{} stored", block.number);
        Ok(block)
    }

    async fn start_generation(&self) -> Result<Option<Block>, ServiceError> {
        let head = self.storage.current_block().await?;
        let joiners = self.storage.pending_memberships().await?;
        let transactions = self.storage.pending_transactions().await?;
        if head.is_some() && joiners.is_empty() && transactions.is_empty() {
            return Ok(None);
        }

        let mut block = Block {
            document_type: BlockType::Block,
            version: DOCUMENT_VERSION,
            number: head.as_ref().map_or(0, |h| h.number + 1),
            currency: self.currency.clone(),
            previous_hash: head.as_ref().map(|h| h.hash.clone()),
            issuer: self.signer.public_key(),
            time: now().max(head.as_ref().map_or(0, |h| h.time)),
            joiners,
            transactions,
            hash: String::new(),
            signature: String::new(),
        };
        block.hash = block.compute_hash();
        block.signature = self.signer.sign(block.hash.as_bytes()).await?;
        Ok(Some(block))
    }

    async fn current(&self) -> Result<Option<Block>, ServiceError> {
        self.storage.current_block().await
    }

    async fn blocks(&self, count: u64, from: u64) -> Result<Vec<Block>, ServiceError> {
        self.storage.blocks(count, from).await
    }

    async fn block(&self, number: u64) -> Result<Option<Block>, ServiceError> {
        self.storage.block(number).await
    }

    async fn is_member(&self, pubkey: &str) -> Result<bool, ServiceError> {
        Ok(self.members().await?.contains(pubkey))
    }

    fn add_stat_computing(&self) {
        self.stat_request.notify_one();
    }

    async fn stat_requested(&self) {
        self.stat_request.notified().await;
    }

    async fn compute_stats(&self) -> Result<ChainStats, ServiceError> {
        let head = self.storage.current_block().await?.map(|b| b.number);
        Ok(ChainStats {
            blocks: head.map_or(0, |n| n + 1),
            members: self.members().await?.len() as u64,
            pending_memberships: self.storage.pending_memberships().await?.len() as u64,
            head,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::tests::{chain_block, membership, test_signer, CURRENCY};
    use crate::adapters::memory::MemoryStorage;
    use std::time::Duration;

    fn blockchain() -> MemoryBlockchain {
        MemoryBlockchain::new(CURRENCY, Arc::new(MemoryStorage::new()), test_signer())
    }

    #[tokio::test]
    async fn test_root_block_then_idle() {
        let chain = blockchain();
        let root = chain.start_generation().await.unwrap().expect("root block");
        assert_eq!(root.number, 0);
        assert!(root.previous_hash.is_none());
        chain.submit_block(root, true).await.unwrap();

        assert!(chain.start_generation().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pending_membership_is_included_then_cleared() {
        let chain = blockchain();
        let root = chain.start_generation().await.unwrap().unwrap();
        chain.submit_block(root, true).await.unwrap();

        chain.submit_membership(membership("cat")).await.unwrap();
        let next = chain.start_generation().await.unwrap().unwrap();
        assert_eq!(next.number, 1);
        assert_eq!(next.joiners.len(), 1);
        chain.submit_block(next, true).await.unwrap();

        assert!(chain.is_member(&membership("cat").issuer).await.unwrap());
        assert!(chain.start_generation().await.unwrap().is_none());
        let stats = chain.compute_stats().await.unwrap();
        assert_eq!(stats.blocks, 2);
        assert_eq!(stats.members, 1);
        assert_eq!(stats.pending_memberships, 0);
    }

    #[tokio::test]
    async fn test_duplicate_membership_is_already_known() {
        let chain = blockchain();
        chain.submit_membership(membership("cat")).await.unwrap();
        assert!(matches!(
            chain.submit_membership(membership("cat")).await,
            Err(ServiceError::AlreadyKnown(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_currency_rejected() {
        let chain = blockchain();
        let mut ms = membership("cat");
        ms.currency = "other".into();
        assert!(matches!(
            chain.submit_membership(ms).await,
            Err(ServiceError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_checked_blocks_must_extend_head() {
        let chain = blockchain();
        let root = chain_block(0, None);
        chain.submit_block(root.clone(), true).await.unwrap();

        assert!(matches!(
            chain.submit_block(root.clone(), true).await,
            Err(ServiceError::AlreadyKnown(_))
        ));
        assert!(matches!(
            chain.submit_block(chain_block(2, Some(&root)), true).await,
            Err(ServiceError::Rejected(_))
        ));
        assert!(matches!(
            chain.submit_block(chain_block(1, None), true).await,
            Err(ServiceError::Rejected(_))
        ));
        chain
            .submit_block(chain_block(1, Some(&root)), true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_tampered_block_rejected() {
        let chain = blockchain();
        let mut root = chain_block(0, None);
        root.time += 1;
        assert!(matches!(
            chain.submit_block(root.clone(), true).await,
            Err(ServiceError::Rejected(_))
        ));

        root.hash = root.compute_hash();
        let err = chain.submit_block(root, true).await.unwrap_err();
        assert!(err.to_string().contains("signature"));
    }

    #[tokio::test]
    async fn test_stat_request_is_remembered() {
        let chain = blockchain();
        chain.add_stat_computing();
        tokio::time::timeout(Duration::from_secs(1), chain.stat_requested())
            .await
            .expect("request pending");
    }
}
