//! In-memory identity and transaction services.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use shared_types::is_truthy;
use tracing::debug;

use crate::services::{BlockchainService, IdentityService, ServiceError, Storage, TransactionsService};
use crate::LOG_PREFIX;

pub struct MemoryIdentity {
    blockchain: Arc<dyn BlockchainService>,
    storage: Arc<dyn Storage>,
}

impl MemoryIdentity {
    pub fn new(blockchain: Arc<dyn BlockchainService>, storage: Arc<dyn Storage>) -> Self {
        Self {
            blockchain,
            storage,
        }
    }
}

#[async_trait]
impl IdentityService for MemoryIdentity {
    async fn submit_identity(&self, identity: Value) -> Result<Value, ServiceError> {
        if !is_truthy(identity.get("pubkey")) {
            return Err(ServiceError::Rejected("Identity has no public key".into()));
        }
        if !self.storage.save_identity(identity.clone()).await? {
            return Err(ServiceError::AlreadyKnown("identity".into()));
        }
        debug!("{LOG_PREFIX} Identity {} recorded", identity["uid"]);
        Ok(identity)
    }

    async fn is_member(&self, pubkey: &str) -> Result<bool, ServiceError> {
        self.blockchain.is_member(pubkey).await
    }
}

pub struct MemoryTransactions {
    storage: Arc<dyn Storage>,
}

impl MemoryTransactions {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl TransactionsService for MemoryTransactions {
    async fn process_tx(&self, transaction: Value) -> Result<Value, ServiceError> {
        let issuers = transaction
            .get("issuers")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        if issuers == 0 {
            return Err(ServiceError::Rejected("Transaction has no issuer".into()));
        }
        if !self.storage.save_transaction(transaction.clone()).await? {
            return Err(ServiceError::AlreadyKnown("transaction".into()));
        }
        Ok(transaction)
    }
}
