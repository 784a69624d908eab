//! # In-memory Services
//!
//! Process-local implementations of every backing service, wired together
//! by [`MemoryServiceFactory`].

pub mod blockchain;
pub mod identity;
pub mod peering;
pub mod storage;

use std::sync::Arc;

use tm_01_peer_sync::RemoteConnector;

pub use blockchain::MemoryBlockchain;
pub use identity::{MemoryIdentity, MemoryTransactions};
pub use peering::MemoryPeering;
pub use storage::MemoryStorage;

use crate::container::NodeConfig;
use crate::keys::SignatureProvider;
use crate::services::{BlockchainService, ServiceError, ServiceFactory, ServiceGateway, Storage};

pub struct MemoryServiceFactory {
    storage: Arc<dyn Storage>,
    connector: Arc<dyn RemoteConnector>,
}

impl MemoryServiceFactory {
    /// Factory over fresh in-memory storage. `connector` opens the remote
    /// nodes the peering service syncs with.
    pub fn new(connector: Arc<dyn RemoteConnector>) -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new()), connector)
    }

    pub fn with_storage(storage: Arc<dyn Storage>, connector: Arc<dyn RemoteConnector>) -> Self {
        Self { storage, connector }
    }
}

impl ServiceFactory for MemoryServiceFactory {
    fn wire(
        &self,
        config: &NodeConfig,
        signer: Arc<dyn SignatureProvider>,
    ) -> Result<ServiceGateway, ServiceError> {
        let storage = Arc::clone(&self.storage);
        let blockchain: Arc<dyn BlockchainService> = Arc::new(MemoryBlockchain::new(
            config.currency.clone(),
            Arc::clone(&storage),
            Arc::clone(&signer),
        ));
        let identity = Arc::new(MemoryIdentity::new(
            Arc::clone(&blockchain),
            Arc::clone(&storage),
        ));
        let peering = Arc::new(MemoryPeering::new(
            config,
            Arc::clone(&storage),
            Arc::clone(&blockchain),
            signer,
            Arc::clone(&self.connector),
        ));
        let transactions = Arc::new(MemoryTransactions::new(Arc::clone(&storage)));

        Ok(ServiceGateway {
            identity,
            peering,
            blockchain,
            transactions,
            storage,
        })
    }
}
