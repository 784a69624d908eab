//! # Document Dispatcher
//!
//! Single entry point for every inbound document.
//!
//! ```text
//! Document ──classified──→ Membership → BlockchainService::submit_membership ──→ "membership"
//!                          Block      → BlockchainService::submit_block        ──→ "block"
//!                          Peer       → PeeringService::submit                 ──→ "peer"
//!          ──unclassified─→ interceptors, in registration order (no event)
//! ```
//!
//! The event is published only once the service accepted the document, and
//! it carries the entity the service returned. A refused document produces
//! no event and is not offered to any other handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use shared_bus::{EventPublisher, NodeEvent};
use shared_types::{is_truthy, Document, DocumentError, DocumentKind, DomainEntity};
use thiserror::Error;
use tracing::{debug, info};

use crate::services::{ServiceError, ServiceGateway};
use crate::LOG_PREFIX;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Document matches no known shape")]
    Unclassified,

    #[error("{kind} refused: {source}")]
    Service {
        kind: String,
        #[source]
        source: ServiceError,
    },

    #[error("Document inbox is closed")]
    InboxClosed,
}

impl DispatchError {
    fn service(kind: impl Into<String>) -> impl FnOnce(ServiceError) -> Self {
        let kind = kind.into();
        move |source| DispatchError::Service { kind, source }
    }

    /// The service error behind this failure, if any.
    #[must_use]
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            DispatchError::Service { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Handler for documents outside the built-in shapes.
#[async_trait]
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &str;

    fn matches(&self, document: &Value) -> bool;

    async fn treat(
        &self,
        services: &ServiceGateway,
        document: Value,
    ) -> Result<DomainEntity, DispatchError>;
}

/// Identity documents: `uid` and `buid` both present.
pub struct IdentityInterceptor;

#[async_trait]
impl Interceptor for IdentityInterceptor {
    fn name(&self) -> &str {
        "identity"
    }

    fn matches(&self, document: &Value) -> bool {
        is_truthy(document.get("uid")) && is_truthy(document.get("buid"))
    }

    async fn treat(
        &self,
        services: &ServiceGateway,
        document: Value,
    ) -> Result<DomainEntity, DispatchError> {
        let value = services
            .identity
            .submit_identity(document)
            .await
            .map_err(DispatchError::service(self.name()))?;
        Ok(DomainEntity::Extension {
            kind: self.name().to_string(),
            value,
        })
    }
}

/// Transactions: `issuers` and `outputs` both present.
pub struct TransactionInterceptor;

#[async_trait]
impl Interceptor for TransactionInterceptor {
    fn name(&self) -> &str {
        "transaction"
    }

    fn matches(&self, document: &Value) -> bool {
        is_truthy(document.get("issuers")) && is_truthy(document.get("outputs"))
    }

    async fn treat(
        &self,
        services: &ServiceGateway,
        document: Value,
    ) -> Result<DomainEntity, DispatchError> {
        let value = services
            .transactions
            .process_tx(document)
            .await
            .map_err(DispatchError::service(self.name()))?;
        Ok(DomainEntity::Extension {
            kind: self.name().to_string(),
            value,
        })
    }
}

pub struct DocumentDispatcher {
    services: ServiceGateway,
    bus: Arc<dyn EventPublisher>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl DocumentDispatcher {
    /// Dispatcher with the built-in handlers only.
    pub fn new(services: ServiceGateway, bus: Arc<dyn EventPublisher>) -> Self {
        Self {
            services,
            bus,
            interceptors: Vec::new(),
        }
    }

    /// Register the identity and transaction interceptors.
    #[must_use]
    pub fn with_default_interceptors(self) -> Self {
        self.with_interceptor(Arc::new(IdentityInterceptor))
            .with_interceptor(Arc::new(TransactionInterceptor))
    }

    /// Append an interceptor. It only ever sees documents none of the
    /// built-in handlers claimed.
    #[must_use]
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn interceptor_names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    pub async fn dispatch_raw(&self, raw: &str) -> Result<DomainEntity, DispatchError> {
        self.dispatch(Document::parse(raw)?).await
    }

    pub async fn dispatch_value(&self, value: Value) -> Result<DomainEntity, DispatchError> {
        self.dispatch(Document::from_value(value)?).await
    }

    pub async fn dispatch(&self, document: Document) -> Result<DomainEntity, DispatchError> {
        match document {
            Document::Membership(membership) => {
                let accepted = self
                    .services
                    .blockchain
                    .submit_membership(membership)
                    .await
                    .map_err(DispatchError::service(DocumentKind::Membership.event_name()))?;
                self.emit(NodeEvent::Membership(accepted.clone())).await;
                Ok(DomainEntity::Membership(accepted))
            }
            Document::Block(block) => {
                let accepted = self
                    .services
                    .blockchain
                    .submit_block(block, true)
                    .await
                    .map_err(DispatchError::service(DocumentKind::Block.event_name()))?;
                self.services.blockchain.add_stat_computing();
                self.emit(NodeEvent::Block(accepted.clone())).await;
                Ok(DomainEntity::Block(accepted))
            }
            Document::Peer(peer) => {
                info!("{LOG_PREFIX} ⬇ PEER {}", peer.pubkey);
                let accepted = self
                    .services
                    .peering
                    .submit(peer)
                    .await
                    .map_err(DispatchError::service(DocumentKind::Peer.event_name()))?;
                info!("{LOG_PREFIX} ✔ PEER {} {}", accepted.pubkey, accepted.address());
                self.emit(NodeEvent::Peer(accepted.clone())).await;
                Ok(DomainEntity::Peer(accepted))
            }
            Document::Unclassified(value) => {
                let Some(interceptor) = self.interceptors.iter().find(|i| i.matches(&value))
                else {
                    return Err(DispatchError::Unclassified);
                };
                debug!("{LOG_PREFIX} Document handled by {}", interceptor.name());
                interceptor.treat(&self.services, value).await
            }
        }
    }

    async fn emit(&self, event: NodeEvent) {
        let name = event.name();
        let receivers = self.bus.publish(event).await;
        debug!("{LOG_PREFIX} Emitted {name} to {receivers} subscriber(s)");
    }
}
