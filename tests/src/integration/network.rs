//! # In-process Network
//!
//! Nodes register under the address of their public endpoint. The network
//! then acts both as the sync connector (reads go to the node's
//! `SyncEndpoints`) and as the propagation transport (documents go to the
//! node's inbox), so the real subsystems talk without sockets.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use async_trait::async_trait;
use node_runtime::container::{PairConfig, SyncSettings};
use node_runtime::{KeyPair, LifecycleError, MemoryServiceFactory, NodeConfig, NodeRuntime};
use parking_lot::{Mutex, RwLock};
use shared_types::{Document, DocumentKind, Peer};
use tm_01_peer_sync::{NoLimit, RemoteConnector, RemoteNode};
use tm_02_block_propagation::{OutboundDocument, PeerTransport, PropagationError};
use tm_03_block_generation::GenerationConfig;

pub const CURRENCY: &str = "beta_brousouf";

/// Configuration of a node keyed by `seed`, listening and reachable on
/// `127.0.0.1:<port>`. Background sync is off so tests drive it.
pub fn node_config(seed: u8, port: u16) -> NodeConfig {
    let pair = KeyPair::from_seed([seed; 32]);
    NodeConfig {
        currency: CURRENCY.into(),
        pair: Some(PairConfig {
            public: pair.public_key(),
            sec: bs58::encode([seed; 32]).into_string(),
        }),
        ipv4: Some(Ipv4Addr::LOCALHOST),
        port,
        remoteipv4: Some(Ipv4Addr::LOCALHOST),
        remoteport: Some(port),
        generation: GenerationConfig {
            idle_pause_ms: 10,
            retry_pause_ms: 10,
        },
        sync: SyncSettings {
            interval_ms: 0,
            ..SyncSettings::default()
        },
        ..NodeConfig::default()
    }
}

/// Start a node on `network` and register it there.
pub async fn start_node(
    network: &InMemoryNetwork,
    config: NodeConfig,
) -> Result<NodeRuntime, LifecycleError> {
    let runtime = NodeRuntime::new(
        config,
        Arc::new(MemoryServiceFactory::new(Arc::new(network.clone()))),
        Arc::new(network.clone()),
    );
    runtime.start().await?;
    network.join(&runtime)?;
    Ok(runtime)
}

/// One document handed to one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub to: String,
    pub kind: DocumentKind,
}

struct Member {
    remote: Arc<dyn RemoteNode>,
    /// `None` for scripted remotes that accept documents silently.
    inbox: Option<node_runtime::DocumentInbox>,
}

#[derive(Clone, Default)]
pub struct InMemoryNetwork {
    members: Arc<RwLock<HashMap<String, Member>>>,
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl InMemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a started node under its public address.
    pub fn join(&self, runtime: &NodeRuntime) -> Result<(), LifecycleError> {
        let context = runtime.context().ok_or(LifecycleError::NotRunning)?;
        let member = Member {
            remote: Arc::new(context.sync_endpoints(Arc::new(NoLimit))),
            inbox: Some(context.inbox.clone()),
        };
        self.members
            .write()
            .insert(context.self_target().address(), member);
        Ok(())
    }

    /// Register a scripted remote at `address` (`host:port`).
    pub fn register_remote(&self, address: impl Into<String>, remote: Arc<dyn RemoteNode>) {
        self.members.write().insert(
            address.into(),
            Member {
                remote,
                inbox: None,
            },
        );
    }

    /// Read side of the node at `address`.
    pub fn remote(&self, address: &str) -> Option<Arc<dyn RemoteNode>> {
        self.members
            .read()
            .get(address)
            .map(|m| Arc::clone(&m.remote))
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }

    /// Deliveries of `kind` to `address`.
    pub fn delivered(&self, address: &str, kind: DocumentKind) -> usize {
        self.deliveries
            .lock()
            .iter()
            .filter(|d| d.to == address && d.kind == kind)
            .count()
    }
}

impl RemoteConnector for InMemoryNetwork {
    fn connect(&self, peer: &Peer) -> Option<Arc<dyn RemoteNode>> {
        self.remote(&peer.address())
    }
}

#[async_trait]
impl PeerTransport for InMemoryNetwork {
    async fn deliver(
        &self,
        peer: &Peer,
        document: &OutboundDocument,
    ) -> Result<(), PropagationError> {
        let address = peer.address();
        let inbox = {
            let members = self.members.read();
            let member = members
                .get(&address)
                .ok_or_else(|| PropagationError::Transport {
                    peer: address.clone(),
                    reason: "no node at this address".into(),
                })?;
            member.inbox.clone()
        };

        self.deliveries.lock().push(Delivery {
            to: address.clone(),
            kind: document.kind(),
        });

        let Some(inbox) = inbox else {
            return Ok(());
        };
        inbox
            .submit(Document::from(document.clone()))
            .await
            .map(|_| ())
            .map_err(|e| PropagationError::Rejected {
                peer: address,
                status: 400,
                message: e.to_string(),
            })
    }
}
