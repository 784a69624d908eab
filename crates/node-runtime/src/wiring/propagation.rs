//! Propagation pipeline assembly.

use std::sync::Arc;

use shared_bus::{EventFilter, InMemoryEventBus};
use tm_02_block_propagation::{
    Multicaster, PeerTransport, PipelineHandle, PropagationPipeline, Router,
};
use tokio::sync::watch;
use tracing::info;

use crate::adapters::ports::{DirectoryPort, NodeTransport};
use crate::container::NodeConfig;
use crate::handlers::DocumentInbox;
use crate::services::ServiceGateway;
use crate::LOG_PREFIX;

/// A running pipeline and the multicaster it sends through.
pub struct PropagationWiring {
    pub multicaster: Arc<Multicaster>,
    pub handle: PipelineHandle,
}

/// Subscribe a propagation pipeline to `bus` and start it.
///
/// Targets come from the peering service. Deliveries addressed to this node
/// go through `inbox`; the rest through `remote`.
pub fn start_propagation(
    config: &NodeConfig,
    services: &ServiceGateway,
    bus: &InMemoryEventBus,
    inbox: DocumentInbox,
    remote: Arc<dyn PeerTransport>,
    shutdown: watch::Receiver<bool>,
) -> PropagationWiring {
    let directory = Arc::new(DirectoryPort::new(Arc::clone(&services.peering)));
    let router = Router::with_default_policy(directory, config.propagation.seen_capacity);

    let transport = Arc::new(NodeTransport::new(
        services.peering.pubkey(),
        config.self_endpoint(),
        inbox,
        remote,
    ));
    let multicaster = Multicaster::new(transport, config.propagation.peer_timeout())
        .isolated(config.isolate);

    let pipeline = PropagationPipeline::new(router, multicaster, &config.propagation);
    let multicaster = pipeline.multicaster();
    let handle = pipeline.spawn(bus.subscribe(EventFilter::all()), shutdown);
    info!(
        "{LOG_PREFIX} Propagation wired (isolate: {}, peer timeout: {:?})",
        config.isolate,
        config.propagation.peer_timeout()
    );

    PropagationWiring {
        multicaster,
        handle,
    }
}
