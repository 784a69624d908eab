//! # Node Lifecycle
//!
//! Sequential, run-once startup of a node.
//!
//! ```text
//! Unconfigured → ConfigValidated → KeyPairDerived → ServicesWired
//!              → SelfAnnounced → PeersTested → Synced → Running{generating}
//! ```
//!
//! Any failing step leaves the runtime in `Failed { step }` and the node
//! never reaches `Running`. Configuration is validated before key material
//! is touched.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use shared_bus::InMemoryEventBus;
use shared_types::{Document, Peer};
use thiserror::Error;
use tm_01_peer_sync::{PeerSyncService, RemoteNode, RequestLimiter, SyncEndpoints};
use tm_02_block_propagation::{PeerTransport, PipelineHandle, PipelineStats};
use tm_03_block_generation::{GenerationHandle, GenerationStats};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::adapters::ports::PeeringPort;
use crate::container::{ConfigError, NodeConfig, NodeContext};
use crate::handlers::{DispatchError, DocumentDispatcher, DocumentInbox};
use crate::keys::{derive_keypair, KeyError, KeyPairSigner, SignatureProvider};
use crate::services::{ServiceError, ServiceFactory};
use crate::wiring;
use crate::LOG_PREFIX;

/// Startup steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStep {
    ValidateConfig,
    DeriveKeyPair,
    WireServices,
    AnnounceSelf,
    TestPeers,
    RefreshMerkle,
    SyncBlocks,
}

impl fmt::Display for StartupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ValidateConfig => "configuration check",
            Self::DeriveKeyPair => "key derivation",
            Self::WireServices => "service wiring",
            Self::AnnounceSelf => "self announcement",
            Self::TestPeers => "peer testing",
            Self::RefreshMerkle => "peer merkle refresh",
            Self::SyncBlocks => "block synchronization",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unconfigured,
    ConfigValidated,
    KeyPairDerived,
    ServicesWired,
    SelfAnnounced,
    PeersTested,
    Synced,
    Running { generating: bool },
    Failed { step: StartupStep },
    Stopped,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("Key derivation did not complete: {0}")]
    KeyTask(#[source] tokio::task::JoinError),

    #[error("{step} failed: {source}")]
    Service {
        step: StartupStep,
        #[source]
        source: ServiceError,
    },

    #[error("{step} failed: {source}")]
    Dispatch {
        step: StartupStep,
        #[source]
        source: DispatchError,
    },

    #[error("Node cannot start twice (state: {0:?})")]
    AlreadyStarted(LifecycleState),

    #[error("Node is not running")]
    NotRunning,

    #[error("Peering exchange failed: {0}")]
    Peering(String),
}

impl LifecycleError {
    fn at(step: StartupStep) -> impl FnOnce(ServiceError) -> Self {
        move |source| Self::Service { step, source }
    }
}

/// Handles on the tasks started by the lifecycle.
#[derive(Default)]
struct Tasks {
    inbox: Option<JoinHandle<u64>>,
    pipeline: Option<PipelineHandle>,
    generation: Option<GenerationHandle>,
    stats: Option<JoinHandle<u64>>,
    sync: Option<JoinHandle<u64>>,
}

/// What the node's tasks did before they were stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub blocks_generated: u64,
    pub documents_handled: u64,
    pub documents_routed: u64,
    pub stats_computed: u64,
    pub sync_rounds: u64,
}

/// A node: configuration in, running services out.
pub struct NodeRuntime {
    config: Arc<NodeConfig>,
    factory: Arc<dyn ServiceFactory>,
    /// Network transport for documents addressed to other peers.
    remote: Arc<dyn PeerTransport>,
    state: Mutex<LifecycleState>,
    started: AtomicBool,
    context: Mutex<Option<NodeContext>>,
    tasks: Mutex<Tasks>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl NodeRuntime {
    pub fn new(
        config: NodeConfig,
        factory: Arc<dyn ServiceFactory>,
        remote: Arc<dyn PeerTransport>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config: Arc::new(config),
            factory,
            remote,
            state: Mutex::new(LifecycleState::Unconfigured),
            started: AtomicBool::new(false),
            context: Mutex::new(None),
            tasks: Mutex::new(Tasks::default()),
            shutdown_tx,
            shutdown_rx,
        }
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    fn advance(&self, state: LifecycleState) {
        *self.state.lock() = state;
    }

    /// Run the startup sequence. A runtime starts at most once, whatever
    /// the outcome of the first attempt.
    pub async fn start(&self) -> Result<(), LifecycleError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(LifecycleError::AlreadyStarted(self.state()));
        }

        let mut step = StartupStep::ValidateConfig;
        match self.boot(&mut step).await {
            Ok(generating) => {
                self.advance(LifecycleState::Running { generating });
                self.start_background();
                info!("{LOG_PREFIX} Node is running (generating: {generating})");
                Ok(())
            }
            Err(e) => {
                self.advance(LifecycleState::Failed { step });
                error!("{LOG_PREFIX} Startup aborted at {step}: {e}");
                self.stop_tasks().await;
                Err(e)
            }
        }
    }

    /// Steps up to `Synced`, then the optional generation loop. Returns
    /// whether the node generates blocks.
    async fn boot(&self, step: &mut StartupStep) -> Result<bool, LifecycleError> {
        self.config.validate()?;
        self.advance(LifecycleState::ConfigValidated);

        *step = StartupStep::DeriveKeyPair;
        // Argon2 is memory-hard; keep it off the async workers.
        let config = Arc::clone(&self.config);
        let pair = tokio::task::spawn_blocking(move || derive_keypair(&config))
            .await
            .map_err(LifecycleError::KeyTask)??;
        info!(
            "{LOG_PREFIX} Trustmesh node v{} for currency {}",
            env!("CARGO_PKG_VERSION"),
            self.config.currency
        );
        info!("{LOG_PREFIX} Public key: {}", pair.public_key());
        let signer: Arc<dyn SignatureProvider> = Arc::new(KeyPairSigner::new(pair));
        self.advance(LifecycleState::KeyPairDerived);

        *step = StartupStep::WireServices;
        let context = self.wire(signer)?;
        *self.context.lock() = Some(context.clone());
        self.advance(LifecycleState::ServicesWired);

        *step = StartupStep::AnnounceSelf;
        let own = context
            .services
            .peering
            .regular_peer_signal()
            .await
            .map_err(LifecycleError::at(StartupStep::AnnounceSelf))?;
        context
            .dispatcher
            .dispatch(Document::Peer(own))
            .await
            .map_err(|source| LifecycleError::Dispatch {
                step: StartupStep::AnnounceSelf,
                source,
            })?;
        self.advance(LifecycleState::SelfAnnounced);

        *step = StartupStep::TestPeers;
        context
            .services
            .peering
            .test_peers()
            .await
            .map_err(LifecycleError::at(StartupStep::TestPeers))?;
        self.advance(LifecycleState::PeersTested);

        *step = StartupStep::RefreshMerkle;
        let merkle = context
            .services
            .storage
            .update_merkle_for_peers()
            .await
            .map_err(LifecycleError::at(StartupStep::RefreshMerkle))?;
        info!(
            "{LOG_PREFIX} Peer list: {} peer(s), root {}",
            merkle.leaves_count, merkle.root
        );

        *step = StartupStep::SyncBlocks;
        let applied = context
            .services
            .peering
            .regular_sync_block()
            .await
            .map_err(LifecycleError::at(StartupStep::SyncBlocks))?;
        info!("{LOG_PREFIX} Initial sync applied {applied} block(s)");
        self.advance(LifecycleState::Synced);

        if !self.config.participate {
            return Ok(false);
        }
        self.tasks.lock().generation = Some(wiring::start_generation(&context));
        Ok(true)
    }

    /// Build the services, dispatcher, inbox and propagation pipeline.
    fn wire(&self, signer: Arc<dyn SignatureProvider>) -> Result<NodeContext, LifecycleError> {
        let services = self
            .factory
            .wire(&self.config, Arc::clone(&signer))
            .map_err(LifecycleError::at(StartupStep::WireServices))?;

        let bus = Arc::new(InMemoryEventBus::new());
        let dispatcher = Arc::new(
            DocumentDispatcher::new(services.clone(), bus.clone()).with_default_interceptors(),
        );

        let (inbox, receiver) = DocumentInbox::channel(self.config.inbox_capacity);
        let inbox_task = receiver.spawn(Arc::clone(&dispatcher), self.shutdown_rx.clone());

        let propagation = wiring::start_propagation(
            &self.config,
            &services,
            &bus,
            inbox.clone(),
            Arc::clone(&self.remote),
            self.shutdown_rx.clone(),
        );

        let mut tasks = self.tasks.lock();
        tasks.inbox = Some(inbox_task);
        tasks.pipeline = Some(propagation.handle);
        drop(tasks);

        Ok(NodeContext {
            config: Arc::clone(&self.config),
            public_key: signer.public_key(),
            signer,
            services,
            bus,
            dispatcher,
            inbox,
            multicaster: propagation.multicaster,
        })
    }

    fn start_background(&self) {
        let Some(context) = self.context() else {
            return;
        };
        let mut tasks = self.tasks.lock();
        tasks.stats = Some(wiring::spawn_stats_worker(
            Arc::clone(&context.services.blockchain),
            self.shutdown_rx.clone(),
        ));
        // First analysis of the chain as it stands after the initial sync.
        context.services.blockchain.add_stat_computing();
        tasks.sync = self.config.sync.interval().map(|interval| {
            wiring::spawn_periodic_sync(
                Arc::clone(&context.services.peering),
                interval,
                self.shutdown_rx.clone(),
            )
        });
    }

    /// The wired context, once services are wired.
    #[must_use]
    pub fn context(&self) -> Option<NodeContext> {
        self.context.lock().clone()
    }

    #[must_use]
    pub fn public_key(&self) -> Option<String> {
        self.context().map(|c| c.public_key)
    }

    pub fn sync_endpoints(
        &self,
        limiter: Arc<dyn RequestLimiter>,
    ) -> Result<SyncEndpoints, LifecycleError> {
        self.context()
            .map(|c| c.sync_endpoints(limiter))
            .ok_or(LifecycleError::NotRunning)
    }

    /// Exchange peer documents with `remote` in both directions.
    pub async fn share_peering_with(&self, remote: &dyn RemoteNode) -> Result<Peer, LifecycleError> {
        let context = self.context().ok_or(LifecycleError::NotRunning)?;
        let local = PeeringPort::new(Arc::clone(&context.services.peering));
        PeerSyncService::new(self.config.sync.client.clone())
            .share_peering_with(remote, &local)
            .await
            .map_err(|e| LifecycleError::Peering(e.to_string()))
    }

    #[must_use]
    pub fn generation_stats(&self) -> Option<GenerationStats> {
        self.tasks.lock().generation.as_ref().map(GenerationHandle::stats)
    }

    #[must_use]
    pub fn propagation_stats(&self) -> Option<PipelineStats> {
        self.tasks.lock().pipeline.as_ref().map(PipelineHandle::stats)
    }

    /// Stop every task and wait for them. The generation loop finishes its
    /// cycle in flight first.
    pub async fn shutdown(&self) -> ShutdownReport {
        info!("{LOG_PREFIX} Initiating graceful shutdown...");
        let report = self.stop_tasks().await;
        if matches!(self.state(), LifecycleState::Running { .. }) {
            self.advance(LifecycleState::Stopped);
        }
        info!("{LOG_PREFIX} Shutdown complete: {report:?}");
        report
    }

    /// Stop whatever has been started so far, in dependency order.
    async fn stop_tasks(&self) -> ShutdownReport {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        let mut report = ShutdownReport::default();

        if let Some(generation) = tasks.generation {
            let stats = generation.shutdown().await;
            report.blocks_generated = stats.produced;
            info!(
                "{LOG_PREFIX} Generation stopped: {} block(s) in {} attempt(s)",
                stats.produced, stats.attempts
            );
        }

        // Fails only when every receiver is gone, i.e. nothing left to stop.
        let _ = self.shutdown_tx.send(true);

        if let Some(pipeline) = tasks.pipeline {
            let stats = pipeline.join().await;
            report.documents_routed = stats.routed;
            info!(
                "{LOG_PREFIX} Propagation stopped: {} routed, {} delivered",
                stats.routed, stats.delivered
            );
        }
        report.documents_handled = join_counter(tasks.inbox, "inbox").await;
        report.stats_computed = join_counter(tasks.stats, "stats worker").await;
        report.sync_rounds = join_counter(tasks.sync, "periodic sync").await;
        report
    }
}

async fn join_counter(task: Option<JoinHandle<u64>>, name: &str) -> u64 {
    let Some(task) = task else {
        return 0;
    };
    match task.await {
        Ok(count) => count,
        Err(e) => {
            warn!("{LOG_PREFIX} {name} task ended abnormally: {e}");
            0
        }
    }
}
