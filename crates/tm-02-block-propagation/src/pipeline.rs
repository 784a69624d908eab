//! # Propagation Pipeline
//!
//! Background task wiring the event bus to the router and the multicaster.
//!
//! Routing happens on the receive loop, in bus order, so duplicate
//! suppression sees documents in the order they were accepted. Each
//! resulting multicast runs as its own task; at most `max_in_flight` of them
//! run at once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use shared_bus::Subscription;
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::config::PropagationConfig;
use crate::domain::document::OutboundDocument;
use crate::domain::router::{ForwardInstruction, Router};
use crate::multicaster::{MulticastReport, Multicaster};
use crate::LOG_PREFIX;

/// Counters of a running pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Documents that produced at least one instruction.
    pub routed: u64,
    /// Documents dropped by duplicate suppression or lacking targets.
    pub dropped: u64,
    pub delivered: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    routed: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            routed: self.routed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn record(&self, report: &MulticastReport) {
        self.delivered
            .fetch_add(report.delivered.len() as u64, Ordering::Relaxed);
        self.failed
            .fetch_add(report.failed.len() as u64, Ordering::Relaxed);
    }
}

pub struct PropagationPipeline {
    router: Arc<Router>,
    multicaster: Arc<Multicaster>,
    max_in_flight: usize,
    counters: Arc<Counters>,
}

impl PropagationPipeline {
    pub fn new(router: Router, multicaster: Multicaster, config: &PropagationConfig) -> Self {
        Self {
            router: Arc::new(router),
            multicaster: Arc::new(multicaster),
            max_in_flight: config.max_in_flight.max(1),
            counters: Arc::new(Counters::default()),
        }
    }

    #[must_use]
    pub fn multicaster(&self) -> Arc<Multicaster> {
        Arc::clone(&self.multicaster)
    }

    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        self.counters.snapshot()
    }

    /// Route one document. `None` when the router dropped it.
    async fn route(&self, document: OutboundDocument) -> Option<Vec<ForwardInstruction>> {
        let instructions = self.router.route(document).await;
        if instructions.is_empty() {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            None
        } else {
            self.counters.routed.fetch_add(1, Ordering::Relaxed);
            Some(instructions)
        }
    }

    async fn multicast(
        multicaster: &Multicaster,
        counters: &Counters,
        instructions: Vec<ForwardInstruction>,
    ) -> MulticastReport {
        let kind = instructions.first().map(|i| i.document.kind());
        let report = multicaster.multicast(instructions).await;
        counters.record(&report);
        if let Some(kind) = kind {
            debug!(
                "{LOG_PREFIX} {kind} multicast: {} delivered, {} failed",
                report.delivered.len(),
                report.failed.len()
            );
        }
        report
    }

    /// Route and multicast one document, waiting for every delivery.
    pub async fn process(&self, document: OutboundDocument) -> MulticastReport {
        match self.route(document).await {
            Some(instructions) => {
                Self::multicast(&self.multicaster, &self.counters, instructions).await
            }
            None => MulticastReport::default(),
        }
    }

    /// Run the pipeline until `shutdown` flips to `true` or the bus closes.
    /// Multicasts already started are awaited before the task ends.
    pub fn spawn(
        self,
        mut subscription: Subscription,
        mut shutdown: watch::Receiver<bool>,
    ) -> PipelineHandle {
        let counters = Arc::clone(&self.counters);

        let task = tokio::spawn(async move {
            info!("{LOG_PREFIX} Propagation pipeline started");
            let slots = Arc::new(Semaphore::new(self.max_in_flight));
            let mut in_flight = JoinSet::new();

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("{LOG_PREFIX} Shutdown signal received");
                            break;
                        }
                    }
                    Some(finished) = in_flight.join_next(), if !in_flight.is_empty() => {
                        if let Err(e) = finished {
                            warn!("{LOG_PREFIX} Multicast task failed: {e}");
                        }
                    }
                    event = subscription.recv() => {
                        let Some(event) = event else {
                            debug!("{LOG_PREFIX} Event bus closed");
                            break;
                        };
                        let Some(instructions) = self.route(event.into()).await else {
                            continue;
                        };
                        let permit = tokio::select! {
                            permit = Arc::clone(&slots).acquire_owned() => permit,
                            _ = shutdown.changed() => break,
                        };
                        let Ok(permit) = permit else { break };
                        let multicaster = Arc::clone(&self.multicaster);
                        let counters = Arc::clone(&self.counters);
                        in_flight.spawn(async move {
                            Self::multicast(&multicaster, &counters, instructions).await;
                            drop(permit);
                        });
                    }
                }
            }

            while let Some(finished) = in_flight.join_next().await {
                if let Err(e) = finished {
                    warn!("{LOG_PREFIX} Multicast task failed: {e}");
                }
            }
            self.counters.snapshot()
        });

        PipelineHandle { counters, task }
    }
}

/// Handle on a spawned [`PropagationPipeline`].
pub struct PipelineHandle {
    counters: Arc<Counters>,
    task: JoinHandle<PipelineStats>,
}

impl PipelineHandle {
    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        self.counters.snapshot()
    }

    /// Wait for the task to stop and return its final counters.
    pub async fn join(self) -> PipelineStats {
        let counters = self.counters;
        self.task.await.unwrap_or_else(|_| counters.snapshot())
    }
}
