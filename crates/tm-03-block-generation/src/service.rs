//! The generation loop and its handle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shared_types::Peer;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::GenerationConfig;
use crate::ports::{BlockBroadcaster, BlockForge};
use crate::LOG_PREFIX;

/// Counters of a generation loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub attempts: u64,
    /// Blocks produced and broadcast.
    pub produced: u64,
    /// Attempts that produced nothing.
    pub empty: u64,
    /// Attempts that failed while generating or broadcasting.
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    attempts: AtomicU64,
    produced: AtomicU64,
    empty: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> GenerationStats {
        GenerationStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            produced: self.produced.load(Ordering::Relaxed),
            empty: self.empty.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

pub struct GenerationLoop {
    forge: Arc<dyn BlockForge>,
    broadcaster: Arc<dyn BlockBroadcaster>,
    /// Synthetic peer built from this node's public endpoint.
    target: Peer,
    config: GenerationConfig,
}

impl GenerationLoop {
    pub fn new(
        forge: Arc<dyn BlockForge>,
        broadcaster: Arc<dyn BlockBroadcaster>,
        target: Peer,
        config: GenerationConfig,
    ) -> Self {
        Self {
            forge,
            broadcaster,
            target,
            config,
        }
    }

    /// Start the loop as an independent task.
    #[must_use]
    pub fn spawn(self) -> GenerationHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let counters = Arc::new(Counters::default());
        let task = tokio::spawn(self.run(stop_rx, Arc::clone(&counters)));
        GenerationHandle {
            stop_tx,
            counters,
            task,
        }
    }

    async fn run(self, mut stop: watch::Receiver<bool>, counters: Arc<Counters>) -> GenerationStats {
        info!(
            "{LOG_PREFIX} Block generation started, broadcasting to {}",
            self.target.address()
        );

        // A dropped handle stops the loop as well.
        while !*stop.borrow() && stop.has_changed().is_ok() {
            counters.attempts.fetch_add(1, Ordering::Relaxed);

            let pause = match self.forge.start_generation().await {
                Ok(Some(block)) => {
                    let number = block.number;
                    match self.broadcaster.send_block(&self.target, &block).await {
                        Ok(()) => {
                            counters.produced.fetch_add(1, Ordering::Relaxed);
                            info!("{LOG_PREFIX} Generated block #{number}");
                            Duration::ZERO
                        }
                        Err(e) => {
                            counters.failures.fetch_add(1, Ordering::Relaxed);
                            warn!("{LOG_PREFIX} Block #{number} not broadcast: {e}");
                            self.config.retry_pause()
                        }
                    }
                }
                Ok(None) => {
                    counters.empty.fetch_add(1, Ordering::Relaxed);
                    debug!("{LOG_PREFIX} Nothing to generate");
                    self.config.idle_pause()
                }
                Err(e) => {
                    counters.failures.fetch_add(1, Ordering::Relaxed);
                    warn!("{LOG_PREFIX} {e}");
                    self.config.retry_pause()
                }
            };

            if pause.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::select! {
                    _ = tokio::time::sleep(pause) => {}
                    _ = stop.changed() => {}
                }
            }
        }

        let stats = counters.snapshot();
        info!(
            "{LOG_PREFIX} Block generation stopped after {} attempt(s), {} block(s)",
            stats.attempts, stats.produced
        );
        stats
    }
}

/// Handle on a spawned [`GenerationLoop`].
pub struct GenerationHandle {
    stop_tx: watch::Sender<bool>,
    counters: Arc<Counters>,
    task: JoinHandle<GenerationStats>,
}

impl GenerationHandle {
    /// Ask the loop to stop at its next iteration boundary.
    pub fn stop(&self) {
        // Err only if the loop already exited.
        let _ = self.stop_tx.send(true);
    }

    #[must_use]
    pub fn stats(&self) -> GenerationStats {
        self.counters.snapshot()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Wait for the loop to finish its current cycle and exit.
    pub async fn join(self) -> GenerationStats {
        let GenerationHandle {
            stop_tx,
            counters,
            task,
        } = self;
        let stats = task.await.unwrap_or_else(|_| counters.snapshot());
        drop(stop_tx);
        stats
    }

    /// [`Self::stop`] then [`Self::join`].
    pub async fn shutdown(self) -> GenerationStats {
        self.stop();
        self.join().await
    }
}
