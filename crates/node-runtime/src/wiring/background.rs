//! Best-effort background tasks started once the node is running.
//! Failures are logged and never stop the task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::services::{BlockchainService, PeeringService};
use crate::LOG_PREFIX;

/// Compute chain statistics whenever the blockchain service asks for it.
/// Returns the number of computations run.
pub fn spawn_stats_worker(
    blockchain: Arc<dyn BlockchainService>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut computed = 0u64;
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = blockchain.stat_requested() => {
                    match blockchain.compute_stats().await {
                        Ok(stats) => {
                            computed += 1;
                            debug!(
                                "{LOG_PREFIX} Stats: {} block(s), {} member(s), {} pending",
                                stats.blocks, stats.members, stats.pending_memberships
                            );
                        }
                        Err(e) => warn!("{LOG_PREFIX} Stats computation failed: {e}"),
                    }
                }
            }
        }
        computed
    })
}

/// Run a block sync round every `interval`. Returns the number of rounds.
pub fn spawn_periodic_sync(
    peering: Arc<dyn PeeringService>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        info!("{LOG_PREFIX} Periodic sync every {interval:?}");
        let mut rounds = 0u64;
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(interval) => {
                    rounds += 1;
                    match peering.regular_sync_block().await {
                        Ok(0) => {}
                        Ok(applied) => info!("{LOG_PREFIX} Synced {applied} block(s)"),
                        Err(e) => warn!("{LOG_PREFIX} Sync round failed: {e}"),
                    }
                }
            }
        }
        rounds
    })
}
