//! # Multicaster
//!
//! Sends forwarding instructions concurrently. Each delivery runs under its
//! own timeout and its outcome is reported separately.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use shared_types::{Block, Peer};
use tracing::{debug, warn};

use crate::domain::document::OutboundDocument;
use crate::domain::router::ForwardInstruction;
use crate::error::PropagationError;
use crate::ports::PeerTransport;
use crate::LOG_PREFIX;

/// A delivery that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDelivery {
    pub peer: String,
    pub error: PropagationError,
}

/// Outcome of one multicast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MulticastReport {
    /// Peers (public keys) that accepted the document.
    pub delivered: Vec<String>,
    pub failed: Vec<FailedDelivery>,
    /// Targets left out because the node is isolated.
    pub skipped: usize,
}

impl MulticastReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Multicaster {
    transport: Arc<dyn PeerTransport>,
    timeout: Duration,
    isolate: bool,
}

impl Multicaster {
    pub fn new(transport: Arc<dyn PeerTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            isolate: false,
        }
    }

    /// Keep the network untouched; only local deliveries go through.
    #[must_use]
    pub fn isolated(mut self, isolate: bool) -> Self {
        self.isolate = isolate;
        self
    }

    #[must_use]
    pub fn is_isolated(&self) -> bool {
        self.isolate
    }

    fn label(peer: &Peer) -> String {
        if peer.pubkey.is_empty() {
            peer.address()
        } else {
            peer.pubkey.clone()
        }
    }

    async fn deliver_one(
        &self,
        peer: &Peer,
        document: &OutboundDocument,
    ) -> Result<(), PropagationError> {
        match tokio::time::timeout(self.timeout, self.transport.deliver(peer, document)).await {
            Ok(result) => result,
            Err(_) => Err(PropagationError::Timeout {
                peer: Self::label(peer),
                after: self.timeout,
            }),
        }
    }

    /// Deliver every instruction. Never fails as a whole.
    pub async fn multicast(&self, instructions: Vec<ForwardInstruction>) -> MulticastReport {
        let mut report = MulticastReport::default();

        let (sendable, skipped): (Vec<_>, Vec<_>) = instructions
            .into_iter()
            .partition(|i| !self.isolate || self.transport.is_local(&i.peer));
        report.skipped = skipped.len();

        let outcomes = join_all(sendable.iter().map(|instruction| async move {
            let outcome = self
                .deliver_one(&instruction.peer, &instruction.document)
                .await;
            (Self::label(&instruction.peer), outcome)
        }))
        .await;

        for (peer, outcome) in outcomes {
            match outcome {
                Ok(()) => {
                    debug!("{LOG_PREFIX} Delivered to {peer}");
                    report.delivered.push(peer);
                }
                Err(error) => {
                    warn!("{LOG_PREFIX} Delivery to {peer} failed: {error}");
                    report.failed.push(FailedDelivery { peer, error });
                }
            }
        }
        report
    }

    /// Send a freshly produced block to a single target.
    pub async fn send_block(&self, target: &Peer, block: &Block) -> Result<(), PropagationError> {
        if self.isolate && !self.transport.is_local(target) {
            debug!(
                "{LOG_PREFIX} Isolated, not sending block #{} to {}",
                block.number,
                target.address()
            );
            return Ok(());
        }
        self.deliver_one(target, &OutboundDocument::Block(block.clone()))
            .await
    }
}
