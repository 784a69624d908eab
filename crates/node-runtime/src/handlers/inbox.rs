//! # Document Inbox
//!
//! Queue in front of the dispatcher. Transports submit documents and await
//! the dispatch result; one worker drains the queue in arrival order.

use std::sync::Arc;

use shared_types::{Document, DomainEntity};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::handlers::dispatch::{DispatchError, DocumentDispatcher};
use crate::LOG_PREFIX;

type Reply = oneshot::Sender<Result<DomainEntity, DispatchError>>;

/// Submitting side of the inbox.
#[derive(Clone)]
pub struct DocumentInbox {
    tx: mpsc::Sender<(Document, Reply)>,
}

/// Draining side of the inbox, consumed by [`InboxReceiver::spawn`].
pub struct InboxReceiver {
    rx: mpsc::Receiver<(Document, Reply)>,
}

impl DocumentInbox {
    #[must_use]
    pub fn channel(capacity: usize) -> (DocumentInbox, InboxReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (DocumentInbox { tx }, InboxReceiver { rx })
    }

    /// Queue `document` and wait for its dispatch result.
    pub async fn submit(&self, document: Document) -> Result<DomainEntity, DispatchError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((document, reply_tx))
            .await
            .map_err(|_| DispatchError::InboxClosed)?;
        reply_rx.await.map_err(|_| DispatchError::InboxClosed)?
    }

    /// Parse a raw JSON document and submit it.
    pub async fn submit_raw(&self, raw: &str) -> Result<DomainEntity, DispatchError> {
        self.submit(Document::parse(raw)?).await
    }
}

impl InboxReceiver {
    /// Drain the inbox until shutdown or until every sender is gone.
    /// Returns the number of documents dispatched.
    pub fn spawn(
        mut self,
        dispatcher: Arc<DocumentDispatcher>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<u64> {
        tokio::spawn(async move {
            let mut handled = 0u64;
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("{LOG_PREFIX} Inbox: shutdown signal received");
                            break;
                        }
                    }
                    item = self.rx.recv() => {
                        let Some((document, reply)) = item else {
                            debug!("{LOG_PREFIX} Inbox: all senders gone");
                            break;
                        };
                        let result = dispatcher.dispatch(document).await;
                        if let Err(e) = &result {
                            debug!("{LOG_PREFIX} Inbox: document refused: {e}");
                        }
                        handled += 1;
                        // The submitter may have given up waiting.
                        let _ = reply.send(result);
                    }
                }
            }
            handled
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::adapters::memory::tests::{gateway, membership};
    use parking_lot::Mutex;
    use shared_bus::InMemoryEventBus;
    use std::time::Duration;

    /// Inbox whose worker records documents and accepts them all.
    pub(crate) fn recording_inbox() -> (DocumentInbox, Arc<Mutex<Vec<Document>>>) {
        let (inbox, mut receiver) = DocumentInbox::channel(16);
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        tokio::spawn(async move {
            while let Some((document, reply)) = receiver.rx.recv().await {
                sink.lock().push(document);
                let _ = reply.send(Ok(DomainEntity::Extension {
                    kind: "recorded".into(),
                    value: serde_json::Value::Null,
                }));
            }
        });
        (inbox, received)
    }

    fn worker() -> (DocumentInbox, watch::Sender<bool>, JoinHandle<u64>) {
        let dispatcher = Arc::new(DocumentDispatcher::new(
            gateway(),
            Arc::new(InMemoryEventBus::new()),
        ));
        let (inbox, receiver) = DocumentInbox::channel(4);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = receiver.spawn(dispatcher, shutdown_rx);
        (inbox, shutdown_tx, task)
    }

    #[tokio::test]
    async fn test_submit_returns_dispatch_result() {
        let (inbox, _shutdown, _task) = worker();
        let entity = inbox
            .submit(Document::Membership(membership("cat")))
            .await
            .unwrap();
        assert!(matches!(entity, DomainEntity::Membership(_)));

        // Same membership again: refused by the service.
        assert!(matches!(
            inbox.submit(Document::Membership(membership("cat"))).await,
            Err(DispatchError::Service { .. })
        ));
        assert!(matches!(
            inbox.submit_raw("not json").await,
            Err(DispatchError::Document(_))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_closes_inbox() {
        let (inbox, shutdown, task) = worker();
        inbox
            .submit(Document::Membership(membership("cat")))
            .await
            .unwrap();
        shutdown.send(true).unwrap();
        let handled = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("worker stopped")
            .unwrap();
        assert_eq!(handled, 1);
        assert!(matches!(
            inbox.submit(Document::Membership(membership("dog"))).await,
            Err(DispatchError::InboxClosed)
        ));
    }

    #[tokio::test]
    async fn test_dropped_shutdown_sender_stops_worker() {
        let (_inbox, shutdown, task) = worker();
        drop(shutdown);
        let handled = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("worker stopped")
            .unwrap();
        assert_eq!(handled, 0);
    }
}
