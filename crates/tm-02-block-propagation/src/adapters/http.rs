//! HTTP delivery of documents to other nodes.
//!
//! Each document kind is posted to its submission route wrapped under its
//! kind name, e.g. `POST /blockchain/block` with `{"block": {...}}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shared_types::Peer;

use crate::domain::document::OutboundDocument;
use crate::error::PropagationError;
use crate::ports::PeerTransport;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// The multicaster bounds each delivery; `timeout` is the client-level
    /// ceiling on top of it.
    pub fn new(timeout: Duration) -> Result<Self, PropagationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PropagationError::Transport {
                peer: "-".into(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Full URL `document` is posted to on `peer`.
    pub fn target_url(peer: &Peer, document: &OutboundDocument) -> Result<String, PropagationError> {
        let base = peer
            .url()
            .ok_or_else(|| PropagationError::NoEndpoint(peer.pubkey.clone()))?;
        Ok(format!("{base}{}", document.http_path()))
    }
}

#[async_trait]
impl PeerTransport for HttpTransport {
    async fn deliver(
        &self,
        peer: &Peer,
        document: &OutboundDocument,
    ) -> Result<(), PropagationError> {
        let url = Self::target_url(peer, document)?;
        let body = document.submission_body()?;

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PropagationError::Transport {
                peer: peer.address(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(PropagationError::Rejected {
            peer: peer.address(),
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::tests::{block, peer};
    use shared_types::PeerStatus;

    #[test]
    fn test_target_url() {
        let url = HttpTransport::target_url(&peer("alice", 8999, PeerStatus::Up), &block(1)).unwrap();
        assert_eq!(url, "http://127.0.0.1:8999/blockchain/block");
    }

    #[test]
    fn test_peer_without_endpoint() {
        let mut target = peer("alice", 8999, PeerStatus::Up);
        target.endpoints.clear();
        assert!(matches!(
            HttpTransport::target_url(&target, &block(1)),
            Err(PropagationError::NoEndpoint(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_peer_is_transport_error() {
        let transport = HttpTransport::new(Duration::from_millis(500)).unwrap();
        let err = transport
            .deliver(&peer("alice", 9, PeerStatus::Up), &block(1))
            .await
            .unwrap_err();
        assert!(matches!(err, PropagationError::Transport { .. }));
    }
}
