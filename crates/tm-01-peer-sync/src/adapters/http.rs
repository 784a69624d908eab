//! HTTP client for another node's sync endpoints.
//!
//! Routes:
//!
//! | Call            | Route                                   |
//! |-----------------|-----------------------------------------|
//! | `peering`       | `GET  /network/peering`                 |
//! | `peers_merkle`  | `GET  /network/peering/peers[?leaves=true|?leaf=<hash>]` |
//! | `blocks`        | `GET  /blockchain/blocks/<count>/<from>` |
//! | `block`         | `GET  /blockchain/block/<number>`       |
//! | `add_peer`      | `POST /network/peering/peers` `{"peer": ...}` |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use shared_types::{Block, Peer};

use crate::error::SyncError;
use crate::ports::{MerkleQuery, MerkleResponse, RemoteConnector, RemoteNode};

/// A remote node reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemoteNode {
    client: Client,
    base_url: String,
}

impl HttpRemoteNode {
    /// Client for the node at `base_url` (e.g. `http://127.0.0.1:8999`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(2)))
            .build()
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing connection pool.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SyncError> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                SyncError::Transport(format!("Cannot connect to {}", self.base_url))
            } else {
                SyncError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(SyncError::RateLimited { retry_after });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, SyncError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SyncError::Remote {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .await
            .map_err(|e| SyncError::Decode(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, SyncError> {
        let response = self.send(self.client.get(self.url(path))).await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl RemoteNode for HttpRemoteNode {
    async fn peering(&self) -> Result<Peer, SyncError> {
        self.get("/network/peering").await
    }

    async fn peers_merkle(&self, query: MerkleQuery) -> Result<MerkleResponse, SyncError> {
        let request = self
            .client
            .get(self.url("/network/peering/peers"))
            .query(&query.params());
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    async fn blocks(&self, count: u64, from: u64) -> Result<Vec<Block>, SyncError> {
        self.get(&format!("/blockchain/blocks/{count}/{from}")).await
    }

    async fn block(&self, number: u64) -> Result<Option<Block>, SyncError> {
        let response = self
            .send(self.client.get(self.url(&format!("/blockchain/block/{number}"))))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(response).await.map(Some)
    }

    async fn add_peer(&self, peer: Peer) -> Result<Peer, SyncError> {
        let request = self
            .client
            .post(self.url("/network/peering/peers"))
            .json(&json!({ "peer": peer }));
        let response = self.send(request).await?;
        Self::decode(response).await
    }
}

/// Connects to peers through their first HTTP-reachable endpoint.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    client: Client,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl RemoteConnector for HttpConnector {
    fn connect(&self, peer: &Peer) -> Option<Arc<dyn RemoteNode>> {
        let url = peer.url()?;
        Some(Arc::new(HttpRemoteNode::with_client(self.client.clone(), url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Endpoint, PeerStatus};

    #[test]
    fn test_base_url_is_normalized() {
        let node = HttpRemoteNode::new("http://127.0.0.1:8999/", Duration::from_secs(1)).unwrap();
        assert_eq!(node.base_url(), "http://127.0.0.1:8999");
        assert_eq!(node.url("/network/peering"), "http://127.0.0.1:8999/network/peering");
    }

    #[test]
    fn test_merkle_query_params() {
        assert!(MerkleQuery::Summary.params().is_empty());
        assert_eq!(
            MerkleQuery::Leaves.params(),
            vec![("leaves", "true".to_string())]
        );
        assert_eq!(
            MerkleQuery::Leaf("AB".into()).params(),
            vec![("leaf", "AB".to_string())]
        );
    }

    #[test]
    fn test_connector_skips_peers_without_endpoint() {
        let connector = HttpConnector::new(Duration::from_secs(1)).unwrap();
        let mut peer = Peer::from_endpoint(Endpoint::basic_merkled(
            Some("node.example.org".into()),
            None,
            None,
            443,
        ));
        peer.status = PeerStatus::Up;
        assert!(connector.connect(&peer).is_some());

        peer.endpoints.clear();
        assert!(connector.connect(&peer).is_none());
    }

    #[tokio::test]
    async fn test_unreachable_node_is_transport_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let node = HttpRemoteNode::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = node.peering().await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
    }
}
