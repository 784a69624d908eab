//! Payloads exchanged over the sync ports.

use serde::{Deserialize, Serialize};
use shared_types::{MerkleSummary, Peer};

/// What to ask of a peer-list merkle endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MerkleQuery {
    /// Summary only.
    Summary,
    /// Summary with every leaf hash.
    Leaves,
    /// Summary with the peer behind one leaf.
    Leaf(String),
}

impl MerkleQuery {
    /// Query string parameters of this request.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            MerkleQuery::Summary => Vec::new(),
            MerkleQuery::Leaves => vec![("leaves", "true".to_string())],
            MerkleQuery::Leaf(hash) => vec![("leaf", hash.clone())],
        }
    }
}

/// A merkle leaf with the peer it hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafEntry {
    pub hash: String,
    pub value: Peer,
}

/// Answer of a peer-list merkle endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleResponse {
    #[serde(flatten)]
    pub summary: MerkleSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf: Option<LeafEntry>,
}
