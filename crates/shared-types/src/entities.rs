//! # Core Domain Entities
//!
//! The entities produced by processing network documents.
//!
//! ## Clusters
//!
//! - **Web of trust**: [`Membership`]
//! - **Chain**: [`Block`]
//! - **Networking**: [`Peer`], [`PeerStatus`]
//!
//! Each entity serializes to the same JSON shape it is received in, so a
//! processed entity can be forwarded to other peers unchanged.

use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

use crate::digest::{document_digest, sha256_hex};
use crate::endpoint::Endpoint;
use crate::DOCUMENT_VERSION;

// =============================================================================
// CLUSTER A: WEB OF TRUST
// =============================================================================

/// Direction of a membership request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MembershipType {
    /// Request to join (or renew) the community.
    #[default]
    #[serde(rename = "IN")]
    In,
    /// Request to leave the community.
    #[serde(rename = "OUT")]
    Out,
}

/// A membership request, recognised on the wire by its `userid` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Membership {
    #[serde(default = "document_version")]
    pub version: u32,
    #[serde(default)]
    pub currency: String,
    /// Public key of the member.
    pub issuer: String,
    /// Block reference (`number-hash`) the request is anchored to.
    #[serde(default)]
    pub block: String,
    #[serde(default)]
    pub membership: MembershipType,
    pub userid: String,
    /// Reference of the identity this membership applies to.
    #[serde(default)]
    pub certts: String,
    #[serde(default)]
    pub signature: String,
}

impl Membership {
    /// Digest identifying this membership request.
    #[must_use]
    pub fn digest(&self) -> String {
        document_digest(self)
    }
}

// =============================================================================
// CLUSTER B: THE CHAIN
// =============================================================================

/// Literal document type tag carried by every block (`"type": "Block"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BlockType {
    #[default]
    Block,
}

/// A consensus unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(rename = "type", default)]
    pub document_type: BlockType,
    #[serde(default = "document_version")]
    pub version: u32,
    pub number: u64,
    #[serde(default)]
    pub currency: String,
    /// Hash of the predecessor; `None` for the root block.
    #[serde(default)]
    pub previous_hash: Option<String>,
    /// Public key of the producer.
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub time: u64,
    /// Memberships accepted by this block.
    #[serde(default)]
    pub joiners: Vec<Membership>,
    /// Transactions are opaque to this node's core.
    #[serde(default)]
    pub transactions: Vec<serde_json::Value>,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub signature: String,
}

/// Fields covered by a block's hash.
#[derive(Serialize)]
struct BlockContent<'a> {
    version: u32,
    number: u64,
    currency: &'a str,
    previous_hash: Option<&'a str>,
    issuer: &'a str,
    time: u64,
    joiners: &'a [Membership],
    transactions: &'a [serde_json::Value],
}

impl Block {
    /// Hash of the block content (everything but `hash` and `signature`).
    #[must_use]
    pub fn compute_hash(&self) -> String {
        document_digest(&BlockContent {
            version: self.version,
            number: self.number,
            currency: &self.currency,
            previous_hash: self.previous_hash.as_deref(),
            issuer: &self.issuer,
            time: self.time,
            joiners: &self.joiners,
            transactions: &self.transactions,
        })
    }

    /// Block reference as written in other documents: `number-hash`.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{}-{}", self.number, self.hash)
    }
}

// =============================================================================
// CLUSTER C: NETWORKING
// =============================================================================

/// Last known reachability of a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PeerStatus {
    Up,
    Down,
    #[default]
    Unknown,
}

/// A network participant, built from its peer announcement document
/// (recognised on the wire by its `endpoints` field).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    #[serde(default = "document_version")]
    pub version: u32,
    #[serde(default)]
    pub currency: String,
    pub pubkey: String,
    /// Block reference the announcement was made at.
    #[serde(default)]
    pub block: String,
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub signature: String,
    /// Local observation, never part of the announcement.
    #[serde(default, skip_serializing)]
    pub status: PeerStatus,
}

impl Peer {
    /// A peer known only by one endpoint (no key, no signature).
    #[must_use]
    pub fn from_endpoint(endpoint: Endpoint) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            currency: String::new(),
            pubkey: String::new(),
            block: String::new(),
            endpoints: vec![endpoint],
            signature: String::new(),
            status: PeerStatus::Unknown,
        }
    }

    /// First endpoint speaking the given API.
    #[must_use]
    pub fn endpoint_for(&self, api: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|ep| ep.api == api)
    }

    #[must_use]
    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        self.endpoints.iter().find_map(|ep| ep.ipv4)
    }

    #[must_use]
    pub fn ipv6(&self) -> Option<Ipv6Addr> {
        self.endpoints.iter().find_map(|ep| ep.ipv6)
    }

    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.endpoints.first().map(|ep| ep.port)
    }

    /// Base URL of the first endpoint.
    #[must_use]
    pub fn url(&self) -> Option<String> {
        self.endpoints.first().and_then(Endpoint::url)
    }

    /// Human readable `host:port` used in logs.
    #[must_use]
    pub fn address(&self) -> String {
        let host = self
            .ipv4()
            .map(|ip| ip.to_string())
            .or_else(|| self.ipv6().map(|ip| ip.to_string()))
            .or_else(|| self.endpoints.first().and_then(Endpoint::host))
            .unwrap_or_default();
        format!("{host}:{}", self.port().unwrap_or_default())
    }

    /// Whether the peer may currently be contacted.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.status != PeerStatus::Down
    }

    /// Unsigned textual form; this is what the issuer signs.
    #[must_use]
    pub fn raw(&self) -> String {
        let mut raw = format!(
            "Version: {}\nType: Peer\nCurrency: {}\nPublicKey: {}\nBlock: {}\nEndpoints:\n",
            self.version, self.currency, self.pubkey, self.block
        );
        for endpoint in &self.endpoints {
            raw.push_str(&endpoint.to_string());
            raw.push('\n');
        }
        raw
    }

    /// Signed textual form.
    #[must_use]
    pub fn raw_signed(&self) -> String {
        format!("{}{}\n", self.raw(), self.signature)
    }

    /// Merkle leaf of this peer in the peer list.
    #[must_use]
    pub fn leaf_hash(&self) -> String {
        sha256_hex(self.raw_signed().as_bytes())
    }
}

// =============================================================================
// DISPATCH RESULT
// =============================================================================

/// The fully processed entity returned by a successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEntity {
    Membership(Membership),
    Block(Block),
    Peer(Peer),
    /// Result of a document handled by an externally supplied interceptor.
    Extension {
        kind: String,
        value: serde_json::Value,
    },
}

fn document_version() -> u32 {
    DOCUMENT_VERSION
}
