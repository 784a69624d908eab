//! Documents handed to peers.

use serde_json::{json, Value};
use shared_bus::NodeEvent;
use shared_types::{digest::document_digest, Block, Document, DocumentKind, Membership, Peer};

use crate::error::PropagationError;

/// A document accepted locally and due for propagation.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundDocument {
    Membership(Membership),
    Block(Block),
    Peer(Peer),
}

impl OutboundDocument {
    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Membership(_) => DocumentKind::Membership,
            Self::Block(_) => DocumentKind::Block,
            Self::Peer(_) => DocumentKind::Peer,
        }
    }

    /// Content digest used for duplicate suppression.
    #[must_use]
    pub fn digest(&self) -> String {
        let body = match self {
            Self::Membership(m) => document_digest(m),
            Self::Block(b) => document_digest(b),
            Self::Peer(p) => document_digest(p),
        };
        // Tag the kind so two kinds with equal bodies never collide.
        format!("{}:{body}", self.kind())
    }

    /// The peer a peer document announces.
    #[must_use]
    pub fn announced_peer(&self) -> Option<&Peer> {
        match self {
            Self::Peer(p) => Some(p),
            _ => None,
        }
    }

    /// HTTP route accepting this kind of document.
    #[must_use]
    pub fn http_path(&self) -> &'static str {
        match self {
            Self::Membership(_) => "/blockchain/membership",
            Self::Block(_) => "/blockchain/block",
            Self::Peer(_) => "/network/peering/peers",
        }
    }

    /// Key the document is wrapped under in a submission body.
    #[must_use]
    pub fn wrapper_key(&self) -> &'static str {
        match self {
            Self::Membership(_) => "membership",
            Self::Block(_) => "block",
            Self::Peer(_) => "peer",
        }
    }

    pub fn to_value(&self) -> Result<Value, PropagationError> {
        let encoded = match self {
            Self::Membership(m) => serde_json::to_value(m),
            Self::Block(b) => serde_json::to_value(b),
            Self::Peer(p) => serde_json::to_value(p),
        };
        encoded.map_err(|e| PropagationError::Encode(e.to_string()))
    }

    /// Submission body: `{ "<wrapper_key>": <document> }`.
    pub fn submission_body(&self) -> Result<Value, PropagationError> {
        Ok(json!({ self.wrapper_key(): self.to_value()? }))
    }
}

impl From<NodeEvent> for OutboundDocument {
    fn from(event: NodeEvent) -> Self {
        match event {
            NodeEvent::Membership(m) => Self::Membership(m),
            NodeEvent::Block(b) => Self::Block(b),
            NodeEvent::Peer(p) => Self::Peer(p),
        }
    }
}

impl From<OutboundDocument> for Document {
    fn from(document: OutboundDocument) -> Self {
        match document {
            OutboundDocument::Membership(m) => Document::Membership(m),
            OutboundDocument::Block(b) => Document::Block(b),
            OutboundDocument::Peer(p) => Document::Peer(p),
        }
    }
}
