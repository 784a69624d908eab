//! # Network Documents
//!
//! Inbound documents arrive as untyped JSON objects. Their type is never
//! declared explicitly (except for blocks); it is inferred from which
//! fields are present:
//!
//! | Kind       | Predicate                         |
//! |------------|-----------------------------------|
//! | Membership | `userid` present and truthy       |
//! | Block      | `type` equals `"Block"`           |
//! | Peer       | `endpoints` present and truthy    |
//!
//! The predicates are checked in the order above and the first match wins,
//! so a document carrying both `userid` and `endpoints` is a membership.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::{Block, Membership, Peer};
use crate::errors::DocumentError;

/// Structural classification of a raw document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    Membership,
    Block,
    Peer,
}

impl DocumentKind {
    /// Classification order. Do not reorder: producers rely on it.
    pub const PRECEDENCE: [DocumentKind; 3] =
        [DocumentKind::Membership, DocumentKind::Block, DocumentKind::Peer];

    /// Whether `value` has the shape of this kind.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            DocumentKind::Membership => is_truthy(value.get("userid")),
            DocumentKind::Block => value.get("type").and_then(Value::as_str) == Some("Block"),
            DocumentKind::Peer => is_truthy(value.get("endpoints")),
        }
    }

    /// First kind in [`Self::PRECEDENCE`] matching `value`.
    #[must_use]
    pub fn classify(value: &Value) -> Option<DocumentKind> {
        Self::PRECEDENCE
            .into_iter()
            .find(|kind| kind.matches(value))
    }

    /// Name of the event emitted once a document of this kind is accepted.
    #[must_use]
    pub fn event_name(self) -> &'static str {
        match self {
            DocumentKind::Membership => "membership",
            DocumentKind::Block => "block",
            DocumentKind::Peer => "peer",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

/// Loose truthiness of an optional JSON value.
///
/// Missing, `null`, `false`, `0` and `""` are falsy. Everything else is
/// truthy, including empty arrays and objects.
#[must_use]
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// A parsed inbound document, classified exactly once.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Membership(Membership),
    Block(Block),
    Peer(Peer),
    /// Matched none of the built-in shapes; kept raw for extension handlers.
    Unclassified(Value),
}

impl Document {
    /// Parse and classify a JSON text.
    pub fn parse(raw: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    /// Classify an already decoded JSON value.
    ///
    /// A document that matches a kind but fails to deserialize as that kind
    /// is malformed; it does not fall through to the next predicate.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        let Some(kind) = DocumentKind::classify(&value) else {
            return Ok(Document::Unclassified(value));
        };
        let malformed = |e: serde_json::Error| DocumentError::Malformed {
            kind,
            reason: e.to_string(),
        };
        Ok(match kind {
            DocumentKind::Membership => {
                Document::Membership(serde_json::from_value(value).map_err(malformed)?)
            }
            DocumentKind::Block => Document::Block(serde_json::from_value(value).map_err(malformed)?),
            DocumentKind::Peer => Document::Peer(serde_json::from_value(value).map_err(malformed)?),
        })
    }

    /// Classification, `None` for unclassified documents.
    #[must_use]
    pub fn kind(&self) -> Option<DocumentKind> {
        match self {
            Document::Membership(_) => Some(DocumentKind::Membership),
            Document::Block(_) => Some(DocumentKind::Block),
            Document::Peer(_) => Some(DocumentKind::Peer),
            Document::Unclassified(_) => None,
        }
    }

    /// JSON form of the document as it would be sent on the wire.
    pub fn to_value(&self) -> Result<Value, DocumentError> {
        Ok(match self {
            Document::Membership(m) => serde_json::to_value(m)?,
            Document::Block(b) => serde_json::to_value(b)?,
            Document::Peer(p) => serde_json::to_value(p)?,
            Document::Unclassified(v) => v.clone(),
        })
    }
}

impl From<Membership> for Document {
    fn from(value: Membership) -> Self {
        Document::Membership(value)
    }
}

impl From<Block> for Document {
    fn from(value: Block) -> Self {
        Document::Block(value)
    }
}

impl From<Peer> for Document {
    fn from(value: Peer) -> Self {
        Document::Peer(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn membership_json() -> Value {
        json!({
            "currency": "meta_brouzouf",
            "issuer": "HgTTJLAQ5sqfknMq7yLPZbehtuLSsKj9CxWN7k8QvYJd",
            "block": "0-E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855",
            "membership": "IN",
            "userid": "cat",
            "certts": "0-E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855",
            "signature": "sig"
        })
    }

    #[test]
    fn test_classify_each_shape() {
        assert_eq!(
            DocumentKind::classify(&membership_json()),
            Some(DocumentKind::Membership)
        );
        assert_eq!(
            DocumentKind::classify(&json!({ "type": "Block", "number": 0 })),
            Some(DocumentKind::Block)
        );
        assert_eq!(
            DocumentKind::classify(&json!({ "pubkey": "abc", "endpoints": ["BASIC_MERKLED_API 127.0.0.1 80"] })),
            Some(DocumentKind::Peer)
        );
        assert_eq!(DocumentKind::classify(&json!({ "foo": 1 })), None);
    }

    #[test]
    fn test_membership_wins_over_peer() {
        let mut value = membership_json();
        value["endpoints"] = json!(["BASIC_MERKLED_API 127.0.0.1 80"]);
        let doc = Document::from_value(value).unwrap();
        assert_eq!(doc.kind(), Some(DocumentKind::Membership));
    }

    #[test]
    fn test_block_type_is_exact() {
        assert_eq!(DocumentKind::classify(&json!({ "type": "block" })), None);
        assert_eq!(DocumentKind::classify(&json!({ "type": "Blocks" })), None);
    }

    #[test]
    fn test_falsy_userid_is_not_membership() {
        for falsy in [json!(""), json!(null), json!(0), json!(false)] {
            assert_eq!(DocumentKind::classify(&json!({ "userid": falsy })), None);
        }
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(None));
        assert!(is_truthy(Some(&json!([]))));
        assert!(is_truthy(Some(&json!({}))));
        assert!(is_truthy(Some(&json!(0.5))));
        assert!(!is_truthy(Some(&json!(0.0))));
    }

    #[test]
    fn test_empty_endpoints_array_is_peer_but_malformed_without_pubkey() {
        let err = Document::from_value(json!({ "endpoints": [] })).unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Malformed {
                kind: DocumentKind::Peer,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        assert!(matches!(
            Document::parse("{not json"),
            Err(DocumentError::NotJson(_))
        ));
    }

    #[test]
    fn test_unclassified_round_trip_is_raw() {
        let raw = json!({ "uid": "cat", "buid": "0-ABC" });
        let doc = Document::from_value(raw.clone()).unwrap();
        assert_eq!(doc, Document::Unclassified(raw.clone()));
        assert_eq!(doc.to_value().unwrap(), raw);
    }
}
