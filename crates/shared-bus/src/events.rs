//! # Node Events
//!
//! One event per accepted document kind.

use serde::{Deserialize, Serialize};
use shared_types::{Block, DocumentKind, Membership, Peer};

/// An accepted document, emitted after its backing service succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "document", rename_all = "lowercase")]
pub enum NodeEvent {
    Membership(Membership),
    Block(Block),
    Peer(Peer),
}

impl NodeEvent {
    /// Topic used for subscription filtering.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::Membership(_) => EventTopic::Membership,
            Self::Block(_) => EventTopic::Block,
            Self::Peer(_) => EventTopic::Peer,
        }
    }

    /// Wire name of the event (`membership`, `block`, `peer`).
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind().event_name()
    }

    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        match self {
            Self::Membership(_) => DocumentKind::Membership,
            Self::Block(_) => DocumentKind::Block,
            Self::Peer(_) => DocumentKind::Peer,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Membership,
    Block,
    Peer,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &NodeEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn block_event(number: u64) -> NodeEvent {
        NodeEvent::Block(
            serde_json::from_value(serde_json::json!({ "type": "Block", "number": number }))
                .unwrap(),
        )
    }

    pub(crate) fn membership_event() -> NodeEvent {
        NodeEvent::Membership(
            serde_json::from_value(serde_json::json!({ "issuer": "abc", "userid": "cat" }))
                .unwrap(),
        )
    }

    #[test]
    fn test_event_names() {
        assert_eq!(block_event(0).name(), "block");
        assert_eq!(membership_event().name(), "membership");
        assert_eq!(membership_event().topic(), EventTopic::Membership);
    }

    #[test]
    fn test_filter_all() {
        assert!(EventFilter::all().matches(&block_event(1)));
        assert!(EventFilter::topics(vec![EventTopic::All]).matches(&membership_event()));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::Block]);
        assert!(filter.matches(&block_event(1)));
        assert!(!filter.matches(&membership_event()));
    }

    #[test]
    fn test_event_json_shape() {
        let value = serde_json::to_value(block_event(2)).unwrap();
        assert_eq!(value["event"], "block");
        assert_eq!(value["document"]["number"], 2);
    }
}
