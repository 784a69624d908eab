//! # Block Propagation Subsystem (tm-02)
//!
//! Forwards documents accepted by this node to the rest of the network.
//!
//! ## Architecture Role
//!
//! ```text
//! [Event Bus] ──membership/block/peer──→ [Router] ──(peer, doc)*──→ [Multicaster]
//!      ↑                                                             │
//!      │                                                             ↓ per-peer, timed
//!  [Dispatcher] ←── inbox ←── documents received from peers ←── [Peer A] [Peer B] ...
//! ```
//!
//! Documents received from peers come back through the node's dispatcher
//! and the bus, so a relayed document reaches the router a second time.
//!
//! - The router picks targets through a [`FanoutPolicy`] and drops documents
//!   it has already routed, which breaks relay cycles.
//! - The multicaster sends to each target independently: one slow or
//!   failing peer never delays or fails another.
//! - The pipeline runs each multicast as its own task, so a slow peer never
//!   holds back the next document either.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod multicaster;
pub mod pipeline;
pub mod ports;

pub use adapters::http::HttpTransport;
pub use config::PropagationConfig;
pub use domain::document::OutboundDocument;
pub use domain::router::{AllUpPeersExceptOrigin, ForwardInstruction, Router};
pub use domain::seen_cache::SeenCache;
pub use error::PropagationError;
pub use multicaster::{FailedDelivery, MulticastReport, Multicaster};
pub use pipeline::{PipelineHandle, PipelineStats, PropagationPipeline};
pub use ports::{FanoutPolicy, PeerDirectory, PeerTransport};

pub(crate) const LOG_PREFIX: &str = "[tm-02]";
