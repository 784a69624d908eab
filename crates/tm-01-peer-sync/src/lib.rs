//! # Peer Sync Subsystem (tm-01)
//!
//! Keeps a node's peer list and block history aligned with the rest of the
//! network.
//!
//! ## Architecture Role
//!
//! ```text
//! [Lifecycle / Peering] ──sync_blocks / sync_peer_list──→ [PeerSyncService]
//!                                                               │
//!                                                               ↓ RemoteNode port
//!                                                 ┌─────────────┴─────────────┐
//!                                                 ↓                           ↓
//!                                          [HttpRemoteNode]            [SyncEndpoints]
//!                                           (other nodes)          (in-process, tests)
//! ```
//!
//! The read side a node exposes to others is [`SyncEndpoints`]: self peer,
//! peer-list merkle summary, block ranges and single blocks. Every read
//! consults a [`RequestLimiter`]; a declined read is a back-off signal
//! ([`SyncError::RateLimited`]), never a hard failure.
//!
//! Reads are idempotent and out-of-range block requests yield empty
//! results.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod endpoints;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::http::{HttpConnector, HttpRemoteNode};
pub use config::{Backoff, SyncConfig};
pub use domain::limiter::{NoLimit, TokenBucketLimiter};
pub use endpoints::SyncEndpoints;
pub use error::SyncError;
pub use ports::{
    LeafEntry, LocalChain, LocalPeers, MerkleQuery, MerkleResponse, RemoteConnector, RemoteNode,
    RequestLimiter,
};
pub use service::{PeerListSync, PeerSyncService};

/// Log prefix of this subsystem.
pub(crate) const LOG_PREFIX: &str = "[tm-01]";
