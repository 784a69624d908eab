//! Hexagonal ports of the sync subsystem.

pub mod outbound;
pub mod types;

pub use outbound::{LocalChain, LocalPeers, RemoteConnector, RemoteNode, RequestLimiter};
pub use types::{LeafEntry, MerkleQuery, MerkleResponse};
