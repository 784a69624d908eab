//! # Node Runtime Library
//!
//! Assembles a Trustmesh node from the subsystem crates. The main entry
//! point is the `main.rs` binary; the library is what the integration
//! suite drives.
//!
//! ## Layout
//!
//! - `container/` - configuration and the wired [`NodeContext`]
//! - `keys` - key pair derivation and signing
//! - `services/` - backing service contracts ([`ServiceGateway`])
//! - `adapters/` - in-memory services and subsystem port adapters
//! - `handlers/` - document dispatch and the inbox in front of it
//! - `wiring/` - subsystem task assembly
//! - `lifecycle` - startup sequence and shutdown ([`NodeRuntime`])

#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_lines)]

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod keys;
pub mod lifecycle;
pub mod services;
pub mod wiring;

pub use adapters::memory::MemoryServiceFactory;
pub use container::{ConfigError, NodeConfig, NodeContext};
pub use handlers::{DispatchError, DocumentDispatcher, DocumentInbox};
pub use keys::{KeyError, KeyPair, KeyPairSigner, SignatureProvider};
pub use lifecycle::{LifecycleError, LifecycleState, NodeRuntime, ShutdownReport, StartupStep};
pub use services::{ServiceError, ServiceFactory, ServiceGateway};

/// Log prefix of the node runtime.
pub(crate) const LOG_PREFIX: &str = "[node]";
