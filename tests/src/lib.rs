//! # Trustmesh Test Suite
//!
//! Cross-crate integration flows: several nodes on an in-process network,
//! exchanging peers, documents and blocks through the real subsystems.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── network.rs   # In-process network: connector + transport
//!     ├── flows.rs     # Peering, propagation, relay, generation
//!     └── sync.rs      # Sync against scripted remotes
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p tm-tests
//! cargo test -p tm-tests integration::sync
//! ```

pub mod integration;
