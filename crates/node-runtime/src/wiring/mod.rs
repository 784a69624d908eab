//! # Subsystem Wiring
//!
//! Connects the subsystem crates to the node services and starts their
//! tasks.
//!
//! ```text
//! [DocumentDispatcher] ──event──→ [Event Bus] ──→ [PropagationPipeline (tm-02)]
//!          ↑                                              │
//!          │                                              ↓ NodeTransport
//!     [Inbox] ←──────────────── local target ─────────────┤
//!          ↑                                              ↓
//!          │                                        other peers (HTTP)
//!          │
//!   [GenerationLoop (tm-03)] ──send_block(self)──→ [Multicaster]
//!
//!   [stats worker]     blockchain.stat_requested → compute_stats
//!   [periodic sync]    peering.regular_sync_block every `sync.interval_ms`
//! ```
//!
//! Every task listens to the runtime's shutdown channel, except the
//! generation loop which owns its own stop signal.

pub mod background;
pub mod generation;
pub mod propagation;

pub use background::{spawn_periodic_sync, spawn_stats_worker};
pub use generation::start_generation;
pub use propagation::{start_propagation, PropagationWiring};
