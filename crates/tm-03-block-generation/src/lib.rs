//! # Block Generation Subsystem (tm-03)
//!
//! Repeatedly asks consensus for the next block and hands every produced
//! block to the propagation transport, addressed to this node's own public
//! endpoint.
//!
//! ```text
//! ┌──────────────────────────── GenerationLoop ────────────────────────────┐
//! │  stop? ──no──→ BlockForge::start_generation ──Some(block)──→ send_block │
//! │    ↑                     │None / Err                            │       │
//! │    └──── idle / retry pause (interruptible) ←───────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One cycle at a time: the next attempt starts only once the previous
//! broadcast has completed. Errors are logged and counted; they never end
//! the loop. Only [`GenerationHandle::stop`] does.

pub mod config;
pub mod error;
pub mod ports;
pub mod service;

pub use config::GenerationConfig;
pub use error::GenerationError;
pub use ports::{BlockBroadcaster, BlockForge};
pub use service::{GenerationHandle, GenerationLoop, GenerationStats};

pub(crate) const LOG_PREFIX: &str = "[tm-03]";
