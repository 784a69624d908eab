//! # Shared Bus - Event Bus for Accepted Documents
//!
//! Decouples the document dispatcher from the propagation pipeline: the
//! dispatcher publishes an event each time a backing service accepts a
//! document, and any number of consumers subscribe to it.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────────────┐
//! │  Dispatcher  │                    │ Propagation pipeline │
//! │              │    publish()       │                      │
//! │              │ ──────┐            │                      │
//! └──────────────┘       │            └──────────────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! Events are named after the document kind they carry: `membership`,
//! `block` and `peer`.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{EventFilter, EventTopic, NodeEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before the slowest one lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
