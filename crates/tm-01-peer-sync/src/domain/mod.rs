//! Domain logic of the sync subsystem.

pub mod limiter;
