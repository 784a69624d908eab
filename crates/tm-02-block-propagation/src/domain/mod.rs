//! Domain logic of the propagation subsystem.

pub mod document;
pub mod router;
pub mod seen_cache;
