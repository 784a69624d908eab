//! Transports for the propagation ports.

pub mod http;
