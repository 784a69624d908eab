//! Adapters connecting the sync ports to real transports.

pub mod http;
