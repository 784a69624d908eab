pub mod flows;
pub mod network;
pub mod sync;

pub use network::{node_config, start_node, InMemoryNetwork, CURRENCY};
