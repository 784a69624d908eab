//! Adapters binding subsystem ports to the node services.

pub mod generation;
pub mod propagation;
pub mod sync;

pub use generation::{BroadcastPort, ForgePort};
pub use propagation::{DirectoryPort, NodeTransport};
pub use sync::{ChainPort, PeeringPort};
