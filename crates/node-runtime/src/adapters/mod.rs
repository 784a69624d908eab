//! # Adapter Implementations
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    OUTER LAYER (Adapters)                        │
//! │  memory/  MemoryBlockchain, MemoryPeering, MemoryStorage, ...    │
//! │  ports/   ChainPort, PeeringPort, DirectoryPort, ForgePort, ...  │
//! └──────────────────────────────────────────────────────────────────┘
//!                            ↑ implements ↑
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  services/ contracts and the tm-01 / tm-02 / tm-03 port traits   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod memory;
pub mod ports;

pub use memory::MemoryServiceFactory;
pub use ports::*;
