use std::sync::Arc;

use tm_03_block_generation::{GenerationHandle, GenerationLoop};

use crate::adapters::ports::{BroadcastPort, ForgePort};
use crate::container::NodeContext;

/// Start the block generation loop of a participating node.
#[must_use]
pub fn start_generation(context: &NodeContext) -> GenerationHandle {
    GenerationLoop::new(
        Arc::new(ForgePort::new(Arc::clone(&context.services.blockchain))),
        Arc::new(BroadcastPort::new(Arc::clone(&context.multicaster))),
        context.self_target(),
        context.config.generation.clone(),
    )
    .spawn()
}
