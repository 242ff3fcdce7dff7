use strata_chunk::Chunk;

/// A voxel word that changed on the client, from a server UPDATE or a
/// flushed local edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockUpdate {
    pub voxel: (i32, i32, i32),
    pub old_value: u32,
    pub new_value: u32,
}

/// Runs once, the first time a payload for the chunk is applied.
pub type ChunkInitListener = Box<dyn FnOnce(&Chunk)>;

pub type BlockUpdateListener = Box<dyn FnMut(&BlockUpdate)>;
