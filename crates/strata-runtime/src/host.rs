use std::error::Error;

use strata_chunk::{Chunk, ChunkCoord, MeshLevel};

pub type RenderError = Box<dyn Error + Send + Sync>;

/// Scene side of chunk streaming. Geometry arrives per sub-chunk level;
/// `attach` happens once the chunk is ready, `dispose` when it is evicted.
pub trait ChunkRenderer {
    fn build_mesh(&mut self, chunk: &Chunk, level: &MeshLevel) -> Result<(), RenderError>;
    fn attach(&mut self, coord: ChunkCoord);
    fn dispose(&mut self, coord: ChunkCoord);
}

/// Accepts everything and draws nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderer;

impl ChunkRenderer for NullRenderer {
    fn build_mesh(&mut self, _chunk: &Chunk, _level: &MeshLevel) -> Result<(), RenderError> {
        Ok(())
    }

    fn attach(&mut self, _coord: ChunkCoord) {}

    fn dispose(&mut self, _coord: ChunkCoord) {}
}

impl<R: ChunkRenderer + ?Sized> ChunkRenderer for &mut R {
    fn build_mesh(&mut self, chunk: &Chunk, level: &MeshLevel) -> Result<(), RenderError> {
        (**self).build_mesh(chunk, level)
    }

    fn attach(&mut self, coord: ChunkCoord) {
        (**self).attach(coord)
    }

    fn dispose(&mut self, coord: ChunkCoord) {
        (**self).dispose(coord)
    }
}
