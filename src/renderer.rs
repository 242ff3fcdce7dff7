use hashbrown::HashSet;
use strata_chunk::{Chunk, ChunkCoord, MeshLevel};
use strata_runtime::ChunkRenderer;
use strata_runtime::host::RenderError;

/// Headless renderer that only tracks what would be on screen.
#[derive(Debug, Default)]
pub struct CountingRenderer {
    pub levels_built: u64,
    pub geometries: u64,
    pub attached: u64,
    pub disposed: u64,
    visible: HashSet<ChunkCoord>,
}

impl CountingRenderer {
    pub fn visible(&self) -> usize {
        self.visible.len()
    }
}

impl ChunkRenderer for CountingRenderer {
    fn build_mesh(&mut self, chunk: &Chunk, level: &MeshLevel) -> Result<(), RenderError> {
        if level.level >= chunk.sub_chunks() {
            return Err(format!("level {} out of range for {}", level.level, chunk.coord).into());
        }
        self.levels_built += 1;
        self.geometries += level.geometries.len() as u64;
        Ok(())
    }

    fn attach(&mut self, coord: ChunkCoord) {
        self.attached += 1;
        self.visible.insert(coord);
    }

    fn dispose(&mut self, coord: ChunkCoord) {
        self.disposed += 1;
        self.visible.remove(&coord);
    }
}
