use hashbrown::HashMap;
use strata_blocks::codec::{self, CodecError};
use strata_blocks::light::LightColor;
use strata_blocks::rotation::BlockRotation;
use strata_blocks::rules::{AccessError, VoxelAccess};
use strata_blocks::{BlockRegistry, DynamicGeometry};
use strata_geom::{Aabb, Vec3};

use crate::chunk::Chunk;
use crate::coords::{ChunkCoord, WorldParams};
use crate::payload::{ChunkPayload, PayloadError};

/// Resident chunks plus world-coordinate access across them. Reads of
/// voxels in missing chunks return zero; writes there are dropped.
#[derive(Debug, Default)]
pub struct ChunkStore {
    params: WorldParams,
    chunks: HashMap<ChunkCoord, Chunk>,
}

impl ChunkStore {
    pub fn new(params: WorldParams) -> Self {
        Self {
            params,
            chunks: HashMap::new(),
        }
    }

    #[inline]
    pub fn params(&self) -> &WorldParams {
        &self.params
    }

    /// New world shape; every resident chunk is dropped.
    pub fn reset(&mut self, params: WorldParams) {
        self.params = params;
        self.chunks.clear();
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[inline]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    #[inline]
    pub fn get(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    #[inline]
    pub fn get_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord)
    }

    pub fn is_ready(&self, coord: ChunkCoord) -> bool {
        self.get(coord).is_some_and(Chunk::is_ready)
    }

    pub fn coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.chunks.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    #[inline]
    pub fn is_within_world(&self, coord: ChunkCoord) -> bool {
        self.params.contains_chunk(coord)
    }

    #[inline]
    pub fn coord_of(&self, vx: i32, vz: i32) -> ChunkCoord {
        ChunkCoord::from_voxel(vx, vz, self.params.chunk_size)
    }

    #[inline]
    pub fn chunk_at(&self, vx: i32, vz: i32) -> Option<&Chunk> {
        self.chunks.get(&self.coord_of(vx, vz))
    }

    #[inline]
    pub fn chunk_at_mut(&mut self, vx: i32, vz: i32) -> Option<&mut Chunk> {
        let coord = self.coord_of(vx, vz);
        self.chunks.get_mut(&coord)
    }

    fn ready_chunk_at(&self, vx: i32, vz: i32) -> Option<&Chunk> {
        self.chunk_at(vx, vz).filter(|c| c.is_ready())
    }

    /// Creates the chunk on first sight and copies the payload buffers in.
    /// A chunk created for a payload that then fails to apply is discarded.
    pub fn apply_payload(&mut self, payload: &ChunkPayload) -> Result<ChunkCoord, PayloadError> {
        let coord = payload.coord();
        if !self.is_within_world(coord) {
            log::debug!("payload for chunk {} is outside the world", coord);
            return Err(PayloadError::OutsideWorld(coord));
        }
        let created = !self.chunks.contains_key(&coord);
        if created {
            let chunk = Chunk::new(payload.id.clone(), coord, &self.params)?;
            self.chunks.insert(coord, chunk);
        }
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return Err(PayloadError::OutsideWorld(coord));
        };
        if let Err(e) = chunk.set_data(payload) {
            if created {
                self.chunks.remove(&coord);
            }
            log::debug!("payload for chunk {} rejected: {}", coord, e);
            return Err(e);
        }
        log::trace!("chunk {} ready={}", coord, chunk.is_ready());
        Ok(coord)
    }

    /// Removes and disposes a chunk.
    pub fn remove(&mut self, coord: ChunkCoord) -> Option<Chunk> {
        let mut chunk = self.chunks.remove(&coord)?;
        chunk.dispose();
        Some(chunk)
    }

    // --- world-level accessors ---

    pub fn get_raw_value(&self, vx: i32, vy: i32, vz: i32) -> u32 {
        self.chunk_at(vx, vz).map_or(0, |c| c.get_raw_value(vx, vy, vz))
    }

    pub fn set_raw_value(&mut self, vx: i32, vy: i32, vz: i32, value: u32) -> bool {
        self.chunk_at_mut(vx, vz)
            .is_some_and(|c| c.set_raw_value(vx, vy, vz, value))
    }

    pub fn get_raw_light(&self, vx: i32, vy: i32, vz: i32) -> u32 {
        self.chunk_at(vx, vz).map_or(0, |c| c.get_raw_light(vx, vy, vz))
    }

    pub fn set_raw_light(&mut self, vx: i32, vy: i32, vz: i32, value: u32) -> bool {
        self.chunk_at_mut(vx, vz)
            .is_some_and(|c| c.set_raw_light(vx, vy, vz, value))
    }

    pub fn get_voxel(&self, vx: i32, vy: i32, vz: i32) -> u32 {
        codec::extract_id(self.get_raw_value(vx, vy, vz))
    }

    pub fn set_voxel(&mut self, vx: i32, vy: i32, vz: i32, id: u32) -> bool {
        self.chunk_at_mut(vx, vz)
            .is_some_and(|c| c.set_voxel(vx, vy, vz, id))
    }

    pub fn get_voxel_rotation(&self, vx: i32, vy: i32, vz: i32) -> BlockRotation {
        codec::extract_rotation(self.get_raw_value(vx, vy, vz))
    }

    pub fn set_voxel_rotation(&mut self, vx: i32, vy: i32, vz: i32, rotation: BlockRotation) -> bool {
        self.chunk_at_mut(vx, vz)
            .is_some_and(|c| c.set_voxel_rotation(vx, vy, vz, rotation))
    }

    pub fn get_voxel_stage(&self, vx: i32, vy: i32, vz: i32) -> u32 {
        codec::extract_stage(self.get_raw_value(vx, vy, vz))
    }

    pub fn set_voxel_stage(&mut self, vx: i32, vy: i32, vz: i32, stage: u32) -> Result<bool, CodecError> {
        match self.chunk_at_mut(vx, vz) {
            Some(c) => c.set_voxel_stage(vx, vy, vz, stage),
            None => {
                // Still validate so callers see the same error either way.
                codec::insert_stage(0, stage)?;
                Ok(false)
            }
        }
    }

    pub fn get_light(&self, vx: i32, vy: i32, vz: i32, color: LightColor) -> u32 {
        self.chunk_at(vx, vz).map_or(0, |c| c.get_light(vx, vy, vz, color))
    }

    pub fn set_light(&mut self, vx: i32, vy: i32, vz: i32, color: LightColor, level: u32) -> bool {
        self.chunk_at_mut(vx, vz)
            .is_some_and(|c| c.set_light(vx, vy, vz, color, level))
    }

    pub fn get_sunlight(&self, vx: i32, vy: i32, vz: i32) -> u32 {
        self.get_light(vx, vy, vz, LightColor::Sunlight)
    }

    pub fn set_sunlight(&mut self, vx: i32, vy: i32, vz: i32, level: u32) -> bool {
        self.set_light(vx, vy, vz, LightColor::Sunlight, level)
    }

    pub fn get_torch_light(&self, vx: i32, vy: i32, vz: i32, color: LightColor) -> u32 {
        self.get_light(vx, vy, vz, color)
    }

    pub fn set_torch_light(&mut self, vx: i32, vy: i32, vz: i32, color: LightColor, level: u32) -> bool {
        self.set_light(vx, vy, vz, color, level)
    }

    /// Highest y in the column holding a non-empty block.
    pub fn max_height_at(&self, registry: &BlockRegistry, vx: i32, vz: i32) -> Option<i32> {
        let chunk = self.ready_chunk_at(vx, vz)?;
        (0..self.params.max_height as i32).rev().find(|&vy| {
            let id = chunk.get_voxel(vx, vy, vz);
            registry.get(id).is_some_and(|b| !b.is_empty)
        })
    }

    // --- physics surface ---

    /// Geometry the block at this voxel presents, with conditional parts
    /// resolved against the neighboring voxels.
    pub fn dynamic_geometry_at<'r>(
        &self,
        registry: &'r BlockRegistry,
        vx: i32,
        vy: i32,
        vz: i32,
    ) -> Option<DynamicGeometry<'r>> {
        let chunk = self.ready_chunk_at(vx, vz)?;
        let word = chunk.get_raw_value(vx, vy, vz);
        let block = registry.get(codec::extract_id(word))?;
        let rotation = codec::extract_rotation(word);
        Some(block.dynamic_geometry_at([vx, vy, vz], rotation, self, Some(registry.rules())))
    }

    /// World-space collision boxes at a voxel. Empty for passable or fluid
    /// blocks, unknown ids, and chunks that are not ready.
    pub fn voxel_aabbs_at(&self, registry: &BlockRegistry, vx: i32, vy: i32, vz: i32) -> Vec<Aabb> {
        let Some(chunk) = self.ready_chunk_at(vx, vz) else {
            return Vec::new();
        };
        let word = chunk.get_raw_value(vx, vy, vz);
        let Some(block) = registry.get(codec::extract_id(word)) else {
            return Vec::new();
        };
        if block.is_passable || block.is_fluid {
            return Vec::new();
        }
        let rotation = codec::extract_rotation(word);
        let local = if block.is_dynamic() {
            block
                .dynamic_geometry_at([vx, vy, vz], rotation, self, Some(registry.rules()))
                .aabbs
        } else {
            block.aabbs.clone()
        };
        let origin = Vec3::from((vx, vy, vz));
        local
            .iter()
            .map(|b| rotation.rotate_aabb(b, true, true).translate(origin))
            .collect()
    }

    pub fn is_fluid_at(&self, registry: &BlockRegistry, vx: i32, vy: i32, vz: i32) -> bool {
        self.ready_chunk_at(vx, vz)
            .and_then(|c| registry.get(c.get_voxel(vx, vy, vz)))
            .is_some_and(|b| b.is_fluid)
    }
}

impl VoxelAccess for ChunkStore {
    fn voxel_id(&self, vx: i32, vy: i32, vz: i32) -> Result<u32, AccessError> {
        Ok(self.get_voxel(vx, vy, vz))
    }

    fn voxel_rotation(&self, vx: i32, vy: i32, vz: i32) -> Result<BlockRotation, AccessError> {
        Ok(self.get_voxel_rotation(vx, vy, vz))
    }

    fn voxel_stage(&self, vx: i32, vy: i32, vz: i32) -> Result<u32, AccessError> {
        Ok(self.get_voxel_stage(vx, vy, vz))
    }
}
