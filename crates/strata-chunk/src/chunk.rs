use strata_blocks::codec::{self, CodecError};
use strata_blocks::light::{self, LightColor};
use strata_blocks::rotation::BlockRotation;

use crate::coords::{ChunkCoord, WorldParams};
use crate::payload::{ChunkPayload, PayloadError, decode_words};

/// Dense voxel and light storage for one chunk column.
#[derive(Clone, Debug)]
pub struct Chunk {
    pub coord: ChunkCoord,
    pub id: String,
    size: usize,
    max_height: usize,
    sub_chunks: usize,
    min: [i32; 3],
    max: [i32; 3],
    voxels: Vec<u32>,
    lights: Vec<u32>,
    voxels_loaded: bool,
    lights_loaded: bool,
    opaque_meshed: Vec<bool>,
    transparent_meshed: Vec<bool>,
    dirty: bool,
}

impl Chunk {
    /// Fails when the chunk's voxels are not addressable with i32.
    pub fn new(id: impl Into<String>, coord: ChunkCoord, params: &WorldParams) -> Result<Self, PayloadError> {
        let size = params.chunk_size;
        let max_height = params.max_height;
        let (x0, z0) = coord
            .checked_min_voxel(size)
            .ok_or(PayloadError::OutsideWorld(coord))?;
        let volume = params.chunk_volume();
        Ok(Self {
            coord,
            id: id.into(),
            size,
            max_height,
            sub_chunks: params.sub_chunks.max(1),
            min: [x0, 0, z0],
            max: [x0 + size as i32, max_height as i32, z0 + size as i32],
            voxels: vec![0; volume],
            lights: vec![0; volume],
            voxels_loaded: false,
            lights_loaded: false,
            opaque_meshed: vec![false; params.sub_chunks.max(1)],
            transparent_meshed: vec![false; params.sub_chunks.max(1)],
            dirty: false,
        })
    }

    /// Minimum world voxel corner (inclusive).
    #[inline]
    pub fn min(&self) -> [i32; 3] {
        self.min
    }

    /// Maximum world voxel corner (exclusive).
    #[inline]
    pub fn max(&self) -> [i32; 3] {
        self.max
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn max_height(&self) -> usize {
        self.max_height
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        (x * self.max_height + y) * self.size + z
    }

    #[inline]
    pub fn contains(&self, vx: i32, vy: i32, vz: i32) -> bool {
        vx >= self.min[0]
            && vx < self.max[0]
            && vy >= self.min[1]
            && vy < self.max[1]
            && vz >= self.min[2]
            && vz < self.max[2]
    }

    /// World voxel to buffer index, if inside this chunk.
    #[inline]
    fn index_of(&self, vx: i32, vy: i32, vz: i32) -> Option<usize> {
        if !self.contains(vx, vy, vz) || self.voxels.is_empty() {
            return None;
        }
        let lx = (vx - self.min[0]) as usize;
        let ly = (vy - self.min[1]) as usize;
        let lz = (vz - self.min[2]) as usize;
        Some(self.idx(lx, ly, lz))
    }

    /// Local coordinates of a world voxel inside this chunk.
    pub fn to_local(&self, vx: i32, vy: i32, vz: i32) -> Option<(usize, usize, usize)> {
        if !self.contains(vx, vy, vz) {
            return None;
        }
        Some((
            (vx - self.min[0]) as usize,
            (vy - self.min[1]) as usize,
            (vz - self.min[2]) as usize,
        ))
    }

    // --- raw words ---

    #[inline]
    pub fn get_raw_value(&self, vx: i32, vy: i32, vz: i32) -> u32 {
        self.index_of(vx, vy, vz).map_or(0, |i| self.voxels[i])
    }

    /// Returns false when the voxel lies outside this chunk.
    pub fn set_raw_value(&mut self, vx: i32, vy: i32, vz: i32, value: u32) -> bool {
        match self.index_of(vx, vy, vz) {
            Some(i) => {
                self.voxels[i] = value;
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn get_raw_light(&self, vx: i32, vy: i32, vz: i32) -> u32 {
        self.index_of(vx, vy, vz).map_or(0, |i| self.lights[i])
    }

    pub fn set_raw_light(&mut self, vx: i32, vy: i32, vz: i32, value: u32) -> bool {
        match self.index_of(vx, vy, vz) {
            Some(i) => {
                self.lights[i] = value;
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    // --- voxel fields ---

    pub fn get_voxel(&self, vx: i32, vy: i32, vz: i32) -> u32 {
        codec::extract_id(self.get_raw_value(vx, vy, vz))
    }

    /// Writes a fresh word carrying only `id`; rotation and stage reset.
    pub fn set_voxel(&mut self, vx: i32, vy: i32, vz: i32, id: u32) -> bool {
        self.set_raw_value(vx, vy, vz, codec::insert_id(0, id))
    }

    pub fn get_voxel_rotation(&self, vx: i32, vy: i32, vz: i32) -> BlockRotation {
        codec::extract_rotation(self.get_raw_value(vx, vy, vz))
    }

    pub fn set_voxel_rotation(&mut self, vx: i32, vy: i32, vz: i32, rotation: BlockRotation) -> bool {
        let word = codec::insert_rotation(self.get_raw_value(vx, vy, vz), rotation);
        self.set_raw_value(vx, vy, vz, word)
    }

    pub fn get_voxel_stage(&self, vx: i32, vy: i32, vz: i32) -> u32 {
        codec::extract_stage(self.get_raw_value(vx, vy, vz))
    }

    pub fn set_voxel_stage(&mut self, vx: i32, vy: i32, vz: i32, stage: u32) -> Result<bool, CodecError> {
        let word = codec::insert_stage(self.get_raw_value(vx, vy, vz), stage)?;
        Ok(self.set_raw_value(vx, vy, vz, word))
    }

    // --- light fields ---

    pub fn get_light(&self, vx: i32, vy: i32, vz: i32, color: LightColor) -> u32 {
        light::extract_light(self.get_raw_light(vx, vy, vz), color)
    }

    pub fn set_light(&mut self, vx: i32, vy: i32, vz: i32, color: LightColor, level: u32) -> bool {
        let word = light::insert_light(self.get_raw_light(vx, vy, vz), color, level);
        self.set_raw_light(vx, vy, vz, word)
    }

    pub fn get_sunlight(&self, vx: i32, vy: i32, vz: i32) -> u32 {
        self.get_light(vx, vy, vz, LightColor::Sunlight)
    }

    pub fn set_sunlight(&mut self, vx: i32, vy: i32, vz: i32, level: u32) -> bool {
        self.set_light(vx, vy, vz, LightColor::Sunlight, level)
    }

    /// Torch channels only; asking for sunlight here reads the sunlight channel.
    pub fn get_torch_light(&self, vx: i32, vy: i32, vz: i32, color: LightColor) -> u32 {
        self.get_light(vx, vy, vz, color)
    }

    pub fn set_torch_light(&mut self, vx: i32, vy: i32, vz: i32, color: LightColor, level: u32) -> bool {
        self.set_light(vx, vy, vz, color, level)
    }

    // --- payload / lifecycle ---

    /// Replaces the buffers carried by `payload`. Empty buffers are ignored.
    pub fn set_data(&mut self, payload: &ChunkPayload) -> Result<(), PayloadError> {
        if payload.id != self.id {
            return Err(PayloadError::IdMismatch {
                expected: self.id.clone(),
                found: payload.id.clone(),
            });
        }
        if payload.coord() != self.coord {
            return Err(PayloadError::CoordMismatch {
                expected: self.coord,
                found: payload.coord(),
            });
        }
        for mesh in &payload.meshes {
            if mesh.level >= self.sub_chunks {
                return Err(PayloadError::LevelOutOfRange {
                    level: mesh.level,
                    sub_chunks: self.sub_chunks,
                });
            }
        }

        let volume = self.size * self.max_height * self.size;
        // Decode both before touching state so a bad payload changes nothing.
        let voxels = match payload.voxels.as_deref() {
            Some(b) if !b.is_empty() => Some(decode_words("voxel", b, volume)?),
            _ => None,
        };
        let lights = match payload.lights.as_deref() {
            Some(b) if !b.is_empty() => Some(decode_words("light", b, volume)?),
            _ => None,
        };
        if let Some(v) = voxels {
            self.voxels = v;
            self.voxels_loaded = true;
        }
        if let Some(l) = lights {
            self.lights = l;
            self.lights_loaded = true;
        }
        self.dirty = true;
        Ok(())
    }

    /// Both buffers have arrived at least once.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.voxels_loaded && self.lights_loaded
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    #[inline]
    pub fn sub_chunks(&self) -> usize {
        self.sub_chunks
    }

    pub fn mark_meshed(&mut self, level: usize, transparent: bool) {
        if level >= self.sub_chunks {
            return;
        }
        if transparent {
            self.transparent_meshed[level] = true;
        } else {
            self.opaque_meshed[level] = true;
        }
    }

    pub fn is_level_meshed(&self, level: usize, transparent: bool) -> bool {
        let flags = if transparent {
            &self.transparent_meshed
        } else {
            &self.opaque_meshed
        };
        flags.get(level).copied().unwrap_or(false)
    }

    /// Any sub-chunk has received geometry.
    pub fn has_mesh(&self) -> bool {
        self.opaque_meshed.iter().chain(&self.transparent_meshed).any(|m| *m)
    }

    #[inline]
    pub fn voxels(&self) -> &[u32] {
        &self.voxels
    }

    #[inline]
    pub fn lights(&self) -> &[u32] {
        &self.lights
    }

    /// Frees the buffers; the chunk is no longer ready afterwards.
    pub fn dispose(&mut self) {
        self.voxels = Vec::new();
        self.lights = Vec::new();
        self.voxels_loaded = false;
        self.lights_loaded = false;
        self.opaque_meshed.iter_mut().for_each(|m| *m = false);
        self.transparent_meshed.iter_mut().for_each(|m| *m = false);
    }
}
