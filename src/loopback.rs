use std::error::Error;

use hashbrown::HashMap;
use strata_blocks::Light;
use strata_blocks::codec;
use strata_blocks::config::BlocksConfig;
use strata_chunk::{ChunkCoord, ChunkPayload, GeometryData, MeshLevel, WorldParams};
use strata_runtime::{ClientMessage, JobPool, ServerMessage, VoxelUpdate};

#[derive(Clone, Copy, Debug)]
struct Palette {
    stone: u32,
    dirt: u32,
    grass: u32,
}

impl Palette {
    fn from_config(cfg: &BlocksConfig) -> Self {
        let find = |name: &str, fallback: u32| {
            cfg.blocks
                .iter()
                .find(|b| b.name.eq_ignore_ascii_case(name))
                .map_or(fallback, |b| b.id)
        };
        let stone = find("stone", 1);
        Self {
            stone,
            dirt: find("dirt", stone),
            grass: find("grass block", stone),
        }
    }
}

/// In-process stand-in for the chunk server. Columns are generated on the
/// job pool and come back as LOAD batches in whatever order they finish.
pub struct Loopback {
    params: WorldParams,
    blocks: BlocksConfig,
    palette: Palette,
    surface: usize,
    pool: JobPool<ChunkPayload>,
    // Accepted edits, replayed into columns built later
    edits: HashMap<ChunkCoord, Vec<VoxelUpdate>>,
    pub loads_served: u64,
    pub unloads_seen: u64,
}

impl Loopback {
    pub fn new(
        params: WorldParams,
        blocks: BlocksConfig,
        surface: usize,
        workers: usize,
    ) -> Result<Self, Box<dyn Error>> {
        let palette = Palette::from_config(&blocks);
        Ok(Self {
            params,
            blocks,
            palette,
            surface: surface.clamp(1, params.max_height.max(1)),
            pool: JobPool::new("strata-loopback", workers)?,
            edits: HashMap::new(),
            loads_served: 0,
            unloads_seen: 0,
        })
    }

    pub fn init_message(&self) -> ServerMessage {
        ServerMessage::Init {
            params: self.params,
            registry: self.blocks.clone(),
        }
    }

    /// Reacts to one client message; replies that are ready immediately are
    /// returned, column builds arrive later through `poll`.
    pub fn handle(&mut self, msg: ClientMessage) -> Vec<ServerMessage> {
        match msg {
            ClientMessage::Load { json } => {
                for coord in json.chunks {
                    self.submit_column(coord);
                }
                Vec::new()
            }
            ClientMessage::Update { updates } => {
                let size = self.params.chunk_size;
                for u in &updates {
                    let coord = ChunkCoord::from_voxel(u.vx, u.vz, size);
                    self.edits.entry(coord).or_default().push(*u);
                }
                vec![ServerMessage::Update {
                    updates,
                    chunks: Vec::new(),
                }]
            }
            ClientMessage::Unload { json } => {
                self.unloads_seen += json.chunks.len() as u64;
                log::debug!("loopback: client dropped {} chunks", json.chunks.len());
                Vec::new()
            }
        }
    }

    /// Finished columns as one LOAD, if any are done.
    pub fn poll(&mut self) -> Option<ServerMessage> {
        let done = self.pool.drain();
        if done.is_empty() {
            return None;
        }
        self.loads_served += done.len() as u64;
        let chunks = done.into_iter().map(|(_, payload)| payload).collect();
        Some(ServerMessage::Load { chunks })
    }

    pub fn inflight(&self) -> usize {
        self.pool.inflight()
    }

    fn submit_column(&self, coord: ChunkCoord) {
        let params = self.params;
        let palette = self.palette;
        let surface = self.surface;
        let edits = self.edits.get(&coord).cloned().unwrap_or_default();
        self.pool
            .submit(move || build_column(&params, coord, surface, palette, &edits));
    }
}

/// Terrain height for a column, a gentle deterministic wobble around `surface`.
fn column_height(vx: i32, vz: i32, surface: usize, max_height: usize) -> usize {
    let wobble = (vx.wrapping_mul(7) ^ vz.wrapping_mul(13)).rem_euclid(3) as usize;
    (surface + wobble).min(max_height)
}

fn build_column(
    params: &WorldParams,
    coord: ChunkCoord,
    surface: usize,
    palette: Palette,
    edits: &[VoxelUpdate],
) -> ChunkPayload {
    let size = params.chunk_size;
    let height = params.max_height;
    let volume = params.chunk_volume();
    let mut voxels = vec![0u32; volume];
    let mut lights = vec![0u32; volume];
    let sky = Light {
        sunlight: params.max_light_level.min(15),
        ..Light::default()
    }
    .pack();
    let (x0, z0) = coord.min_voxel(size);
    let idx = |x: usize, y: usize, z: usize| (x * height + y) * size + z;

    let mut top = 0;
    for x in 0..size {
        for z in 0..size {
            let h = column_height(x0 + x as i32, z0 + z as i32, surface, height);
            top = top.max(h);
            for y in 0..height {
                let id = match y {
                    y if y + 1 == h => palette.grass,
                    y if y + 4 >= h && y < h => palette.dirt,
                    y if y < h => palette.stone,
                    _ => 0,
                };
                voxels[idx(x, y, z)] = codec::insert_id(0, id);
                if y >= h {
                    lights[idx(x, y, z)] = sky;
                }
            }
        }
    }
    for u in edits {
        if u.vy < 0 || u.vy as usize >= height {
            continue;
        }
        let (lx, lz) = ((u.vx - x0) as usize, (u.vz - z0) as usize);
        if lx < size && lz < size {
            voxels[idx(lx, u.vy as usize, lz)] = u.voxel;
        }
    }

    // One geometry group per sub-chunk holding the surface.
    let sub_height = params.sub_chunk_height();
    let sub_chunks = params.sub_chunks.max(1);
    let meshes = (0..sub_chunks)
        .filter(|level| {
            let lo = level * sub_height;
            lo < top && top.saturating_sub(4) < lo + sub_height
        })
        .map(|level| MeshLevel {
            level,
            geometries: vec![GeometryData {
                voxel: palette.grass,
                face_name: Some("py".to_string()),
                ..GeometryData::default()
            }],
        })
        .collect();

    ChunkPayload {
        meshes,
        ..ChunkPayload::new(coord).with_buffers(&voxels, &lights)
    }
}
