use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coords::ChunkCoord;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload id {found:?} does not match chunk id {expected:?}")]
    IdMismatch { expected: String, found: String },
    #[error("payload coordinate {found} does not match chunk {expected}")]
    CoordMismatch {
        expected: ChunkCoord,
        found: ChunkCoord,
    },
    #[error("{what} buffer holds {found} bytes, expected {expected}")]
    BadLength {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("chunk {0} is outside the world")]
    OutsideWorld(ChunkCoord),
    #[error("mesh level {level} is outside 0..{sub_chunks}")]
    LevelOutOfRange { level: usize, sub_chunks: usize },
}

/// Server-built geometry for one block face group inside a sub-chunk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryData {
    pub voxel: u32,
    #[serde(default)]
    pub face_name: Option<String>,
    #[serde(default)]
    pub positions: Vec<f32>,
    #[serde(default)]
    pub uvs: Vec<f32>,
    #[serde(default)]
    pub indices: Vec<u32>,
    #[serde(default)]
    pub lights: Vec<u32>,
}

/// Geometry of one vertical sub-chunk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshLevel {
    pub level: usize,
    #[serde(default)]
    pub geometries: Vec<GeometryData>,
}

/// One chunk as delivered by a LOAD or UPDATE packet. Buffers are packed
/// little-endian u32 arrays; a missing or empty buffer leaves the chunk's
/// current contents alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub x: i32,
    pub z: i32,
    pub id: String,
    #[serde(default)]
    pub voxels: Option<Vec<u8>>,
    #[serde(default)]
    pub lights: Option<Vec<u8>>,
    #[serde(default)]
    pub meshes: Vec<MeshLevel>,
}

impl ChunkPayload {
    #[inline]
    pub fn coord(&self) -> ChunkCoord {
        ChunkCoord::new(self.x, self.z)
    }

    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            x: coord.cx,
            z: coord.cz,
            id: coord.name(),
            ..Self::default()
        }
    }

    pub fn with_buffers(mut self, voxels: &[u32], lights: &[u32]) -> Self {
        self.voxels = Some(encode_words(voxels));
        self.lights = Some(encode_words(lights));
        self
    }
}

pub fn encode_words(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Decodes `bytes` into exactly `expected` words.
pub fn decode_words(
    what: &'static str,
    bytes: &[u8],
    expected: usize,
) -> Result<Vec<u32>, PayloadError> {
    if bytes.len() != expected * 4 {
        return Err(PayloadError::BadLength {
            what,
            expected: expected * 4,
            found: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
