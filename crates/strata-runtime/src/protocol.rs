use serde::{Deserialize, Serialize};
use strata_blocks::config::BlocksConfig;
use strata_chunk::{ChunkCoord, ChunkPayload, WorldParams};

/// An authoritative voxel write. `light` is left alone when absent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoxelUpdate {
    pub vx: i32,
    pub vy: i32,
    pub vz: i32,
    pub voxel: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ServerMessage {
    Init {
        params: WorldParams,
        #[serde(flatten)]
        registry: BlocksConfig,
    },
    Load {
        #[serde(default)]
        chunks: Vec<ChunkPayload>,
    },
    Update {
        #[serde(default)]
        updates: Vec<VoxelUpdate>,
        #[serde(default)]
        chunks: Vec<ChunkPayload>,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadRequest {
    pub center: ChunkCoord,
    pub chunks: Vec<ChunkCoord>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnloadRequest {
    pub chunks: Vec<ChunkCoord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ClientMessage {
    Load { json: LoadRequest },
    Update { updates: Vec<VoxelUpdate> },
    Unload { json: UnloadRequest },
}

impl ServerMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

impl ClientMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Load { .. } => "LOAD",
            ClientMessage::Update { .. } => "UPDATE",
            ClientMessage::Unload { .. } => "UNLOAD",
        }
    }
}
