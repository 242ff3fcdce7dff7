//! Client-side chunk storage: dense voxel/light buffers, payload decoding, and world-level access.
#![forbid(unsafe_code)]

mod chunk;
mod coords;
mod payload;
mod store;

pub use chunk::Chunk;
pub use coords::{ChunkCoord, ParamsError, WorldParams};
pub use payload::{ChunkPayload, GeometryData, MeshLevel, PayloadError, decode_words, encode_words};
pub use store::ChunkStore;
