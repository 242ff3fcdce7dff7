use core::fmt;

use serde::{Deserialize, Serialize};
use strata_geom::Vec2;
use thiserror::Error;

/// Horizontal chunk coordinate; chunks span the full world height.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx.saturating_add(dx),
            cz: self.cz.saturating_add(dz),
        }
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.cx) - i64::from(other.cx);
        let dz = i64::from(self.cz) - i64::from(other.cz);
        dx * dx + dz * dz
    }

    /// Chunk containing world voxel column (vx, vz).
    #[inline]
    pub fn from_voxel(vx: i32, vz: i32, chunk_size: usize) -> Self {
        let s = chunk_size.clamp(1, i32::MAX as usize) as i32;
        Self::new(vx.div_euclid(s), vz.div_euclid(s))
    }

    /// Chunk containing a continuous world position.
    pub fn from_position(x: f64, z: f64, chunk_size: usize) -> Self {
        Self::from_voxel(x.floor() as i32, z.floor() as i32, chunk_size)
    }

    #[inline]
    pub fn min_voxel(self, chunk_size: usize) -> (i32, i32) {
        let s = chunk_size as i32;
        (self.cx * s, self.cz * s)
    }

    /// Minimum voxel corner, or `None` when the chunk's footprint does not
    /// fit in i32 voxel space.
    pub fn checked_min_voxel(self, chunk_size: usize) -> Option<(i32, i32)> {
        let s = i32::try_from(chunk_size).ok()?;
        let x0 = self.cx.checked_mul(s)?;
        let z0 = self.cz.checked_mul(s)?;
        x0.checked_add(s)?;
        z0.checked_add(s)?;
        Some((x0, z0))
    }

    /// World-space center of the chunk footprint.
    pub fn center(self, chunk_size: usize) -> Vec2 {
        let s = chunk_size as f64;
        Vec2::new((f64::from(self.cx) + 0.5) * s, (f64::from(self.cz) + 0.5) * s)
    }

    /// `"cx|cz"`, the name used on the wire and in logs.
    pub fn name(self) -> String {
        format!("{}|{}", self.cx, self.cz)
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.cx, self.cz)
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<[i32; 2]> for ChunkCoord {
    fn from(value: [i32; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<ChunkCoord> for [i32; 2] {
    fn from(c: ChunkCoord) -> Self {
        [c.cx, c.cz]
    }
}

fn default_chunk_size() -> usize {
    16
}
fn default_max_height() -> usize {
    256
}
fn default_sub_chunks() -> usize {
    8
}
fn default_max_light_level() -> u32 {
    15
}
fn default_min_chunk() -> [i32; 2] {
    [i32::MIN / 2, i32::MIN / 2]
}
fn default_max_chunk() -> [i32; 2] {
    [i32::MAX / 2, i32::MAX / 2]
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamsError {
    #[error("{0} must be positive")]
    Zero(&'static str),
    #[error("{what} {value} is too large")]
    TooLarge { what: &'static str, value: usize },
    #[error("chunk volume {size}x{height}x{size} overflows")]
    VolumeOverflow { size: usize, height: usize },
    #[error("world bounds {min:?}..={max:?} are empty")]
    EmptyBounds { min: [i32; 2], max: [i32; 2] },
}

/// World shape announced by the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldParams {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_max_height")]
    pub max_height: usize,
    #[serde(default = "default_sub_chunks")]
    pub sub_chunks: usize,
    #[serde(default = "default_max_light_level")]
    pub max_light_level: u32,
    #[serde(default = "default_min_chunk")]
    pub min_chunk: [i32; 2],
    #[serde(default = "default_max_chunk")]
    pub max_chunk: [i32; 2],
}

impl Default for WorldParams {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_height: default_max_height(),
            sub_chunks: default_sub_chunks(),
            max_light_level: default_max_light_level(),
            min_chunk: default_min_chunk(),
            max_chunk: default_max_chunk(),
        }
    }
}

impl WorldParams {
    /// Rejects shapes no chunk buffer can be built for.
    pub fn validate(&self) -> Result<(), ParamsError> {
        for (what, value) in [
            ("chunk_size", self.chunk_size),
            ("max_height", self.max_height),
            ("sub_chunks", self.sub_chunks),
        ] {
            if value == 0 {
                return Err(ParamsError::Zero(what));
            }
            if i32::try_from(value).is_err() {
                return Err(ParamsError::TooLarge { what, value });
            }
        }
        if self.sub_chunks > self.max_height {
            return Err(ParamsError::TooLarge {
                what: "sub_chunks",
                value: self.sub_chunks,
            });
        }
        self.chunk_size
            .checked_mul(self.max_height)
            .and_then(|v| v.checked_mul(self.chunk_size))
            .and_then(|v| v.checked_mul(4))
            .ok_or(ParamsError::VolumeOverflow {
                size: self.chunk_size,
                height: self.max_height,
            })?;
        if self.min_chunk[0] > self.max_chunk[0] || self.min_chunk[1] > self.max_chunk[1] {
            return Err(ParamsError::EmptyBounds {
                min: self.min_chunk,
                max: self.max_chunk,
            });
        }
        Ok(())
    }

    /// Largest chunk index whose voxels are addressable with i32.
    #[inline]
    pub fn chunk_limit(&self) -> i32 {
        let s = i32::try_from(self.chunk_size.max(1)).unwrap_or(i32::MAX);
        i32::MAX / s - 1
    }

    /// Inclusive world bounds check in chunk space, clipped to the
    /// addressable voxel range.
    #[inline]
    pub fn contains_chunk(&self, coord: ChunkCoord) -> bool {
        let limit = self.chunk_limit();
        coord.cx >= self.min_chunk[0].max(-limit)
            && coord.cx <= self.max_chunk[0].min(limit)
            && coord.cz >= self.min_chunk[1].max(-limit)
            && coord.cz <= self.max_chunk[1].min(limit)
    }

    #[inline]
    pub fn sub_chunk_height(&self) -> usize {
        (self.max_height / self.sub_chunks.max(1)).max(1)
    }

    #[inline]
    pub fn chunk_volume(&self) -> usize {
        self.chunk_size * self.max_height * self.chunk_size
    }
}
