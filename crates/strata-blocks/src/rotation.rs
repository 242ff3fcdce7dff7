//! Block orientation: one of six axis-aligned "up" directions plus a
//! 16-segment rotation around the vertical axis.

use core::f64::consts::TAU;

use strata_geom::{Aabb, Vec3};

pub const PY_ROTATION: u32 = 0;
pub const NY_ROTATION: u32 = 1;
pub const PX_ROTATION: u32 = 2;
pub const NX_ROTATION: u32 = 3;
pub const PZ_ROTATION: u32 = 4;
pub const NZ_ROTATION: u32 = 5;

pub const Y_ROT_SEGMENTS: u32 = 16;
pub const SEGMENT_ANGLE: f64 = TAU / Y_ROT_SEGMENTS as f64;

// Rotated bounds closer to zero than this are snapped to exactly zero.
const SNAP_EPSILON: f64 = 1e-4;

// Face order used by transparency flags: px, py, pz, nx, ny, nz.
const FACE_NORMALS: [[i32; 3]; 6] = [
    [1, 0, 0],
    [0, 1, 0],
    [0, 0, 1],
    [-1, 0, 0],
    [0, -1, 0],
    [0, 0, -1],
];

#[inline]
fn normalize_axis(axis: u32) -> u32 {
    if axis <= NZ_ROTATION { axis } else { PY_ROTATION }
}

/// Exact values on quarter turns so axis-aligned boxes stay axis-aligned.
#[inline]
fn segment_sin_cos(segment: u32) -> (f64, f64) {
    match segment % Y_ROT_SEGMENTS {
        0 => (0.0, 1.0),
        4 => (1.0, 0.0),
        8 => (0.0, -1.0),
        12 => (-1.0, 0.0),
        s => (f64::from(s) * SEGMENT_ANGLE).sin_cos(),
    }
}

#[inline]
fn snap(v: f64) -> f64 {
    if v.abs() < SNAP_EPSILON { 0.0 } else { v }
}

/// Maps an integer direction through the fixed axis transform (no translation).
#[inline]
fn axis_transform_dir(axis: u32, [x, y, z]: [i32; 3]) -> [i32; 3] {
    match axis {
        PX_ROTATION => [y, -x, z],
        NX_ROTATION => [-y, x, z],
        NY_ROTATION => [x, -y, -z],
        PZ_ROTATION => [x, -z, y],
        NZ_ROTATION => [x, z, -y],
        _ => [x, y, z],
    }
}

#[inline]
fn face_index(dir: [i32; 3]) -> usize {
    FACE_NORMALS.iter().position(|n| *n == dir).unwrap_or(1)
}

/// Orientation of a placed block. Both fields are public and may be mutated
/// freely; every consumer goes through [`BlockRotation::decode`], which
/// normalizes an invalid axis to PY and the angle to a segment.
#[derive(Clone, Copy, Debug)]
pub struct BlockRotation {
    pub axis: u32,
    pub y_rotation: f64,
}

impl Default for BlockRotation {
    fn default() -> Self {
        Self::py(0.0)
    }
}

impl PartialEq for BlockRotation {
    fn eq(&self, other: &Self) -> bool {
        self.decode() == other.decode()
    }
}

impl Eq for BlockRotation {}

impl From<(u32, f64)> for BlockRotation {
    fn from((axis, y_rotation): (u32, f64)) -> Self {
        Self::new(axis, y_rotation)
    }
}

impl BlockRotation {
    #[inline]
    pub const fn new(axis: u32, y_rotation: f64) -> Self {
        Self { axis, y_rotation }
    }

    pub const fn px(y_rotation: f64) -> Self {
        Self::new(PX_ROTATION, y_rotation)
    }
    pub const fn nx(y_rotation: f64) -> Self {
        Self::new(NX_ROTATION, y_rotation)
    }
    pub const fn py(y_rotation: f64) -> Self {
        Self::new(PY_ROTATION, y_rotation)
    }
    pub const fn ny(y_rotation: f64) -> Self {
        Self::new(NY_ROTATION, y_rotation)
    }
    pub const fn pz(y_rotation: f64) -> Self {
        Self::new(PZ_ROTATION, y_rotation)
    }
    pub const fn nz(y_rotation: f64) -> Self {
        Self::new(NZ_ROTATION, y_rotation)
    }

    /// Builds a rotation from packed fields. Negative or oversized segments wrap.
    pub fn encode(axis: u32, segment: i64) -> Self {
        let segment = segment.rem_euclid(i64::from(Y_ROT_SEGMENTS)) as u32;
        Self::new(normalize_axis(axis), f64::from(segment) * SEGMENT_ANGLE)
    }

    /// `(axis, segment)` as stored in a voxel word.
    #[inline]
    pub fn decode(&self) -> (u32, u32) {
        (normalize_axis(self.axis), self.segment())
    }

    /// Nearest y-rotation segment. Non-finite angles decode to segment 0.
    pub fn segment(&self) -> u32 {
        if !self.y_rotation.is_finite() {
            return 0;
        }
        let turns = self.y_rotation.rem_euclid(TAU) / SEGMENT_ANGLE;
        (turns.round() as u32) % Y_ROT_SEGMENTS
    }

    /// Normalized axis (invalid values read as PY).
    #[inline]
    pub fn axis(&self) -> u32 {
        normalize_axis(self.axis)
    }

    /// Angle actually used for geometry: the decoded segment.
    #[inline]
    pub fn y_angle(&self) -> f64 {
        f64::from(self.segment()) * SEGMENT_ANGLE
    }

    /// `(sin, cos)` of [`Self::y_angle`], exact on quarter turns.
    #[inline]
    pub fn y_sin_cos(&self) -> (f64, f64) {
        segment_sin_cos(self.segment())
    }

    /// Rotates a point of the unit cube in place: first around the vertical
    /// axis through (0.5, _, 0.5) when `y_rotate` is set, then by the axis
    /// transform. `translate` keeps the result inside the unit cube.
    pub fn rotate_node(&self, node: &mut Vec3, y_rotate: bool, translate: bool) {
        let segment = self.segment();
        if y_rotate && segment != 0 {
            let (s, c) = segment_sin_cos(segment);
            let x = node.x - 0.5;
            let z = node.z - 0.5;
            node.x = x * c + z * s + 0.5;
            node.z = z * c - x * s + 0.5;
        }

        let t = if translate { 1.0 } else { 0.0 };
        let Vec3 { x, y, z } = *node;
        *node = match self.axis() {
            PX_ROTATION => Vec3::new(y, t - x, z),
            NX_ROTATION => Vec3::new(t - y, x, z),
            NY_ROTATION => Vec3::new(x, t - y, t - z),
            PZ_ROTATION => Vec3::new(x, t - z, y),
            NZ_ROTATION => Vec3::new(x, z, t - y),
            _ => *node,
        };
    }

    /// Rotates all eight corners and re-derives the bounds, so the result is
    /// well formed for every rotation.
    pub fn rotate_aabb(&self, aabb: &Aabb, y_rotate: bool, translate: bool) -> Aabb {
        let mut min = Vec3::splat(f64::INFINITY);
        let mut max = Vec3::splat(f64::NEG_INFINITY);
        for mut corner in aabb.corners() {
            self.rotate_node(&mut corner, y_rotate, translate);
            min = min.min(corner);
            max = max.max(corner);
        }
        Aabb::new(
            Vec3::new(snap(min.x), snap(min.y), snap(min.z)),
            Vec3::new(snap(max.x), snap(max.y), snap(max.z)),
        )
    }

    /// Permutes per-face transparency flags (px, py, pz, nx, ny, nz) so each
    /// flag follows its face through this rotation. On PY/NY the y rotation,
    /// rounded to the nearest quarter turn, also permutes the side faces.
    pub fn rotate_transparency(&self, flags: [bool; 6]) -> [bool; 6] {
        let axis = self.axis();
        let quarters = if axis == PY_ROTATION || axis == NY_ROTATION {
            ((self.segment() + 2) / 4) % 4
        } else {
            0
        };

        let mut out = [false; 6];
        for (i, normal) in FACE_NORMALS.iter().enumerate() {
            let mut dir = *normal;
            for _ in 0..quarters {
                dir = [dir[2], dir[1], -dir[0]];
            }
            out[face_index(axis_transform_dir(axis, dir))] = flags[i];
        }
        out
    }
}
