use strata_geom::Aabb;

use crate::face::BlockFace;
use crate::light::LightColor;
use crate::rotation::BlockRotation;
use crate::rules::{self, BlockRule, EvalOptions, RuleTable, VoxelAccess};

pub type BlockId = u32;

/// Geometry that applies only where `rule` matches.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockConditionalPart {
    pub rule: BlockRule,
    pub faces: Vec<BlockFace>,
    pub aabbs: Vec<Aabb>,
    pub is_transparent: [bool; 6],
    /// Offsets are taken in world space, ignoring the block's y rotation.
    pub world_space: bool,
}

/// One alternative set of conditional parts. Patterns are tried in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DynamicPattern {
    pub parts: Vec<BlockConditionalPart>,
}

/// Geometry selected for a block at one position. Boxes are in block-local
/// space; transparency flags already follow the placed rotation.
#[derive(Clone, Debug, PartialEq)]
pub struct DynamicGeometry<'a> {
    pub faces: Vec<&'a BlockFace>,
    pub aabbs: Vec<Aabb>,
    pub is_transparent: [bool; 6],
    pub pattern: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub id: BlockId,
    pub name: String,
    pub name_lower: String,
    pub rotatable: bool,
    pub y_rotatable: bool,
    pub is_empty: bool,
    pub is_fluid: bool,
    pub is_passable: bool,
    pub is_opaque: bool,
    pub light_reduce: bool,
    pub red_light_level: u32,
    pub green_light_level: u32,
    pub blue_light_level: u32,
    /// Per face: px, py, pz, nx, ny, nz.
    pub is_transparent: [bool; 6],
    pub faces: Vec<BlockFace>,
    pub aabbs: Vec<Aabb>,
    pub dynamic_patterns: Vec<DynamicPattern>,
}

impl Block {
    /// A solid, opaque unit cube.
    pub fn new(id: BlockId, name: impl Into<String>) -> Self {
        let name = name.into();
        let name_lower = name.to_lowercase();
        Self {
            id,
            name,
            name_lower,
            rotatable: false,
            y_rotatable: false,
            is_empty: false,
            is_fluid: false,
            is_passable: false,
            is_opaque: true,
            light_reduce: true,
            red_light_level: 0,
            green_light_level: 0,
            blue_light_level: 0,
            is_transparent: [false; 6],
            faces: BlockFace::cube_faces(),
            aabbs: vec![Aabb::UNIT],
            dynamic_patterns: Vec::new(),
        }
    }

    /// Passable, see-through block without geometry (air).
    pub fn empty(id: BlockId, name: impl Into<String>) -> Self {
        Self {
            is_empty: true,
            is_passable: true,
            is_opaque: false,
            light_reduce: false,
            is_transparent: [true; 6],
            faces: Vec::new(),
            aabbs: Vec::new(),
            ..Self::new(id, name)
        }
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        !self.dynamic_patterns.is_empty()
    }

    pub fn is_light_source(&self) -> bool {
        self.red_light_level > 0 || self.green_light_level > 0 || self.blue_light_level > 0
    }

    pub fn torch_light_level(&self, color: LightColor) -> u32 {
        match color {
            LightColor::Red => self.red_light_level,
            LightColor::Green => self.green_light_level,
            LightColor::Blue => self.blue_light_level,
            LightColor::Sunlight => 0,
        }
    }

    /// Picks the geometry for this block placed at `position` with `rotation`.
    /// The first pattern with at least one matching part wins and contributes
    /// every matching part; with no match the static geometry applies.
    pub fn dynamic_geometry_at<A: VoxelAccess + ?Sized>(
        &self,
        position: [i32; 3],
        rotation: BlockRotation,
        access: &A,
        table: Option<&RuleTable>,
    ) -> DynamicGeometry<'_> {
        for (index, pattern) in self.dynamic_patterns.iter().enumerate() {
            let mut faces = Vec::new();
            let mut aabbs = Vec::new();
            let mut transparent = [false; 6];
            let mut matched = false;
            for part in &pattern.parts {
                let options = EvalOptions {
                    rotation,
                    y_rotatable: self.y_rotatable,
                    world_space: part.world_space,
                };
                if !rules::evaluate_with(&part.rule, table, position, access, &options) {
                    continue;
                }
                matched = true;
                faces.extend(part.faces.iter());
                aabbs.extend(part.aabbs.iter().copied());
                for (t, p) in transparent.iter_mut().zip(part.is_transparent) {
                    *t |= p;
                }
            }
            if matched {
                return DynamicGeometry {
                    faces,
                    aabbs,
                    is_transparent: rotation.rotate_transparency(transparent),
                    pattern: Some(index),
                };
            }
        }
        DynamicGeometry {
            faces: self.faces.iter().collect(),
            aabbs: self.aabbs.clone(),
            is_transparent: rotation.rotate_transparency(self.is_transparent),
            pattern: None,
        }
    }
}
