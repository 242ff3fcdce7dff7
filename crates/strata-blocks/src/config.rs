use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_geom::Aabb;

use crate::face::UvRange;
use crate::rotation::BlockRotation;
use crate::rules::{BlockRule, RuleLogic, SimpleRule};

// Block descriptors, shared by the TOML palette files and the INIT packet.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct BlocksConfig {
    pub blocks: Vec<BlockDef>,
    // Named rules that block parts can reference with { type = "ref" }.
    #[serde(default)]
    pub rules: HashMap<String, RuleDef>,
    // Atlas windows keyed by side name (see face::side_name).
    #[serde(default)]
    pub ranges: HashMap<String, UvRange>,
}

impl BlocksConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn Error>> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BlockDef {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub rotatable: bool,
    #[serde(default)]
    pub y_rotatable: bool,
    #[serde(default)]
    pub is_empty: bool,
    #[serde(default)]
    pub is_fluid: bool,
    #[serde(default)]
    pub is_passable: bool,
    #[serde(default = "default_true")]
    pub is_opaque: bool,
    #[serde(default = "default_true")]
    pub light_reduce: bool,
    #[serde(default)]
    pub red_light_level: u32,
    #[serde(default)]
    pub green_light_level: u32,
    #[serde(default)]
    pub blue_light_level: u32,
    #[serde(default)]
    pub is_transparent: Option<[bool; 6]>,
    // Missing faces/aabbs mean a full cube, unless the block is empty.
    #[serde(default)]
    pub faces: Option<Vec<FaceDef>>,
    #[serde(default)]
    pub aabbs: Option<Vec<[f64; 6]>>,
    #[serde(default)]
    pub dynamic_patterns: Vec<PatternDef>,
}

impl BlockDef {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
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
            is_transparent: None,
            faces: None,
            aabbs: None,
            dynamic_patterns: Vec::new(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct CornerDef {
    pub pos: [f64; 3],
    pub uv: [f64; 2],
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FaceDef {
    pub name: String,
    pub dir: [i32; 3],
    pub corners: Vec<CornerDef>,
    #[serde(default)]
    pub independent: bool,
    #[serde(default)]
    pub isolated: bool,
    #[serde(default)]
    pub texture_group: Option<String>,
    #[serde(default)]
    pub range: Option<UvRange>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct PatternDef {
    pub parts: Vec<PartDef>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PartDef {
    #[serde(default)]
    pub rule: RuleDef,
    #[serde(default)]
    pub faces: Vec<FaceDef>,
    #[serde(default)]
    pub aabbs: Vec<[f64; 6]>,
    #[serde(default)]
    pub is_transparent: [bool; 6],
    #[serde(default)]
    pub world_space: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RotationDef {
    #[serde(alias = "value")]
    pub axis: u32,
    #[serde(default)]
    pub y_rotation: f64,
}

impl From<RotationDef> for BlockRotation {
    fn from(def: RotationDef) -> Self {
        BlockRotation::new(def.axis, def.y_rotation)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuleDef {
    #[default]
    None,
    Simple {
        offset: [i32; 3],
        #[serde(default)]
        id: Option<u32>,
        #[serde(default)]
        rotation: Option<RotationDef>,
        #[serde(default)]
        stage: Option<u32>,
    },
    Combination {
        logic: RuleLogic,
        rules: Vec<RuleDef>,
    },
    Ref {
        name: String,
    },
}

impl RuleDef {
    pub fn compile(&self) -> BlockRule {
        match self {
            RuleDef::None => BlockRule::None,
            RuleDef::Simple {
                offset,
                id,
                rotation,
                stage,
            } => BlockRule::Simple(SimpleRule {
                offset: *offset,
                id: *id,
                rotation: rotation.map(BlockRotation::from),
                stage: *stage,
            }),
            RuleDef::Combination { logic, rules } => BlockRule::Combination {
                logic: *logic,
                rules: rules.iter().map(RuleDef::compile).collect(),
            },
            RuleDef::Ref { name } => BlockRule::Ref(name.clone()),
        }
    }
}

/// `[min_x, min_y, min_z, max_x, max_y, max_z]`; non-finite values become 0.
pub fn aabb_from_def(v: &[f64; 6]) -> Aabb {
    let f = |x: f64| if x.is_finite() { x } else { 0.0 };
    Aabb::from_bounds(f(v[0]), f(v[1]), f(v[2]), f(v[3]), f(v[4]), f(v[5]))
}
