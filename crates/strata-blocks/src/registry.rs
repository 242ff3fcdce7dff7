use std::collections::HashMap;
use std::error::Error;
use std::path::Path;

use crate::config::{BlockDef, BlocksConfig, FaceDef, aabb_from_def};
use crate::face::{BlockFace, CornerData, UvRange};
use crate::rules::{BlockRule, RuleTable};
use crate::types::{Block, BlockConditionalPart, BlockId, DynamicPattern};

/// Block types by id and name, plus the named rules their parts share.
#[derive(Default, Clone, Debug)]
pub struct BlockRegistry {
    blocks: HashMap<BlockId, Block>,
    by_name: HashMap<String, BlockId>,
    rules: RuleTable,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        Self::from_config(BlocksConfig::from_path(path)?)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn Error>> {
        Self::from_config(BlocksConfig::from_toml_str(s)?)
    }

    pub fn from_config(cfg: BlocksConfig) -> Result<Self, Box<dyn Error>> {
        let mut reg = BlockRegistry::new();
        for (name, def) in &cfg.rules {
            reg.rules.insert(name.clone(), def.compile());
        }
        for def in &cfg.blocks {
            let block = compile_block(def)?;
            if reg.blocks.contains_key(&block.id) {
                return Err(format!("duplicate block id {} ({})", block.id, block.name).into());
            }
            if reg.by_name.contains_key(&block.name_lower) {
                return Err(format!("duplicate block name {:?}", block.name).into());
            }
            reg.register(block);
        }
        if !cfg.ranges.is_empty() {
            reg.apply_ranges(&cfg.ranges);
        }
        log::info!(
            "block registry: {} blocks, {} shared rules",
            reg.blocks.len(),
            reg.rules.len()
        );
        Ok(reg)
    }

    /// Inserts or replaces a block type, returning the previous one with that id.
    pub fn register(&mut self, block: Block) -> Option<Block> {
        let prev = self.blocks.insert(block.id, block.clone());
        if let Some(p) = &prev {
            self.by_name.remove(&p.name_lower);
        }
        self.by_name.insert(block.name_lower.clone(), block.id);
        prev
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    #[inline]
    pub fn contains(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    /// Case-insensitive lookup.
    pub fn get_by_name(&self, name: &str) -> Option<&Block> {
        self.id_by_name(name).and_then(|id| self.get(id))
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn set_rule(&mut self, name: impl Into<String>, rule: BlockRule) {
        self.rules.insert(name.into(), rule);
    }

    /// Assigns atlas windows to every face by side name. Faces without an
    /// entry keep their range and are reported; returns how many were missing.
    pub fn apply_ranges(&mut self, ranges: &HashMap<String, UvRange>) -> usize {
        let mut missing = 0;
        for block in self.blocks.values_mut() {
            let name = block.name.clone();
            let part_faces = block
                .dynamic_patterns
                .iter_mut()
                .flat_map(|p| p.parts.iter_mut())
                .flat_map(|part| part.faces.iter_mut());
            for face in block.faces.iter_mut().chain(part_faces) {
                let key = face.side_name(&name);
                match ranges.get(&key) {
                    Some(range) => face.range = *range,
                    None => {
                        log::warn!("no texture range for {key}; keeping previous range");
                        missing += 1;
                    }
                }
            }
        }
        missing
    }
}

fn compile_face(def: &FaceDef) -> Result<BlockFace, Box<dyn Error>> {
    let corners: [CornerData; 4] = match def.corners.as_slice() {
        [a, b, c, d] => [a, b, c, d].map(|c| CornerData::new(c.pos, c.uv)),
        other => {
            return Err(format!("face {:?} has {} corners, expected 4", def.name, other.len()).into());
        }
    };
    let mut face = BlockFace::new(def.name.clone(), def.dir, corners);
    face.independent = def.independent;
    face.isolated = def.isolated;
    face.texture_group = def.texture_group.clone();
    if let Some(range) = def.range {
        face.range = range;
    }
    Ok(face)
}

fn compile_faces(defs: &[FaceDef]) -> Result<Vec<BlockFace>, Box<dyn Error>> {
    defs.iter().map(compile_face).collect()
}

pub fn compile_block(def: &BlockDef) -> Result<Block, Box<dyn Error>> {
    let base = if def.is_empty {
        Block::empty(def.id, def.name.clone())
    } else {
        Block::new(def.id, def.name.clone())
    };

    let faces = match &def.faces {
        Some(f) => compile_faces(f)?,
        None => base.faces.clone(),
    };
    let aabbs = match &def.aabbs {
        Some(a) => a.iter().map(aabb_from_def).collect(),
        None => base.aabbs.clone(),
    };

    let mut dynamic_patterns = Vec::with_capacity(def.dynamic_patterns.len());
    for pattern in &def.dynamic_patterns {
        let mut parts = Vec::with_capacity(pattern.parts.len());
        for part in &pattern.parts {
            parts.push(BlockConditionalPart {
                rule: part.rule.compile(),
                faces: compile_faces(&part.faces)?,
                aabbs: part.aabbs.iter().map(aabb_from_def).collect(),
                is_transparent: part.is_transparent,
                world_space: part.world_space,
            });
        }
        dynamic_patterns.push(DynamicPattern { parts });
    }

    Ok(Block {
        rotatable: def.rotatable,
        y_rotatable: def.y_rotatable,
        is_fluid: def.is_fluid,
        is_passable: def.is_passable || def.is_empty,
        is_opaque: def.is_opaque && !def.is_empty,
        light_reduce: def.light_reduce && !def.is_empty,
        red_light_level: def.red_light_level & 0xF,
        green_light_level: def.green_light_level & 0xF,
        blue_light_level: def.blue_light_level & 0xF,
        is_transparent: def.is_transparent.unwrap_or(base.is_transparent),
        faces,
        aabbs,
        dynamic_patterns,
        ..base
    })
}
