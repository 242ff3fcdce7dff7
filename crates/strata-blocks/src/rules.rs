//! Declarative neighbor rules that decide which conditional parts of a
//! block apply at a given position.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rotation::BlockRotation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleLogic {
    And,
    Or,
    Not,
}

/// Matches the voxel at `position + offset` against optional constraints.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimpleRule {
    pub offset: [i32; 3],
    pub id: Option<u32>,
    pub rotation: Option<BlockRotation>,
    pub stage: Option<u32>,
}

impl SimpleRule {
    pub fn at(offset: [i32; 3]) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    pub fn id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn rotation(mut self, rotation: BlockRotation) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn stage(mut self, stage: u32) -> Self {
        self.stage = Some(stage);
        self
    }

    #[inline]
    pub fn is_unconstrained(&self) -> bool {
        self.id.is_none() && self.rotation.is_none() && self.stage.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum BlockRule {
    #[default]
    None,
    Simple(SimpleRule),
    Combination {
        logic: RuleLogic,
        rules: Vec<BlockRule>,
    },
    /// Reference to a shared rule in a [`RuleTable`].
    Ref(String),
}

impl From<SimpleRule> for BlockRule {
    fn from(rule: SimpleRule) -> Self {
        BlockRule::Simple(rule)
    }
}

impl BlockRule {
    pub fn and(rules: Vec<BlockRule>) -> Self {
        BlockRule::Combination {
            logic: RuleLogic::And,
            rules,
        }
    }

    pub fn or(rules: Vec<BlockRule>) -> Self {
        BlockRule::Combination {
            logic: RuleLogic::Or,
            rules,
        }
    }

    pub fn not(rule: BlockRule) -> Self {
        BlockRule::Combination {
            logic: RuleLogic::Not,
            rules: vec![rule],
        }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        BlockRule::Ref(name.into())
    }
}

/// Named rules shared between blocks.
pub type RuleTable = HashMap<String, BlockRule>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("voxel ({0}, {1}, {2}) is not available")]
    Unavailable(i32, i32, i32),
    #[error("voxel access failed: {0}")]
    Failed(String),
}

/// Read access to world voxels used while evaluating rules.
pub trait VoxelAccess {
    fn voxel_id(&self, vx: i32, vy: i32, vz: i32) -> Result<u32, AccessError>;
    fn voxel_rotation(&self, vx: i32, vy: i32, vz: i32) -> Result<BlockRotation, AccessError>;
    fn voxel_stage(&self, vx: i32, vy: i32, vz: i32) -> Result<u32, AccessError>;
}

impl<T: VoxelAccess + ?Sized> VoxelAccess for &T {
    fn voxel_id(&self, vx: i32, vy: i32, vz: i32) -> Result<u32, AccessError> {
        (**self).voxel_id(vx, vy, vz)
    }
    fn voxel_rotation(&self, vx: i32, vy: i32, vz: i32) -> Result<BlockRotation, AccessError> {
        (**self).voxel_rotation(vx, vy, vz)
    }
    fn voxel_stage(&self, vx: i32, vy: i32, vz: i32) -> Result<u32, AccessError> {
        (**self).voxel_stage(vx, vy, vz)
    }
}

/// Placement context of the block whose rules are evaluated.
#[derive(Clone, Copy, Debug, Default)]
pub struct EvalOptions {
    pub rotation: BlockRotation,
    pub y_rotatable: bool,
    pub world_space: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Match,
    NoMatch,
    /// A named rule referenced itself along the current path.
    Cycle,
}

impl From<bool> for Outcome {
    fn from(b: bool) -> Self {
        if b { Outcome::Match } else { Outcome::NoMatch }
    }
}

struct Evaluator<'a, A: ?Sized> {
    access: &'a A,
    table: Option<&'a RuleTable>,
    position: [i32; 3],
    // (sin, cos) of the placed y rotation when offsets follow it.
    trig: Option<(f64, f64)>,
    path: Vec<&'a str>,
    warned: bool,
}

/// Evaluates `rule` at `position`. Failures in `access` count as a non-match;
/// nothing propagates to the caller.
pub fn evaluate<A: VoxelAccess + ?Sized>(
    rule: &BlockRule,
    position: [i32; 3],
    access: &A,
    options: &EvalOptions,
) -> bool {
    evaluate_with(rule, None, position, access, options)
}

/// Same as [`evaluate`], resolving [`BlockRule::Ref`] through `table`.
pub fn evaluate_with<A: VoxelAccess + ?Sized>(
    rule: &BlockRule,
    table: Option<&RuleTable>,
    position: [i32; 3],
    access: &A,
    options: &EvalOptions,
) -> bool {
    let trig = if options.y_rotatable && !options.world_space {
        Some(options.rotation.y_sin_cos())
    } else {
        None
    };
    let mut ev = Evaluator {
        access,
        table,
        position,
        trig,
        path: Vec::new(),
        warned: false,
    };
    ev.eval(rule) == Outcome::Match
}

#[inline]
fn to_i32(v: f64) -> Option<i32> {
    if v.is_finite() && v >= f64::from(i32::MIN) && v <= f64::from(i32::MAX) {
        Some(v as i32)
    } else {
        None
    }
}

impl<'a, A: VoxelAccess + ?Sized> Evaluator<'a, A> {
    fn eval(&mut self, rule: &'a BlockRule) -> Outcome {
        match rule {
            BlockRule::None => Outcome::Match,
            BlockRule::Simple(simple) => self.eval_simple(simple).into(),
            BlockRule::Combination { logic, rules } => self.eval_combination(*logic, rules),
            BlockRule::Ref(name) => self.eval_ref(name),
        }
    }

    fn eval_combination(&mut self, logic: RuleLogic, rules: &'a [BlockRule]) -> Outcome {
        match logic {
            RuleLogic::And => {
                for r in rules {
                    if self.eval(r) == Outcome::NoMatch {
                        return Outcome::NoMatch;
                    }
                }
                Outcome::Match
            }
            RuleLogic::Or => {
                for r in rules {
                    if self.eval(r) != Outcome::NoMatch {
                        return Outcome::Match;
                    }
                }
                Outcome::NoMatch
            }
            // Only the first rule is negated.
            RuleLogic::Not => match rules.first() {
                None => Outcome::Match,
                Some(r) => match self.eval(r) {
                    Outcome::NoMatch => Outcome::Match,
                    Outcome::Match | Outcome::Cycle => Outcome::NoMatch,
                },
            },
        }
    }

    fn eval_ref(&mut self, name: &'a str) -> Outcome {
        if self.path.contains(&name) {
            return Outcome::Cycle;
        }
        let Some(body) = self.table.and_then(|t| t.get(name)) else {
            if !self.warned {
                log::warn!("block rule references unknown rule {:?}", name);
                self.warned = true;
            }
            return Outcome::NoMatch;
        };
        self.path.push(name);
        let out = self.eval(body);
        self.path.pop();
        out
    }

    fn target(&self, [ox, oy, oz]: [i32; 3]) -> Option<[i32; 3]> {
        let (dx, dz) = match self.trig {
            Some((s, c)) => {
                let x = f64::from(ox);
                let z = f64::from(oz);
                (to_i32((x * c - z * s).round())?, to_i32((x * s + z * c).round())?)
            }
            None => (ox, oz),
        };
        let [px, py, pz] = self.position;
        Some([px.checked_add(dx)?, py.checked_add(oy)?, pz.checked_add(dz)?])
    }

    fn eval_simple(&self, rule: &SimpleRule) -> bool {
        if rule.is_unconstrained() {
            return true;
        }
        let Some([vx, vy, vz]) = self.target(rule.offset) else {
            return false;
        };
        if let Some(id) = rule.id {
            if self.access.voxel_id(vx, vy, vz) != Ok(id) {
                return false;
            }
        }
        if let Some(rotation) = rule.rotation {
            if self.access.voxel_rotation(vx, vy, vz) != Ok(rotation) {
                return false;
            }
        }
        if let Some(stage) = rule.stage {
            if self.access.voxel_stage(vx, vy, vz) != Ok(stage) {
                return false;
            }
        }
        true
    }
}
