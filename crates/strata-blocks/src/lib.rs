//! Voxel word codec, block orientation, conditional geometry rules, and the block registry.
#![forbid(unsafe_code)]

pub mod codec;
pub mod config;
pub mod face;
pub mod light;
pub mod registry;
pub mod rotation;
pub mod rules;
pub mod types;

pub use codec::{CodecError, Voxel};
pub use face::{BlockFace, CornerData, UvRange};
pub use light::{Light, LightColor};
pub use registry::BlockRegistry;
pub use rotation::BlockRotation;
pub use rules::{AccessError, BlockRule, EvalOptions, RuleLogic, RuleTable, SimpleRule, VoxelAccess};
pub use types::{Block, BlockConditionalPart, BlockId, DynamicGeometry, DynamicPattern};
