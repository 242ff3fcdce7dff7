//! Packed 32-bit voxel words.
//!
//! Layout: bits 0-15 block id, 16-19 rotation axis, 20-23 y-rotation
//! segment, 24-27 growth stage, 28-31 reserved.

use thiserror::Error;

use crate::rotation::BlockRotation;

pub const ID_MASK: u32 = 0xFFFF;
pub const MAX_STAGE: u32 = 15;

const NIBBLE: u32 = 0xF;
const AXIS_SHIFT: u32 = 16;
const SEGMENT_SHIFT: u32 = 20;
const STAGE_SHIFT: u32 = 24;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("stage {0} is out of range (0..=15)")]
    InvalidStage(u32),
    #[error("unknown light color index {0}")]
    UnknownLightColor(usize),
    #[error("unknown light color name {0:?}")]
    UnknownLightColorName(String),
}

#[inline]
pub fn extract_id(voxel: u32) -> u32 {
    voxel & ID_MASK
}

/// Ids wider than 16 bits are silently masked.
#[inline]
pub fn insert_id(voxel: u32, id: u32) -> u32 {
    (voxel & !ID_MASK) | (id & ID_MASK)
}

#[inline]
pub fn extract_rotation(voxel: u32) -> BlockRotation {
    let axis = (voxel >> AXIS_SHIFT) & NIBBLE;
    let segment = (voxel >> SEGMENT_SHIFT) & NIBBLE;
    BlockRotation::encode(axis, i64::from(segment))
}

pub fn insert_rotation(voxel: u32, rotation: impl Into<BlockRotation>) -> u32 {
    let (axis, segment) = rotation.into().decode();
    let cleared = voxel & !(NIBBLE << AXIS_SHIFT) & !(NIBBLE << SEGMENT_SHIFT);
    cleared | (axis << AXIS_SHIFT) | (segment << SEGMENT_SHIFT)
}

#[inline]
pub fn extract_stage(voxel: u32) -> u32 {
    (voxel >> STAGE_SHIFT) & NIBBLE
}

/// Unlike the other fields, an out-of-range stage is rejected rather than masked.
pub fn insert_stage(voxel: u32, stage: u32) -> Result<u32, CodecError> {
    if stage > MAX_STAGE {
        return Err(CodecError::InvalidStage(stage));
    }
    Ok((voxel & !(NIBBLE << STAGE_SHIFT)) | (stage << STAGE_SHIFT))
}

pub fn insert_all(
    id: u32,
    rotation: Option<BlockRotation>,
    stage: Option<u32>,
) -> Result<u32, CodecError> {
    let mut voxel = insert_id(0, id);
    if let Some(rotation) = rotation {
        voxel = insert_rotation(voxel, rotation);
    }
    if let Some(stage) = stage {
        voxel = insert_stage(voxel, stage)?;
    }
    Ok(voxel)
}

/// Unpacked view of a voxel word.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Voxel {
    pub id: u32,
    pub rotation: BlockRotation,
    pub stage: u32,
}

impl Voxel {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn unpack(voxel: u32) -> Self {
        Self {
            id: extract_id(voxel),
            rotation: extract_rotation(voxel),
            stage: extract_stage(voxel),
        }
    }

    pub fn pack(&self) -> Result<u32, CodecError> {
        insert_all(self.id, Some(self.rotation), Some(self.stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::{PX_ROTATION, PY_ROTATION};

    #[test]
    fn pack_id_only() {
        let word = insert_all(9, None, None).unwrap();
        let v = Voxel::unpack(word);
        assert_eq!(v.id, 9);
        assert_eq!(v.stage, 0);
        assert_eq!(v.rotation.decode(), (PY_ROTATION, 0));
    }

    #[test]
    fn stage_bounds() {
        assert_eq!(insert_stage(0, 15).map(extract_stage), Ok(15));
        assert_eq!(insert_stage(0, 16), Err(CodecError::InvalidStage(16)));
    }

    #[test]
    fn light_color_errors_carry_the_name() {
        let err = "ultraviolet".parse::<crate::light::LightColor>().unwrap_err();
        assert_eq!(err.clone(), CodecError::UnknownLightColorName("ultraviolet".into()));
        assert_eq!(err.to_string(), "unknown light color name \"ultraviolet\"");
    }

    #[test]
    fn fields_do_not_overlap() {
        let mut w = insert_id(0, 0xABCD);
        w = insert_rotation(w, BlockRotation::encode(PX_ROTATION, 7));
        w = insert_stage(w, 3).unwrap();
        assert_eq!(extract_id(w), 0xABCD);
        assert_eq!(extract_rotation(w).decode(), (PX_ROTATION, 7));
        assert_eq!(extract_stage(w), 3);
        w = insert_id(w, 0x1_0001);
        assert_eq!(extract_id(w), 1);
        assert_eq!(extract_stage(w), 3);
    }
}
