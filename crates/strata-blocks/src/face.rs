use serde::{Deserialize, Serialize};

/// Texture atlas window assigned to a face.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UvRange {
    pub start_u: f64,
    pub end_u: f64,
    pub start_v: f64,
    pub end_v: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CornerData {
    pub pos: [f64; 3],
    pub uv: [f64; 2],
}

impl CornerData {
    /// Non-finite components are replaced with zero.
    pub fn new(pos: [f64; 3], uv: [f64; 2]) -> Self {
        Self {
            pos: pos.map(finite_or_zero),
            uv: uv.map(finite_or_zero),
        }
    }
}

#[inline]
fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

/// Atlas key for one face of a block: lower-cased block name with whitespace
/// turned into underscores, joined to the lower-cased face name.
pub fn side_name(block_name: &str, face_name: &str) -> String {
    let block: String = block_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("{}__{}", block, face_name.to_lowercase())
}

/// A textured quad of block geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockFace {
    pub name: String,
    /// Derived from `name` at construction. Mutating `name` afterwards
    /// requires [`BlockFace::recompute_name_lower`].
    pub name_lower: String,
    pub dir: [i32; 3],
    pub corners: [CornerData; 4],
    pub range: UvRange,
    pub independent: bool,
    pub isolated: bool,
    pub texture_group: Option<String>,
}

impl BlockFace {
    pub fn new(name: impl Into<String>, dir: [i32; 3], corners: [CornerData; 4]) -> Self {
        let name = name.into();
        let name_lower = name.to_lowercase();
        Self {
            name,
            name_lower,
            dir,
            corners,
            range: UvRange::default(),
            independent: false,
            isolated: false,
            texture_group: None,
        }
    }

    pub fn recompute_name_lower(&mut self) {
        self.name_lower = self.name.to_lowercase();
    }

    /// Key under which the atlas publishes this face's range.
    pub fn side_name(&self, block_name: &str) -> String {
        side_name(block_name, &self.name)
    }

    /// The six faces of a full unit cube, named `px`..`nz`.
    pub fn cube_faces() -> Vec<BlockFace> {
        let c = |p: [f64; 3], uv: [f64; 2]| CornerData::new(p, uv);
        vec![
            BlockFace::new(
                "px",
                [1, 0, 0],
                [
                    c([1.0, 1.0, 1.0], [0.0, 1.0]),
                    c([1.0, 0.0, 1.0], [0.0, 0.0]),
                    c([1.0, 1.0, 0.0], [1.0, 1.0]),
                    c([1.0, 0.0, 0.0], [1.0, 0.0]),
                ],
            ),
            BlockFace::new(
                "py",
                [0, 1, 0],
                [
                    c([0.0, 1.0, 1.0], [1.0, 1.0]),
                    c([1.0, 1.0, 1.0], [0.0, 1.0]),
                    c([0.0, 1.0, 0.0], [1.0, 0.0]),
                    c([1.0, 1.0, 0.0], [0.0, 0.0]),
                ],
            ),
            BlockFace::new(
                "pz",
                [0, 0, 1],
                [
                    c([0.0, 0.0, 1.0], [0.0, 0.0]),
                    c([1.0, 0.0, 1.0], [1.0, 0.0]),
                    c([0.0, 1.0, 1.0], [0.0, 1.0]),
                    c([1.0, 1.0, 1.0], [1.0, 1.0]),
                ],
            ),
            BlockFace::new(
                "nx",
                [-1, 0, 0],
                [
                    c([0.0, 1.0, 0.0], [0.0, 1.0]),
                    c([0.0, 0.0, 0.0], [0.0, 0.0]),
                    c([0.0, 1.0, 1.0], [1.0, 1.0]),
                    c([0.0, 0.0, 1.0], [1.0, 0.0]),
                ],
            ),
            BlockFace::new(
                "ny",
                [0, -1, 0],
                [
                    c([1.0, 0.0, 1.0], [1.0, 0.0]),
                    c([0.0, 0.0, 1.0], [0.0, 0.0]),
                    c([1.0, 0.0, 0.0], [1.0, 1.0]),
                    c([0.0, 0.0, 0.0], [0.0, 1.0]),
                ],
            ),
            BlockFace::new(
                "nz",
                [0, 0, -1],
                [
                    c([1.0, 0.0, 0.0], [0.0, 0.0]),
                    c([0.0, 0.0, 0.0], [1.0, 0.0]),
                    c([1.0, 1.0, 0.0], [0.0, 1.0]),
                    c([0.0, 1.0, 0.0], [1.0, 1.0]),
                ],
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_names_are_normalized() {
        assert_eq!(side_name("Oak Log", "PX"), "oak_log__px");
        assert_eq!(side_name("Stone\tBrick", "top"), "stone_brick__top");
    }

    #[test]
    fn name_lower_needs_explicit_recompute() {
        let mut f = BlockFace::new("Top", [0, 1, 0], [CornerData::default(); 4]);
        assert_eq!(f.name_lower, "top");
        f.name = "Side".into();
        assert_eq!(f.name_lower, "top");
        f.recompute_name_lower();
        assert_eq!(f.name_lower, "side");
    }

    #[test]
    fn corners_drop_non_finite() {
        let c = CornerData::new([f64::NAN, 1.0, f64::INFINITY], [0.5, f64::NEG_INFINITY]);
        assert_eq!(c.pos, [0.0, 1.0, 0.0]);
        assert_eq!(c.uv, [0.5, 0.0]);
    }
}
