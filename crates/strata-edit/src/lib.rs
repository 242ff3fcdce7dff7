//! Local block edits and the cache of what they replaced.
#![forbid(unsafe_code)]

use std::collections::HashMap;

use strata_blocks::codec::{self, CodecError};
use strata_blocks::rotation::BlockRotation;
use thiserror::Error;

pub type VoxelKey = (i32, i32, i32);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("voxel y {vy} is outside the world (0..{max_height})")]
    OutOfWorld { vy: i32, max_height: usize },
    #[error("unknown block id {0}")]
    UnknownBlock(u32),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A block placement requested by the local player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalEdit {
    pub vx: i32,
    pub vy: i32,
    pub vz: i32,
    pub id: u32,
    pub rotation: Option<BlockRotation>,
    pub stage: Option<u32>,
}

impl LocalEdit {
    pub fn new(vx: i32, vy: i32, vz: i32, id: u32) -> Self {
        Self {
            vx,
            vy,
            vz,
            id,
            rotation: None,
            stage: None,
        }
    }

    pub fn with_rotation(mut self, rotation: BlockRotation) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn with_stage(mut self, stage: u32) -> Self {
        self.stage = Some(stage);
        self
    }

    #[inline]
    pub fn voxel(&self) -> VoxelKey {
        (self.vx, self.vy, self.vz)
    }

    /// The full voxel word this edit writes.
    pub fn packed(&self) -> Result<u32, CodecError> {
        codec::insert_all(self.id, self.rotation, self.stage)
    }
}

#[derive(Default, Debug, Clone, Copy)]
pub struct BlockUpdateCacheStats {
    pub voxels: usize,
    pub entries: usize,
    pub recorded: u64,
}

pub const DEFAULT_MAX_HISTORY: usize = 8;

/// Per-voxel history of the block ids that edits replaced. Entries stay
/// until explicitly removed or cleared; each voxel keeps at most
/// `max_history` ids, dropping the oldest.
#[derive(Debug, Clone)]
pub struct BlockUpdateCache {
    // Oldest first
    history: HashMap<VoxelKey, Vec<u32>>,
    max_history: usize,
    recorded: u64,
}

impl Default for BlockUpdateCache {
    fn default() -> Self {
        Self::with_max_history(DEFAULT_MAX_HISTORY)
    }
}

impl BlockUpdateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A zero limit is treated as one.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            history: HashMap::new(),
            max_history: max_history.max(1),
            recorded: 0,
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Snapshot the id at `voxel` before it is overwritten.
    pub fn record_previous(&mut self, voxel: VoxelKey, id: u32) {
        let entry = self.history.entry(voxel).or_default();
        if entry.len() >= self.max_history {
            let excess = entry.len() + 1 - self.max_history;
            entry.drain(..excess);
        }
        entry.push(id);
        self.recorded += 1;
    }

    /// Most recently replaced id at `voxel`.
    pub fn previous(&self, voxel: VoxelKey) -> Option<u32> {
        self.history.get(&voxel).and_then(|h| h.last().copied())
    }

    /// Up to `count` replaced ids at `voxel`, newest first.
    pub fn previous_n(&self, voxel: VoxelKey, count: usize) -> Vec<u32> {
        self.history
            .get(&voxel)
            .map(|h| h.iter().rev().take(count).copied().collect())
            .unwrap_or_default()
    }

    pub fn history(&self, voxel: VoxelKey) -> &[u32] {
        self.history.get(&voxel).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn remove(&mut self, voxel: VoxelKey) -> Option<Vec<u32>> {
        self.history.remove(&voxel)
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn stats(&self) -> BlockUpdateCacheStats {
        BlockUpdateCacheStats {
            voxels: self.history.len(),
            entries: self.history.values().map(Vec::len).sum(),
            recorded: self.recorded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn previous_returns_latest_snapshot() {
        let mut cache = BlockUpdateCache::new();
        assert_eq!(cache.previous((1, 2, 3)), None);
        cache.record_previous((1, 2, 3), 4);
        cache.record_previous((1, 2, 3), 9);
        assert_eq!(cache.previous((1, 2, 3)), Some(9));
        assert_eq!(cache.previous_n((1, 2, 3), 5), vec![9, 4]);
        assert_eq!(cache.history((1, 2, 3)), &[4u32, 9]);
        assert_eq!(cache.previous((1, 2, 4)), None);
    }

    #[test]
    fn history_is_capped_per_voxel() {
        let mut cache = BlockUpdateCache::with_max_history(3);
        for id in 0..10 {
            cache.record_previous((7, 7, 7), id);
        }
        assert_eq!(cache.history((7, 7, 7)), &[7u32, 8, 9]);
        assert_eq!(cache.previous((7, 7, 7)), Some(9));
        let s = cache.stats();
        assert_eq!((s.entries, s.recorded), (3, 10));

        let mut single = BlockUpdateCache::with_max_history(0);
        single.record_previous((0, 0, 0), 1);
        single.record_previous((0, 0, 0), 2);
        assert_eq!(single.history((0, 0, 0)), &[2u32]);
        assert_eq!(BlockUpdateCache::new().max_history(), DEFAULT_MAX_HISTORY);
    }

    #[test]
    fn entries_persist_until_cleared() {
        let mut cache = BlockUpdateCache::new();
        cache.record_previous((0, 0, 0), 1);
        cache.record_previous((5, 0, 0), 2);
        let s = cache.stats();
        assert_eq!((s.voxels, s.entries, s.recorded), (2, 2, 2));
        assert_eq!(cache.remove((0, 0, 0)), Some(vec![1]));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().recorded, 2);
    }

    #[test]
    fn edits_pack_their_fields() {
        let e = LocalEdit::new(0, 1, 2, 12)
            .with_rotation(BlockRotation::encode(2, 3))
            .with_stage(4);
        let word = e.packed().unwrap();
        assert_eq!(codec::extract_id(word), 12);
        assert_eq!(codec::extract_rotation(word).decode(), (2, 3));
        assert_eq!(codec::extract_stage(word), 4);
        assert!(LocalEdit::new(0, 0, 0, 1).with_stage(16).packed().is_err());
    }
}
