// Axis-aligned bounds of a voxel map.

use serde::{Deserialize, Serialize};

use crate::voxel::{BlockPos, Voxel, VoxelMap};

/// Inclusive per-axis minimum and maximum of every coordinate in a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: i32,
    pub min_y: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_y: i32,
    pub max_z: i32,
}

impl Bounds {
    /// Bounds of a single point.
    pub const fn point(pos: BlockPos) -> Self {
        Self {
            min_x: pos.x,
            min_y: pos.y,
            min_z: pos.z,
            max_x: pos.x,
            max_y: pos.y,
            max_z: pos.z,
        }
    }

    pub const fn min(&self) -> BlockPos {
        BlockPos::new(self.min_x, self.min_y, self.min_z)
    }

    pub const fn max(&self) -> BlockPos {
        BlockPos::new(self.max_x, self.max_y, self.max_z)
    }

    /// Grow to include `pos`.
    pub fn include(&mut self, pos: BlockPos) {
        self.min_x = self.min_x.min(pos.x);
        self.min_y = self.min_y.min(pos.y);
        self.min_z = self.min_z.min(pos.z);
        self.max_x = self.max_x.max(pos.x);
        self.max_y = self.max_y.max(pos.y);
        self.max_z = self.max_z.max(pos.z);
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        (self.min_x..=self.max_x).contains(&pos.x)
            && (self.min_y..=self.max_y).contains(&pos.y)
            && (self.min_z..=self.max_z).contains(&pos.z)
    }

    /// Per-axis extent (`max - min + 1`), widened so full-range maps don't overflow.
    pub fn extent(&self) -> (u64, u64, u64) {
        let span = |lo: i32, hi: i32| (i64::from(hi) - i64::from(lo) + 1) as u64;
        (
            span(self.min_x, self.max_x),
            span(self.min_y, self.max_y),
            span(self.min_z, self.max_z),
        )
    }

    /// The six values in `min_x, min_y, min_z, max_x, max_y, max_z` order.
    pub const fn to_array(&self) -> [i32; 6] {
        [
            self.min_x, self.min_y, self.min_z, self.max_x, self.max_y, self.max_z,
        ]
    }

    pub const fn from_array(v: [i32; 6]) -> Self {
        Self {
            min_x: v[0],
            min_y: v[1],
            min_z: v[2],
            max_x: v[3],
            max_y: v[4],
            max_z: v[5],
        }
    }
}

/// Compute the bounds of `map` in one pass.
///
/// The empty map has no bounds and yields `None`; artifacts record that as
/// an absent bounds field.
pub fn compute_bounds(map: &VoxelMap) -> Option<Bounds> {
    bounds_of(map.iter())
}

/// Bounds of an arbitrary record sequence.
pub fn bounds_of(voxels: impl IntoIterator<Item = Voxel>) -> Option<Bounds> {
    let mut iter = voxels.into_iter();
    let mut bounds = Bounds::point(iter.next()?.pos);
    for voxel in iter {
        bounds.include(voxel.pos);
    }
    Some(bounds)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
