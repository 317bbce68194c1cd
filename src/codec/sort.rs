// Spatial ordering of voxel records.
//
// Records are ordered y, then x, then z (all ascending). Terrain is layered
// horizontally, so walking a layer at a time keeps consecutive x/z deltas at
// 0 or +-1 and lines up runs of identical ids.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::voxel::{Voxel, VoxelMap};

/// Below this many records the parallel sort is not worth the thread hop.
#[cfg(feature = "parallel")]
const PARALLEL_SORT_MIN: usize = 1 << 16;

/// Sort key: `(y, x, z)`.
#[inline]
pub fn sort_key(voxel: &Voxel) -> (i32, i32, i32) {
    (voxel.pos.y, voxel.pos.x, voxel.pos.z)
}

/// Collect the records of `map` in spatial order.
pub fn sort_records(map: &VoxelMap) -> Vec<Voxel> {
    let mut records: Vec<Voxel> = map.iter().collect();
    sort_voxels(&mut records);
    records
}

/// Sort records in place into spatial order.
///
/// Positions are unique within a map, so an unstable sort yields one
/// deterministic order.
pub fn sort_voxels(records: &mut [Voxel]) {
    #[cfg(feature = "parallel")]
    if records.len() >= PARALLEL_SORT_MIN {
        records.par_sort_unstable_by_key(sort_key);
        return;
    }

    records.sort_unstable_by_key(sort_key);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
