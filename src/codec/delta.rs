// Position delta coding and block-id run-length coding.
//
// Encode: shift every position by the bounds minimum, sort spatially, then
// emit each record's offset from the previous one (starting at the origin).
// Decode walks the same sequence accumulating offsets; the order is part of
// the format.
//
// All coordinate arithmetic wraps mod 2^32, so maps spanning more than the
// i32 range still round-trip exactly.

use crate::codec::bounds::{self, Bounds};
use crate::codec::sort;
use crate::error::DecodeError;
use crate::voxel::{BlockId, BlockPos, Voxel, VoxelMap};

/// Shortest run of identical ids worth replacing with a run marker.
/// A marker costs two values, so runs of one or two stay literal.
pub const MIN_ID_RUN: usize = 3;

/// Longest run a single marker can describe (`-count` must fit in i32).
const MAX_ID_RUN: usize = i32::MAX as usize;

/// One record's offset from the previous record.
pub type PositionDelta = [i32; 3];

/// Output of [`encode_positions`]: parallel delta and id sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaEncoded {
    pub deltas: Vec<PositionDelta>,
    pub ids: Vec<BlockId>,
    /// `None` only for the empty map.
    pub bounds: Option<Bounds>,
}

// ---------------------------------------------------------------------------
// Running position state
// ---------------------------------------------------------------------------

/// Encode side: turns absolute positions into deltas.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaTracker {
    last: BlockPos,
}

impl DeltaTracker {
    #[inline]
    pub fn delta(&mut self, pos: BlockPos) -> PositionDelta {
        let d = pos.wrapping_sub(self.last);
        self.last = pos;
        [d.x, d.y, d.z]
    }
}

/// Decode side: accumulates deltas back into positions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionAccumulator {
    current: BlockPos,
}

impl PositionAccumulator {
    #[inline]
    pub fn advance(&mut self, delta: PositionDelta) -> BlockPos {
        self.current = self
            .current
            .wrapping_add(BlockPos::new(delta[0], delta[1], delta[2]));
        self.current
    }
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Shift by bounds minimum, sort spatially and return the shifted records.
///
/// This is the record order every delta-based payload uses.
pub fn shifted_records(map: &VoxelMap) -> (Vec<Voxel>, Option<Bounds>) {
    let Some(bounds) = bounds::compute_bounds(map) else {
        return (Vec::new(), None);
    };
    let min = bounds.min();
    let mut records: Vec<Voxel> = map
        .iter()
        .map(|v| Voxel {
            pos: v.pos.wrapping_sub(min),
            id: v.id,
        })
        .collect();
    sort::sort_voxels(&mut records);
    (records, Some(bounds))
}

/// Delta-encode a voxel map.
pub fn encode_positions(map: &VoxelMap) -> DeltaEncoded {
    let (records, bounds) = shifted_records(map);
    let mut tracker = DeltaTracker::default();
    let mut deltas = Vec::with_capacity(records.len());
    let mut ids = Vec::with_capacity(records.len());
    for record in &records {
        deltas.push(tracker.delta(record.pos));
        ids.push(record.id);
    }
    DeltaEncoded {
        deltas,
        ids,
        bounds,
    }
}

/// Rebuild a voxel map from delta and id sequences.
///
/// When `bounds` is given its minimum is added back to every position.
pub fn decode_positions(
    deltas: &[PositionDelta],
    ids: &[BlockId],
    bounds: Option<&Bounds>,
) -> Result<VoxelMap, DecodeError> {
    if deltas.len() != ids.len() {
        return Err(DecodeError::LengthMismatch {
            deltas: deltas.len(),
            ids: ids.len(),
        });
    }
    let offset = bounds.map(Bounds::min).unwrap_or_default();
    let mut acc = PositionAccumulator::default();
    let mut map = VoxelMap::with_capacity(deltas.len());
    for (&delta, &id) in deltas.iter().zip(ids) {
        let pos = acc.advance(delta).wrapping_add(offset);
        map.insert(pos, id);
    }
    Ok(map)
}

// ---------------------------------------------------------------------------
// Block-id runs
// ---------------------------------------------------------------------------

/// One unit of a run-length id stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdToken {
    /// A single id, written as itself.
    Literal(BlockId),
    /// `count` (>= MIN_ID_RUN) copies of `id`, written as `-count, id`.
    Run { count: u32, id: BlockId },
}

impl IdToken {
    /// Number of integers this token takes on the wire.
    pub fn width(&self) -> usize {
        match self {
            Self::Literal(_) => 1,
            Self::Run { .. } => 2,
        }
    }

    /// Number of ids this token expands to.
    pub fn covers(&self) -> usize {
        match self {
            Self::Literal(_) => 1,
            Self::Run { count, .. } => *count as usize,
        }
    }
}

/// Split `ids` into literal and run tokens.
pub fn id_tokens(ids: &[BlockId]) -> Vec<IdToken> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < ids.len() {
        let id = ids[i];
        let run = ids[i..]
            .iter()
            .take(MAX_ID_RUN)
            .take_while(|&&other| other == id)
            .count();
        if run >= MIN_ID_RUN {
            tokens.push(IdToken::Run {
                count: run as u32,
                id,
            });
        } else {
            tokens.extend(std::iter::repeat_n(IdToken::Literal(id), run));
        }
        i += run;
    }
    tokens
}

/// Run-length tokens for `ids`, or `None` when they would not be strictly
/// shorter than the literal sequence.
pub fn beneficial_id_tokens(ids: &[BlockId]) -> Option<Vec<IdToken>> {
    let tokens = id_tokens(ids);
    let encoded_len: usize = tokens.iter().map(IdToken::width).sum();
    if encoded_len < ids.len() {
        Some(tokens)
    } else {
        log::trace!(
            "id RLE not beneficial ({encoded_len} >= {}), keeping literals",
            ids.len()
        );
        None
    }
}

/// Run-length encode an id sequence.
///
/// Returns the encoded integers and whether the run-length form was kept.
/// When it would not be strictly shorter, the ids are returned literally
/// with `false`.
pub fn encode_block_ids(ids: &[BlockId]) -> (Vec<i32>, bool) {
    match beneficial_id_tokens(ids) {
        Some(tokens) => {
            let mut out = Vec::with_capacity(tokens.iter().map(IdToken::width).sum());
            for token in tokens {
                match token {
                    IdToken::Literal(id) => out.push(i32::from(id)),
                    IdToken::Run { count, id } => {
                        out.push(-(count as i32));
                        out.push(i32::from(id));
                    }
                }
            }
            (out, true)
        }
        None => (ids.iter().map(|&id| i32::from(id)).collect(), false),
    }
}

/// Inverse of [`encode_block_ids`].
///
/// Negative values are run markers only when `is_rle` is set; otherwise
/// they are rejected as out-of-range ids.
pub fn decode_block_ids(encoded: &[i32], is_rle: bool) -> Result<Vec<BlockId>, DecodeError> {
    let mut ids = Vec::with_capacity(encoded.len());
    let mut values = encoded.iter().copied();
    while let Some(value) = values.next() {
        if is_rle && value < 0 {
            let count = value.unsigned_abs() as usize;
            let id = values.next().ok_or(DecodeError::UnterminatedRun)?;
            ids.extend(std::iter::repeat_n(id_from_wire(id)?, count));
        } else {
            ids.push(id_from_wire(value)?);
        }
    }
    Ok(ids)
}

/// Narrow a wire id to a [`BlockId`].
#[inline]
pub fn id_from_wire(value: i32) -> Result<BlockId, DecodeError> {
    BlockId::try_from(value).map_err(|_| DecodeError::BlockIdOutOfRange(i64::from(value)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
