// Record stream layouts: the buffer handed to the entropy stage.
//
// Varint stream (delta + varint pipeline):
//
//   u32 LE   record count
//   u8       stream flags (STREAM_RLE_IDS)
//   per record:
//     zz(dx) zz(dy) zz(dz)
//     id token, only when no id run is active:
//       zz(id)               literal
//       zz(-count) zz(id)    run covering this record and the next count-1
//
// Fixed stream (every other pipeline): 16-byte records of four i32 LE values,
// no header. Delta pipelines store (dx, dy, dz, id); the absolute pipeline
// stores (x, y, z, id).

use crate::codec::delta::{self, DeltaEncoded, IdToken, PositionAccumulator};
use crate::codec::varint::{self, MAX_U32_LEN, VarIntReader};
use crate::error::{DecodeError, FormatError};
use crate::voxel::{BlockPos, VoxelMap};

/// Record count + flags.
pub const STREAM_HEADER_LEN: usize = 5;

/// Stream flag: id tokens may be run markers.
pub const STREAM_RLE_IDS: u8 = 1 << 0;

/// Mask for invalid stream flag bits.
const STREAM_INVALID_FLAGS: u8 = !STREAM_RLE_IDS;

/// Worst case for one varint record: four 5-byte values.
pub const MAX_RECORD_LEN: usize = 4 * MAX_U32_LEN;

/// Smallest possible varint record: three 1-byte deltas, id carried by a run.
const MIN_RECORD_LEN: usize = 3;

/// Size of one fixed-width record.
pub const FIXED_RECORD_LEN: usize = 16;

/// Four integers of one fixed-width record.
pub type Quad = [i32; 4];

// ---------------------------------------------------------------------------
// Varint stream
// ---------------------------------------------------------------------------

/// Parsed varint stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub record_count: u32,
    pub rle_ids: bool,
}

impl StreamHeader {
    /// Parse and validate the header at the front of `data`.
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = VarIntReader::new(data);
        Self::read(&mut reader)
    }

    fn read(reader: &mut VarIntReader<'_>) -> Result<Self, DecodeError> {
        let record_count = u32::from_le_bytes(reader.read_array::<4>()?);
        let [flags] = reader.read_array::<1>()?;
        if flags & STREAM_INVALID_FLAGS != 0 {
            return Err(DecodeError::InvalidStreamFlags(flags));
        }
        if u64::from(record_count) * MIN_RECORD_LEN as u64 > reader.remaining() as u64 {
            return Err(DecodeError::CountOverrun {
                count: u64::from(record_count),
                available: reader.remaining(),
            });
        }
        Ok(Self {
            record_count,
            rle_ids: flags & STREAM_RLE_IDS != 0,
        })
    }
}

/// Serialize delta-encoded records as a fused varint stream.
///
/// With `rle_ids`, id runs are collapsed when that makes the id stream
/// strictly shorter; the header flag records whether it did.
pub fn write_varint_stream(encoded: &DeltaEncoded, rle_ids: bool) -> Result<Vec<u8>, FormatError> {
    let count = encoded.deltas.len();
    if encoded.ids.len() != count {
        return Err(FormatError::RecordLengthMismatch {
            deltas: count,
            ids: encoded.ids.len(),
        });
    }
    let record_count = u32::try_from(count).map_err(|_| FormatError::TooManyRecords(count))?;

    let tokens = if rle_ids {
        delta::beneficial_id_tokens(&encoded.ids)
    } else {
        None
    };
    let flags = if tokens.is_some() { STREAM_RLE_IDS } else { 0 };
    let slots = match tokens {
        Some(tokens) => token_slots(tokens, count),
        None => encoded
            .ids
            .iter()
            .map(|&id| Some(IdToken::Literal(id)))
            .collect(),
    };

    let mut out = Vec::with_capacity(STREAM_HEADER_LEN + count * MAX_RECORD_LEN);
    out.extend_from_slice(&record_count.to_le_bytes());
    out.push(flags);

    for (delta, slot) in encoded.deltas.iter().zip(slots) {
        for &d in delta {
            varint::push_i32(&mut out, d);
        }
        match slot {
            Some(IdToken::Literal(id)) => varint::push_i32(&mut out, i32::from(id)),
            Some(IdToken::Run { count, id }) => {
                varint::push_i32(&mut out, -(count as i32));
                varint::push_i32(&mut out, i32::from(id));
            }
            None => {}
        }
    }

    out.shrink_to_fit();
    Ok(out)
}

/// Place each token at the index of the first record it covers.
fn token_slots(tokens: Vec<IdToken>, len: usize) -> Vec<Option<IdToken>> {
    let mut slots = vec![None; len];
    let mut index = 0;
    for token in tokens {
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(token);
        }
        index += token.covers();
    }
    slots
}

/// Decode a fused varint stream, adding `offset` to every position.
pub fn read_varint_stream(data: &[u8], offset: BlockPos) -> Result<VoxelMap, DecodeError> {
    let mut reader = VarIntReader::new(data);
    let header = StreamHeader::read(&mut reader)?;

    let mut map = VoxelMap::with_capacity(header.record_count as usize);
    let mut acc = PositionAccumulator::default();
    let mut run_left: u32 = 0;
    let mut run_id = 0;

    for _ in 0..header.record_count {
        let delta = [reader.read_i32()?, reader.read_i32()?, reader.read_i32()?];
        let id = if run_left > 0 {
            run_left -= 1;
            run_id
        } else {
            let token = reader.read_i32()?;
            if header.rle_ids && token < 0 {
                run_id = delta::id_from_wire(reader.read_i32()?)?;
                run_left = token.unsigned_abs() - 1;
                run_id
            } else {
                delta::id_from_wire(token)?
            }
        };
        let pos = acc.advance(delta).wrapping_add(offset);
        if map.insert(pos, id).is_some() {
            return Err(DecodeError::DuplicatePosition(pos));
        }
    }

    if run_left > 0 {
        return Err(DecodeError::UnterminatedRun);
    }
    if !reader.is_empty() {
        return Err(DecodeError::TrailingBytes(reader.remaining()));
    }
    Ok(map)
}

// ---------------------------------------------------------------------------
// Fixed-width stream
// ---------------------------------------------------------------------------

/// Serialize quadruples as little-endian i32s.
pub fn write_fixed_stream(quads: impl ExactSizeIterator<Item = Quad>) -> Vec<u8> {
    let mut out = Vec::with_capacity(quads.len() * FIXED_RECORD_LEN);
    for quad in quads {
        for v in quad {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out
}

/// Parse a fixed-width stream into quadruples.
pub fn read_fixed_stream(data: &[u8]) -> Result<Vec<Quad>, DecodeError> {
    let tail = data.len() % FIXED_RECORD_LEN;
    if tail != 0 {
        return Err(DecodeError::Truncated {
            offset: data.len() - tail,
            needed: FIXED_RECORD_LEN,
            available: tail,
        });
    }
    Ok(data
        .chunks_exact(FIXED_RECORD_LEN)
        .map(|record| {
            let mut quad = [0i32; 4];
            for (v, bytes) in quad.iter_mut().zip(record.chunks_exact(4)) {
                *v = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
            quad
        })
        .collect())
}

/// Rebuild a map from fixed-width delta records, adding `offset` to every position.
pub fn collect_delta_quads(quads: &[Quad], offset: BlockPos) -> Result<VoxelMap, DecodeError> {
    let mut map = VoxelMap::with_capacity(quads.len());
    let mut acc = PositionAccumulator::default();
    for &[dx, dy, dz, id] in quads {
        let pos = acc.advance([dx, dy, dz]).wrapping_add(offset);
        if map.insert(pos, delta::id_from_wire(id)?).is_some() {
            return Err(DecodeError::DuplicatePosition(pos));
        }
    }
    Ok(map)
}

/// Rebuild a map from fixed-width absolute records.
pub fn collect_absolute_quads(quads: &[Quad]) -> Result<VoxelMap, DecodeError> {
    let mut map = VoxelMap::with_capacity(quads.len());
    for &[x, y, z, id] in quads {
        let pos = BlockPos::new(x, y, z);
        if map.insert(pos, delta::id_from_wire(id)?).is_some() {
            return Err(DecodeError::DuplicatePosition(pos));
        }
    }
    Ok(map)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
