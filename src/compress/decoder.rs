// Decompressor: CompressedArtifact -> voxel map.
//
// The artifact's pipeline flags pick one of three paths:
//   delta + varint : fused varint stream, running sums, bounds min re-added
//   delta          : fixed (dx, dy, dz, id) quadruples, running sums, bounds min re-added
//   none           : fixed absolute (x, y, z, id) quadruples
//
// Decoding either rebuilds the whole map or fails; there is no partial result.

use crate::codec::bounds::Bounds;
use crate::compress::artifact::{ARTIFACT_VERSION, CompressedArtifact, Pipeline};
use crate::compress::entropy;
use crate::compress::stream::{self, StreamHeader};
use crate::error::{CodecError, FormatError};
use crate::voxel::{BlockPos, VoxelMap};

/// Rebuild the voxel map stored in `artifact`.
///
/// # Example
/// ```
/// use voxpack::{CompressOptions, VoxelMap, compress, decompress};
/// let mut map = VoxelMap::new();
/// map.insert((-3, 70, 12), 4);
/// let artifact = compress(&map, &CompressOptions::default()).unwrap();
/// assert_eq!(decompress(&artifact).unwrap(), map);
/// ```
pub fn decompress(artifact: &CompressedArtifact) -> Result<VoxelMap, CodecError> {
    if artifact.version != ARTIFACT_VERSION {
        return Err(FormatError::UnsupportedVersion(artifact.version).into());
    }
    let pipeline = artifact.pipeline()?;
    log::debug!(
        "decoding {} byte {} payload via {:?}",
        artifact.payload.len(),
        artifact.algorithm,
        pipeline
    );

    let raw = entropy::decompress(&artifact.payload, artifact.algorithm)?;
    let map = match pipeline {
        Pipeline::DeltaVarint => {
            let header = StreamHeader::parse(&raw)?;
            let offset = record_offset(artifact.bounds.as_ref(), header.record_count as usize)?;
            stream::read_varint_stream(&raw, offset)?
        }
        Pipeline::DeltaFixed => {
            let quads = stream::read_fixed_stream(&raw)?;
            let offset = record_offset(artifact.bounds.as_ref(), quads.len())?;
            stream::collect_delta_quads(&quads, offset)?
        }
        Pipeline::Absolute => stream::collect_absolute_quads(&stream::read_fixed_stream(&raw)?)?,
    };

    if map.len() as u64 != u64::from(artifact.metadata.record_count) {
        log::warn!(
            "artifact metadata lists {} records, payload held {}",
            artifact.metadata.record_count,
            map.len()
        );
    }
    Ok(map)
}

/// Parse a JSON artifact document and decode it.
pub fn decompress_json(text: &str) -> Result<VoxelMap, CodecError> {
    decompress(&CompressedArtifact::from_json(text)?)
}

/// Parse a binary artifact container and decode it.
pub fn decompress_bytes(bytes: &[u8]) -> Result<VoxelMap, CodecError> {
    decompress(&CompressedArtifact::from_bytes(bytes)?)
}

/// Offset added to every delta-decoded position: the bounds minimum.
fn record_offset(bounds: Option<&Bounds>, records: usize) -> Result<BlockPos, FormatError> {
    match bounds {
        Some(bounds) => Ok(bounds.min()),
        None if records == 0 => Ok(BlockPos::default()),
        None => Err(FormatError::MissingBounds(
            u32::try_from(records).unwrap_or(u32::MAX),
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
