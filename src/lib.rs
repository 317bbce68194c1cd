//! Voxpack: compression codec for sparse 3D voxel maps.
//!
//! A voxel map is a set of `(x, y, z) -> block id` pairs. Encoding shifts
//! every position by the map's bounds minimum, sorts records layer by layer
//! (y, then x, then z), stores per-record deltas as zigzag varints with
//! optional block-id run-length coding, and finishes with an entropy backend
//! (brotli, gzip or none). Decoding is the exact mirror.
//!
//! The crate provides:
//! - Encoding primitives (`codec`)
//! - The compressor, decompressor and artifact formats (`compress`)
//! - File-oriented helpers (`io`, `file-io` feature)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use voxpack::{CompressOptions, VoxelMap};
//!
//! let map = VoxelMap::from_keyed([("0,0,0", 1), ("0,0,1", 1), ("1,0,0", 2)]).unwrap();
//! let artifact = voxpack::encode(&map, &CompressOptions::default()).unwrap();
//! let decoded = voxpack::decode(&artifact).unwrap();
//! assert_eq!(decoded, map);
//! ```

pub mod codec;
pub mod compress;
pub mod error;
pub mod voxel;

#[cfg(feature = "file-io")]
pub mod io;

#[cfg(feature = "cli")]
pub mod cli;

pub use codec::Bounds;
pub use compress::{
    Algorithm, CompressOptions, CompressedArtifact, Compressor, Metadata, PipelineFlags, compress,
    decompress,
};
pub use error::{AlgorithmError, CodecError, DecodeError, FormatError};
pub use voxel::{BlockId, BlockPos, Voxel, VoxelMap};

/// Encode `map` into an artifact.
pub fn encode(map: &VoxelMap, opts: &CompressOptions) -> Result<CompressedArtifact, CodecError> {
    compress::compress(map, opts)
}

/// Decode an artifact back into the voxel map it was built from.
pub fn decode(artifact: &CompressedArtifact) -> Result<VoxelMap, CodecError> {
    compress::decompress(artifact)
}
