// Error taxonomy for the voxel codec.
//
// Three kinds of failure, none of them retried inside the codec:
//   - FormatError: structurally invalid input (keys, artifact fields, tags)
//   - DecodeError: truncated or corrupt byte streams
//   - AlgorithmError: an entropy backend rejected its input or parameters
//
// `CodecError` is what the public `encode` / `decode` entry points return.

use thiserror::Error;

use crate::codec::varint::VarIntError;
use crate::voxel::BlockPos;

/// Structural problems with an input map or an artifact.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// A coordinate key did not parse as three comma-separated integers.
    #[error("malformed coordinate key {0:?}: expected \"x,y,z\"")]
    MalformedKey(String),

    /// A block id in a keyed map was negative or did not fit in 16 bits.
    #[error("block id {id} at {key:?} is outside 0..=65535")]
    InvalidBlockId { key: String, id: i64 },

    /// A required artifact field was absent.
    #[error("artifact is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("unsupported compression algorithm {0:?}")]
    UnsupportedAlgorithm(String),

    #[error("unsupported artifact version {0}")]
    UnsupportedVersion(u32),

    /// The `{useDelta, useVarint}` pair does not name a pipeline this codec produces.
    #[error("unsupported pipeline: useDelta={use_delta}, useVarint={use_varint}")]
    UnsupportedPipeline { use_delta: bool, use_varint: bool },

    /// A delta-encoded artifact with records but no bounds.
    #[error("artifact has {0} records but no bounds")]
    MissingBounds(u32),

    #[error("map has {0} records; at most {max} fit in one artifact", max = u32::MAX)]
    TooManyRecords(usize),

    /// Delta and id sequences handed to a stream writer disagree in length.
    #[error("{deltas} position deltas but {ids} block ids")]
    RecordLengthMismatch { deltas: usize, ids: usize },

    #[error("invalid artifact container: {0}")]
    InvalidContainer(String),

    #[error("invalid artifact document: {0}")]
    InvalidDocument(String),
}

/// Corrupt or truncated payload bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("varint at offset {offset}: {source}")]
    VarInt {
        offset: usize,
        #[source]
        source: VarIntError,
    },

    /// Fewer bytes remain than the stream header promised.
    #[error("truncated stream: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Bytes left over after the last record.
    #[error("{0} trailing bytes after the last record")]
    TrailingBytes(usize),

    /// Record count exceeds what the remaining bytes could possibly hold.
    #[error("record count {count} exceeds what {available} remaining bytes can hold")]
    CountOverrun { count: u64, available: usize },

    #[error("decoded block id {0} is outside 0..=65535")]
    BlockIdOutOfRange(i64),

    /// Parallel delta and id sequences of different lengths.
    #[error("{deltas} position deltas but {ids} block ids")]
    LengthMismatch { deltas: usize, ids: usize },

    #[error("run-length id stream ended inside a run")]
    UnterminatedRun,

    /// Unknown bits in a record stream's flag byte.
    #[error("invalid record stream flags {0:#04x}")]
    InvalidStreamFlags(u8),

    /// Two records decoded to the same position.
    #[error("duplicate voxel at {0}")]
    DuplicatePosition(BlockPos),

    #[error("invalid text payload: {0}")]
    InvalidText(String),

    /// The entropy backend could not decompress the payload.
    #[error("{algorithm} decompression failed: {message}")]
    Entropy {
        algorithm: &'static str,
        message: String,
    },
}

/// Failures raised by an entropy backend while compressing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlgorithmError {
    #[error("{algorithm} does not accept level {level} (valid: 0..={max})")]
    InvalidLevel {
        algorithm: &'static str,
        level: u32,
        max: u32,
    },

    #[error("{algorithm} compression failed: {message}")]
    Backend {
        algorithm: &'static str,
        message: String,
    },
}

/// Any failure from the public codec operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("algorithm error: {0}")]
    Algorithm(#[from] AlgorithmError),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = CodecError> = std::result::Result<T, E>;
