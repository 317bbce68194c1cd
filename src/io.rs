// File-level helpers around the codec.
//
// `compress_file()` reads a keyed JSON voxel map, compresses it and writes the
// artifact; `decompress_file()` does the reverse. The artifact form follows
// the output extension: `.json` gets the JSON document, anything else the
// binary container. Reading sniffs the container magic instead.
//
// Every artifact written here carries the SHA-256 of its input file as
// `sourceHash`, which `is_fresh()` compares against the file on disk.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::compress::artifact::CompressedArtifact;
use crate::compress::decoder;
use crate::compress::encoder::{CompressOptions, Compressor};
use crate::error::CodecError;
use crate::voxel::{BlockId, VoxelMap};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `compress_file()`.
#[derive(Debug, Clone)]
pub struct EncodeStats {
    /// Input map file size in bytes.
    pub input_size: u64,
    /// Artifact file size in bytes.
    pub artifact_size: u64,
    pub record_count: u32,
    /// Hex SHA-256 of the input file, also stored as the artifact's source hash.
    pub source_sha256: String,
}

/// Statistics returned by `decompress_file()`.
#[derive(Debug, Clone)]
pub struct DecodeStats {
    pub artifact_size: u64,
    /// Keyed JSON output size in bytes.
    pub output_size: u64,
    pub record_count: usize,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file operations.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input file is not valid JSON of the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<crate::error::FormatError> for IoError {
    fn from(e: crate::error::FormatError) -> Self {
        Self::Codec(e.into())
    }
}

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex(&Sha256::digest(bytes))
}

/// Lowercase hex SHA-256 of a file, streamed.
pub fn file_sha256(path: &Path) -> Result<String, IoError> {
    let mut reader = BufReader::with_capacity(BUF_SIZE, File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex(&hasher.finalize()))
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

// ---------------------------------------------------------------------------
// Voxel map files
// ---------------------------------------------------------------------------

/// Parse a keyed JSON voxel map (`{"x,y,z": id, ...}`).
pub fn read_voxel_map(path: &Path) -> Result<VoxelMap, IoError> {
    parse_voxel_map(&std::fs::read(path)?)
}

fn parse_voxel_map(bytes: &[u8]) -> Result<VoxelMap, IoError> {
    let entries: BTreeMap<String, i64> = serde_json::from_slice(bytes)?;
    Ok(VoxelMap::from_keyed(entries)?)
}

/// Write `map` as keyed JSON with keys in sorted order. Returns bytes written.
pub fn write_voxel_map(path: &Path, map: &VoxelMap) -> Result<u64, IoError> {
    let entries: BTreeMap<String, BlockId> = map.iter().map(|v| (v.pos.key(), v.id)).collect();
    let mut writer = BufWriter::with_capacity(BUF_SIZE, File::create(path)?);
    let text = serde_json::to_vec(&entries)?;
    writer.write_all(&text)?;
    writer.flush()?;
    Ok(text.len() as u64)
}

// ---------------------------------------------------------------------------
// Artifact files
// ---------------------------------------------------------------------------

fn is_json_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Serialize `artifact` in the form its extension asks for.
pub fn artifact_bytes_for(path: &Path, artifact: &CompressedArtifact) -> Result<Vec<u8>, IoError> {
    if is_json_path(path) {
        Ok(artifact.to_json()?.into_bytes())
    } else {
        Ok(artifact.to_bytes()?)
    }
}

/// Write an artifact, returning bytes written.
pub fn write_artifact(path: &Path, artifact: &CompressedArtifact) -> Result<u64, IoError> {
    let bytes = artifact_bytes_for(path, artifact)?;
    let mut writer = BufWriter::with_capacity(BUF_SIZE, File::create(path)?);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(bytes.len() as u64)
}

/// Parse artifact bytes in either form.
pub fn parse_artifact(bytes: &[u8]) -> Result<CompressedArtifact, IoError> {
    if CompressedArtifact::is_container(bytes) {
        return Ok(CompressedArtifact::from_bytes(bytes)?);
    }
    let text = std::str::from_utf8(bytes).map_err(|e| {
        crate::error::FormatError::InvalidDocument(format!("not UTF-8 and not a container: {e}"))
    })?;
    Ok(CompressedArtifact::from_json(text)?)
}

pub fn read_artifact(path: &Path) -> Result<CompressedArtifact, IoError> {
    parse_artifact(&std::fs::read(path)?)
}

// ---------------------------------------------------------------------------
// compress_file / decompress_file
// ---------------------------------------------------------------------------

/// Compress the keyed JSON map at `input` into an artifact at `output`.
pub fn compress_file(
    input: &Path,
    output: &Path,
    opts: CompressOptions,
) -> Result<EncodeStats, IoError> {
    compress_file_with(input, output, Compressor::new(opts)?)
}

/// Like [`compress_file`], with a preconfigured compressor (block types,
/// entities). Its source hash is replaced by the input file's digest.
pub fn compress_file_with(
    input: &Path,
    output: &Path,
    compressor: Compressor,
) -> Result<EncodeStats, IoError> {
    let bytes = std::fs::read(input)?;
    let source_sha256 = sha256_hex(&bytes);
    let map = parse_voxel_map(&bytes)?;

    let artifact = compressor
        .with_source_hash(source_sha256.clone())
        .compress(&map)?;
    let artifact_size = write_artifact(output, &artifact)?;

    log::info!(
        "{} -> {}: {} records, {} -> {} bytes",
        input.display(),
        output.display(),
        artifact.metadata.record_count,
        bytes.len(),
        artifact_size
    );

    Ok(EncodeStats {
        input_size: bytes.len() as u64,
        artifact_size,
        record_count: artifact.metadata.record_count,
        source_sha256,
    })
}

/// Decode the artifact at `input` and write the keyed JSON map to `output`.
pub fn decompress_file(input: &Path, output: &Path) -> Result<DecodeStats, IoError> {
    let bytes = std::fs::read(input)?;
    let artifact = parse_artifact(&bytes)?;
    let map = decoder::decompress(&artifact)?;
    let output_size = write_voxel_map(output, &map)?;
    Ok(DecodeStats {
        artifact_size: bytes.len() as u64,
        output_size,
        record_count: map.len(),
    })
}

/// Whether `artifact` was built from the current contents of `input`.
///
/// Artifacts without a source hash are never fresh.
pub fn is_fresh(artifact: &CompressedArtifact, input: &Path) -> Result<bool, IoError> {
    let Some(stored) = artifact.source_hash.as_deref() else {
        return Ok(false);
    };
    Ok(file_sha256(input)?.eq_ignore_ascii_case(stored))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
