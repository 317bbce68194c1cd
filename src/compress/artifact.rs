// Compressed artifact: payload plus everything needed to decode it.
//
// Two serializations:
//
// JSON document (camelCase keys):
//   { version, algorithm, data (base64), bounds | null, blocks, entities?,
//     options: { useDelta, useVarint },
//     meta: { originalSize, compressedSize, ratio, recordCount, elapsedMs },
//     sourceHash? }
//
// Binary container:
//   magic "VXPK" | version u8 | algorithm u8 | flags u8
//   [bounds: counted varint array of 6]        (if CONTAINER_HAS_BOUNDS)
//   record_count, original_size, compressed_size, elapsed_us   (varints)
//   blocks JSON   (varint len, len > 0)
//   entities JSON (varint len, 0 = absent)
//   source hash   (varint len, 0 = absent)
//   payload       (varint len + bytes)

use std::time::Duration;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::bounds::Bounds;
use crate::codec::varint::{self, VarIntReader};
use crate::compress::entropy::{self, Algorithm};
use crate::error::{CodecError, DecodeError, FormatError};

/// Artifact format revision written by this crate.
pub const ARTIFACT_VERSION: u32 = 1;

/// Binary container magic.
pub const CONTAINER_MAGIC: [u8; 4] = *b"VXPK";

/// Container flag: a bounds array follows the fixed header.
pub const CONTAINER_HAS_BOUNDS: u8 = 1 << 2;

/// Mask for invalid container flag bits.
const CONTAINER_INVALID_FLAGS: u8 = !0x07;

// ---------------------------------------------------------------------------
// Pipeline flags
// ---------------------------------------------------------------------------

bitflags! {
    /// Which encoding stages produced the payload.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineFlags: u8 {
        const DELTA = 1 << 0;
        const VARINT = 1 << 1;
    }
}

impl Default for PipelineFlags {
    fn default() -> Self {
        Self::DELTA | Self::VARINT
    }
}

/// The record layouts a payload can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    /// Sorted deltas in a fused varint stream.
    DeltaVarint,
    /// Sorted deltas as fixed-width i32 quadruples.
    DeltaFixed,
    /// Absolute positions as fixed-width i32 quadruples.
    Absolute,
}

impl PipelineFlags {
    pub fn from_options(use_delta: bool, use_varint: bool) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::DELTA, use_delta);
        flags.set(Self::VARINT, use_varint);
        flags
    }

    pub fn use_delta(&self) -> bool {
        self.contains(Self::DELTA)
    }

    pub fn use_varint(&self) -> bool {
        self.contains(Self::VARINT)
    }

    /// Resolve to a record layout. Varint without delta has none.
    pub fn pipeline(&self) -> Result<Pipeline, FormatError> {
        match (self.use_delta(), self.use_varint()) {
            (true, true) => Ok(Pipeline::DeltaVarint),
            (true, false) => Ok(Pipeline::DeltaFixed),
            (false, false) => Ok(Pipeline::Absolute),
            (false, true) => Err(FormatError::UnsupportedPipeline {
                use_delta: false,
                use_varint: true,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Sizes and timing recorded at compression time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Length of the keyed JSON text of the input map.
    pub original_size: u64,
    /// Length of the entropy-coded payload.
    pub compressed_size: u64,
    pub record_count: u32,
    pub elapsed_us: u64,
}

impl Metadata {
    /// `1 - compressed / original`, or 0 for an empty original.
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        1.0 - self.compressed_size as f64 / self.original_size as f64
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.elapsed_us)
    }
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// A compressed voxel map.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedArtifact {
    pub version: u32,
    pub algorithm: Algorithm,
    /// Entropy-coded record stream.
    pub payload: Vec<u8>,
    /// Bounds of the original map; `None` for an empty map.
    pub bounds: Option<Bounds>,
    /// Caller dictionary passed through unchanged.
    pub block_types: Value,
    /// Optional caller payload passed through unchanged.
    pub entities: Option<Value>,
    pub flags: PipelineFlags,
    pub metadata: Metadata,
    /// Hex digest of the source the artifact was built from.
    pub source_hash: Option<String>,
}

impl CompressedArtifact {
    pub fn pipeline(&self) -> Result<Pipeline, FormatError> {
        self.flags.pipeline()
    }

    /// The payload as standard base64 (the document's `data` field).
    pub fn text(&self) -> String {
        entropy::encode_text(&self.payload)
    }

    // -- JSON document --------------------------------------------------

    pub fn to_json(&self) -> Result<String, FormatError> {
        serde_json::to_string(&self.document())
            .map_err(|e| FormatError::InvalidDocument(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, FormatError> {
        serde_json::to_string_pretty(&self.document())
            .map_err(|e| FormatError::InvalidDocument(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, CodecError> {
        let doc: ArtifactDocument =
            serde_json::from_str(text).map_err(|e| FormatError::InvalidDocument(e.to_string()))?;
        Self::from_document(doc)
    }

    fn document(&self) -> ArtifactDocument {
        ArtifactDocument {
            version: Some(self.version),
            algorithm: Some(self.algorithm.name().to_string()),
            data: Some(self.text()),
            bounds: self.bounds,
            blocks: Some(self.block_types.clone()),
            entities: self.entities.clone(),
            options: Some(DocumentOptions {
                use_delta: self.flags.use_delta(),
                use_varint: self.flags.use_varint(),
            }),
            meta: Some(DocumentMeta {
                original_size: self.metadata.original_size,
                compressed_size: self.metadata.compressed_size,
                ratio: self.metadata.ratio(),
                record_count: self.metadata.record_count,
                elapsed_ms: self.metadata.elapsed_us as f64 / 1000.0,
            }),
            source_hash: self.source_hash.clone(),
        }
    }

    fn from_document(doc: ArtifactDocument) -> Result<Self, CodecError> {
        let version = doc.version.ok_or(FormatError::MissingField("version"))?;
        check_version(version)?;
        let algorithm: Algorithm = doc
            .algorithm
            .ok_or(FormatError::MissingField("algorithm"))?
            .parse()?;
        let data = doc.data.ok_or(FormatError::MissingField("data"))?;
        let block_types = doc.blocks.ok_or(FormatError::MissingField("blocks"))?;
        let payload = entropy::decode_text(&data)?;

        let options = doc.options.unwrap_or_default();
        let meta = doc.meta.unwrap_or_default();
        let elapsed_us = if meta.elapsed_ms.is_finite() && meta.elapsed_ms > 0.0 {
            (meta.elapsed_ms * 1000.0).round() as u64
        } else {
            0
        };

        Ok(Self {
            version,
            algorithm,
            payload,
            bounds: doc.bounds,
            block_types,
            entities: doc.entities,
            flags: PipelineFlags::from_options(options.use_delta, options.use_varint),
            metadata: Metadata {
                original_size: meta.original_size,
                compressed_size: meta.compressed_size,
                record_count: meta.record_count,
                elapsed_us,
            },
            source_hash: doc.source_hash,
        })
    }

    // -- Binary container -----------------------------------------------

    pub fn to_bytes(&self) -> Result<Vec<u8>, FormatError> {
        let version =
            u8::try_from(self.version).map_err(|_| FormatError::UnsupportedVersion(self.version))?;
        let blocks = json_bytes(&self.block_types)?;
        let entities = self.entities.as_ref().map(json_bytes).transpose()?;

        let mut out = Vec::with_capacity(64 + blocks.len() + self.payload.len());
        out.extend_from_slice(&CONTAINER_MAGIC);
        out.push(version);
        out.push(self.algorithm.id());

        let mut flags = self.flags.bits();
        if self.bounds.is_some() {
            flags |= CONTAINER_HAS_BOUNDS;
        }
        out.push(flags);
        if let Some(bounds) = &self.bounds {
            out.extend_from_slice(&varint::encode_array(&bounds.to_array()));
        }

        varint::push_u32(&mut out, self.metadata.record_count);
        varint::push_u64(&mut out, self.metadata.original_size);
        varint::push_u64(&mut out, self.metadata.compressed_size);
        varint::push_u64(&mut out, self.metadata.elapsed_us);

        push_section(&mut out, &blocks);
        push_section(&mut out, entities.as_deref().unwrap_or_default());
        push_section(
            &mut out,
            self.source_hash.as_deref().unwrap_or_default().as_bytes(),
        );
        push_section(&mut out, &self.payload);
        Ok(out)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let mut reader = VarIntReader::new(data);
        let magic: [u8; 4] = reader
            .read_array()
            .map_err(|_| FormatError::InvalidContainer("too short for magic".into()))?;
        if magic != CONTAINER_MAGIC {
            let message = format!("bad magic {magic:02X?}");
            return Err(FormatError::InvalidContainer(message).into());
        }
        let [version, algorithm_id, flags] = reader.read_array::<3>()?;
        check_version(u32::from(version))?;
        let algorithm = Algorithm::from_id(algorithm_id)?;
        if flags & CONTAINER_INVALID_FLAGS != 0 {
            return Err(
                FormatError::InvalidContainer(format!("invalid flag bits {flags:#04x}")).into(),
            );
        }

        let bounds = if flags & CONTAINER_HAS_BOUNDS != 0 {
            let values = varint::read_array_from(&mut reader)?;
            let array: [i32; 6] = values.try_into().map_err(|v: Vec<i32>| {
                FormatError::InvalidContainer(format!("bounds has {} values, expected 6", v.len()))
            })?;
            Some(Bounds::from_array(array))
        } else {
            None
        };

        let metadata = Metadata {
            record_count: reader.read_u32()?,
            original_size: reader.read_u64()?,
            compressed_size: reader.read_u64()?,
            elapsed_us: reader.read_u64()?,
        };

        let blocks = read_section(&mut reader)?;
        if blocks.is_empty() {
            return Err(FormatError::MissingField("blocks").into());
        }
        let block_types = parse_json(blocks)?;
        let entities = match read_section(&mut reader)? {
            [] => None,
            bytes => Some(parse_json(bytes)?),
        };
        let source_hash = match read_section(&mut reader)? {
            [] => None,
            bytes => Some(
                std::str::from_utf8(bytes)
                    .map_err(|e| FormatError::InvalidContainer(format!("source hash: {e}")))?
                    .to_string(),
            ),
        };
        let payload = read_section(&mut reader)?.to_vec();

        if !reader.is_empty() {
            return Err(DecodeError::TrailingBytes(reader.remaining()).into());
        }

        Ok(Self {
            version: u32::from(version),
            algorithm,
            payload,
            bounds,
            block_types,
            entities,
            flags: PipelineFlags::from_bits_truncate(flags),
            metadata,
            source_hash,
        })
    }

    /// Whether `bytes` start with the binary container magic.
    pub fn is_container(bytes: &[u8]) -> bool {
        bytes.starts_with(&CONTAINER_MAGIC)
    }
}

fn check_version(version: u32) -> Result<(), FormatError> {
    if version == ARTIFACT_VERSION {
        Ok(())
    } else {
        Err(FormatError::UnsupportedVersion(version))
    }
}

fn json_bytes(value: &Value) -> Result<Vec<u8>, FormatError> {
    serde_json::to_vec(value).map_err(|e| FormatError::InvalidDocument(e.to_string()))
}

fn parse_json(bytes: &[u8]) -> Result<Value, FormatError> {
    serde_json::from_slice(bytes).map_err(|e| FormatError::InvalidContainer(e.to_string()))
}

fn push_section(out: &mut Vec<u8>, bytes: &[u8]) {
    varint::push_u64(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

fn read_section<'a>(reader: &mut VarIntReader<'a>) -> Result<&'a [u8], DecodeError> {
    let len = reader.read_u64()?;
    reader.read_bytes(usize::try_from(len).unwrap_or(usize::MAX))
}

// ---------------------------------------------------------------------------
// Document schema
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactDocument {
    version: Option<u32>,
    algorithm: Option<String>,
    data: Option<String>,
    #[serde(default)]
    bounds: Option<Bounds>,
    blocks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    entities: Option<Value>,
    #[serde(default)]
    options: Option<DocumentOptions>,
    #[serde(default)]
    meta: Option<DocumentMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_hash: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DocumentOptions {
    use_delta: bool,
    use_varint: bool,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            use_delta: true,
            use_varint: true,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DocumentMeta {
    original_size: u64,
    compressed_size: u64,
    ratio: f64,
    record_count: u32,
    elapsed_ms: f64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
