// Compressor: voxel map -> CompressedArtifact.
//
// Fixed stage order:
//   1. delta:  bounds-shift + spatial sort + running deltas  (or absolute records)
//   2. layout: fused varint stream (optional id RLE)         (or fixed i32 quadruples)
//   3. entropy backend at the requested level
//
// Options are validated once, up front; nothing deeper in the pipeline
// substitutes defaults.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::bounds;
use crate::codec::delta::{self, DeltaTracker};
use crate::compress::artifact::{
    ARTIFACT_VERSION, CompressedArtifact, Metadata, Pipeline, PipelineFlags,
};
use crate::compress::entropy::{self, Algorithm, DEFAULT_LEVEL};
use crate::compress::stream;
use crate::error::{CodecError, FormatError};
use crate::voxel::VoxelMap;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for [`Compressor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompressOptions {
    /// Sort and delta-encode positions. Default `true`.
    pub use_delta: bool,
    /// Varint record stream instead of fixed-width records. Requires
    /// `use_delta`. Default `true`.
    pub use_varint: bool,
    /// Collapse block-id runs in the varint stream when that is shorter.
    /// Default `true`.
    pub rle_block_ids: bool,
    /// Entropy backend. Default brotli.
    pub algorithm: Algorithm,
    /// Backend quality level. Default 9.
    pub level: u32,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            use_delta: true,
            use_varint: true,
            rle_block_ids: true,
            algorithm: Algorithm::Brotli,
            level: DEFAULT_LEVEL,
        }
    }
}

impl CompressOptions {
    pub fn flags(&self) -> PipelineFlags {
        PipelineFlags::from_options(self.use_delta, self.use_varint)
    }

    /// Reject option combinations no decoder can read back.
    pub fn validate(&self) -> Result<Pipeline, CodecError> {
        let pipeline = self.flags().pipeline()?;
        self.algorithm.validate_level(self.level)?;
        Ok(pipeline)
    }
}

// ---------------------------------------------------------------------------
// Compressor
// ---------------------------------------------------------------------------

/// Builds artifacts from voxel maps.
///
/// Holds validated options plus the caller data passed through into every
/// artifact it produces. Independent calls share no state.
///
/// # Example
/// ```
/// use voxpack::{CompressOptions, Compressor, VoxelMap};
/// let mut map = VoxelMap::new();
/// map.insert((0, 64, 0), 1);
/// let compressor = Compressor::new(CompressOptions::default()).unwrap();
/// let artifact = compressor.compress(&map).unwrap();
/// assert_eq!(artifact.metadata.record_count, 1);
/// ```
#[derive(Debug, Clone)]
pub struct Compressor {
    opts: CompressOptions,
    pipeline: Pipeline,
    block_types: Value,
    entities: Option<Value>,
    source_hash: Option<String>,
}

impl Compressor {
    pub fn new(opts: CompressOptions) -> Result<Self, CodecError> {
        let pipeline = opts.validate()?;
        Ok(Self {
            opts,
            pipeline,
            block_types: Value::Object(Default::default()),
            entities: None,
            source_hash: None,
        })
    }

    /// Block-type dictionary stored in every artifact.
    pub fn with_block_types(mut self, block_types: Value) -> Self {
        self.block_types = block_types;
        self
    }

    pub fn with_entities(mut self, entities: Value) -> Self {
        self.entities = Some(entities);
        self
    }

    pub fn with_source_hash(mut self, hash: impl Into<String>) -> Self {
        self.source_hash = Some(hash.into());
        self
    }

    pub fn options(&self) -> &CompressOptions {
        &self.opts
    }

    /// Compress `map` into a self-describing artifact.
    pub fn compress(&self, map: &VoxelMap) -> Result<CompressedArtifact, CodecError> {
        let start = Instant::now();
        let record_count =
            u32::try_from(map.len()).map_err(|_| FormatError::TooManyRecords(map.len()))?;

        let (raw, bounds) = self.record_stream(map)?;
        let payload = entropy::compress(&raw, self.opts.algorithm, self.opts.level)?;

        let metadata = Metadata {
            original_size: map.keyed_json_len(),
            compressed_size: payload.len() as u64,
            record_count,
            elapsed_us: start.elapsed().as_micros() as u64,
        };

        log::debug!(
            "compressed {} records ({:?}, {}): {} -> {} bytes (stream {}), ratio {:.3}, {:?}",
            record_count,
            self.pipeline,
            self.opts.algorithm,
            metadata.original_size,
            metadata.compressed_size,
            raw.len(),
            metadata.ratio(),
            metadata.elapsed(),
        );

        Ok(CompressedArtifact {
            version: ARTIFACT_VERSION,
            algorithm: self.opts.algorithm,
            payload,
            bounds,
            block_types: self.block_types.clone(),
            entities: self.entities.clone(),
            flags: self.opts.flags(),
            metadata,
            source_hash: self.source_hash.clone(),
        })
    }

    /// Steps 1 and 2: the pre-entropy record stream and the map's bounds.
    fn record_stream(
        &self,
        map: &VoxelMap,
    ) -> Result<(Vec<u8>, Option<bounds::Bounds>), FormatError> {
        match self.pipeline {
            Pipeline::DeltaVarint => {
                let encoded = delta::encode_positions(map);
                let raw = stream::write_varint_stream(&encoded, self.opts.rle_block_ids)?;
                Ok((raw, encoded.bounds))
            }
            Pipeline::DeltaFixed => {
                let (records, bounds) = delta::shifted_records(map);
                let mut tracker = DeltaTracker::default();
                let raw = stream::write_fixed_stream(records.iter().map(|record| {
                    let [dx, dy, dz] = tracker.delta(record.pos);
                    [dx, dy, dz, i32::from(record.id)]
                }));
                Ok((raw, bounds))
            }
            Pipeline::Absolute => {
                let raw = stream::write_fixed_stream(
                    map.iter()
                        .map(|v| [v.pos.x, v.pos.y, v.pos.z, i32::from(v.id)]),
                );
                Ok((raw, bounds::compute_bounds(map)))
            }
        }
    }
}

/// Compress `map` with `opts` and no caller data.
pub fn compress(map: &VoxelMap, opts: &CompressOptions) -> Result<CompressedArtifact, CodecError> {
    Compressor::new(*opts)?.compress(map)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AlgorithmError;
    use serde_json::json;

    fn small_map() -> VoxelMap {
        let mut map = VoxelMap::new();
        map.insert((0, 0, 0), 1);
        map.insert((0, 0, 1), 1);
        map.insert((1, 0, 0), 2);
        map
    }

    #[test]
    fn default_options() {
        let opts = CompressOptions::default();
        assert!(opts.use_delta && opts.use_varint && opts.rle_block_ids);
        assert_eq!(opts.algorithm, Algorithm::Brotli);
        assert_eq!(opts.level, 9);
        assert_eq!(opts.validate(), Ok(Pipeline::DeltaVarint));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: CompressOptions =
            serde_json::from_str(r#"{"algorithm":"gzip","useVarint":false}"#).unwrap();
        assert_eq!(opts.algorithm, Algorithm::Gzip);
        assert!(opts.use_delta);
        assert!(!opts.use_varint);
        assert_eq!(opts.level, DEFAULT_LEVEL);
    }

    #[test]
    fn varint_without_delta_rejected() {
        let opts = CompressOptions {
            use_delta: false,
            ..CompressOptions::default()
        };
        assert_eq!(
            Compressor::new(opts).unwrap_err(),
            CodecError::from(FormatError::UnsupportedPipeline {
                use_delta: false,
                use_varint: true
            })
        );
    }

    #[test]
    fn invalid_level_rejected_up_front() {
        let opts = CompressOptions {
            algorithm: Algorithm::Gzip,
            level: 10,
            ..CompressOptions::default()
        };
        assert!(matches!(
            Compressor::new(opts),
            Err(CodecError::Algorithm(AlgorithmError::InvalidLevel { level: 10, .. }))
        ));
    }

    #[test]
    fn artifact_fields() {
        let artifact = Compressor::new(CompressOptions {
            algorithm: Algorithm::None,
            ..CompressOptions::default()
        })
        .unwrap()
        .with_block_types(json!({"1": "stone"}))
        .with_entities(json!([]))
        .with_source_hash("cafe")
        .compress(&small_map())
        .unwrap();

        assert_eq!(artifact.version, ARTIFACT_VERSION);
        assert_eq!(artifact.flags, PipelineFlags::DELTA | PipelineFlags::VARINT);
        assert_eq!(artifact.block_types, json!({"1": "stone"}));
        assert_eq!(artifact.entities, Some(json!([])));
        assert_eq!(artifact.source_hash.as_deref(), Some("cafe"));
        assert_eq!(artifact.metadata.record_count, 3);
        // {"0,0,0":1,"0,0,1":1,"1,0,0":2}
        assert_eq!(artifact.metadata.original_size, 31);
        assert_eq!(artifact.metadata.compressed_size, artifact.payload.len() as u64);
        let bounds = artifact.bounds.unwrap();
        assert_eq!((bounds.max_x, bounds.max_y, bounds.max_z), (1, 0, 1));
        // `none` leaves the varint stream as-is.
        assert_eq!(artifact.payload.len(), 5 + 12);
    }

    #[test]
    fn fixed_layouts_are_sixteen_bytes_per_record() {
        for use_delta in [true, false] {
            let artifact = compress(
                &small_map(),
                &CompressOptions {
                    use_delta,
                    use_varint: false,
                    algorithm: Algorithm::None,
                    ..CompressOptions::default()
                },
            )
            .unwrap();
            assert_eq!(artifact.payload.len(), 3 * 16);
            assert!(artifact.bounds.is_some());
        }
    }

    #[test]
    fn empty_map() {
        let artifact = compress(&VoxelMap::new(), &CompressOptions::default()).unwrap();
        assert_eq!(artifact.bounds, None);
        assert_eq!(artifact.metadata.record_count, 0);
        assert_eq!(artifact.metadata.original_size, 2);
        assert_eq!(artifact.block_types, json!({}));
    }
}
