// Compression pipeline built on the `codec` primitives.
//
// - `entropy`  - pluggable entropy backends (brotli, gzip, none) + base64 text forms
// - `stream`   - record-stream layouts handed to the entropy stage
// - `artifact` - CompressedArtifact, JSON document and binary container
// - `encoder`  - Compressor: map -> artifact
// - `decoder`  - decompress: artifact -> map

pub mod artifact;
pub mod decoder;
pub mod encoder;
pub mod entropy;
pub mod stream;

pub use artifact::{ARTIFACT_VERSION, CompressedArtifact, Metadata, Pipeline, PipelineFlags};
pub use decoder::{decompress, decompress_bytes, decompress_json};
pub use encoder::{CompressOptions, Compressor, compress};
pub use entropy::{Algorithm, EntropyBackend};
