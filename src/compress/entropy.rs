// Entropy stage: generic byte compression applied as the last pipeline step.
//
// Provides a pluggable `EntropyBackend` trait with built-in implementations:
//   - Brotli (via the brotli crate)
//   - Gzip (via flate2)
//   - NoCompression (identity passthrough)
//
// Each artifact records the algorithm tag; decoding dispatches on it through
// `Algorithm::decoder`. Text-safe variants wrap the bytes in standard base64
// for embedding in textual containers.

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{AlgorithmError, DecodeError, FormatError};

/// Default quality/effort level.
pub const DEFAULT_LEVEL: u32 = 9;

/// Highest brotli quality.
pub const BROTLI_MAX_LEVEL: u32 = 11;

/// Highest gzip level.
pub const GZIP_MAX_LEVEL: u32 = 9;

// ---------------------------------------------------------------------------
// Algorithm tag
// ---------------------------------------------------------------------------

/// Entropy algorithm recorded in an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Brotli,
    Gzip,
    /// Identity pass-through.
    None,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Brotli, Algorithm::Gzip, Algorithm::None];

    /// The textual tag (`"brotli"`, `"gzip"`, `"none"`).
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Brotli => "brotli",
            Self::Gzip => "gzip",
            Self::None => "none",
        }
    }

    /// One-byte tag used by the binary container.
    pub const fn id(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Brotli => 1,
            Self::Gzip => 2,
        }
    }

    pub fn from_id(id: u8) -> Result<Self, FormatError> {
        match id {
            0 => Ok(Self::None),
            1 => Ok(Self::Brotli),
            2 => Ok(Self::Gzip),
            other => Err(FormatError::UnsupportedAlgorithm(format!("id {other}"))),
        }
    }

    /// Check `level` against this backend's accepted range.
    /// `None` ignores the level entirely.
    pub fn validate_level(&self, level: u32) -> Result<(), AlgorithmError> {
        let max = match self {
            Self::Brotli => BROTLI_MAX_LEVEL,
            Self::Gzip => GZIP_MAX_LEVEL,
            Self::None => return Ok(()),
        };
        if level > max {
            return Err(AlgorithmError::InvalidLevel {
                algorithm: self.name(),
                level,
                max,
            });
        }
        Ok(())
    }

    /// Backend for compressing at `level`.
    pub fn encoder(&self, level: u32) -> Result<Box<dyn EntropyBackend>, AlgorithmError> {
        Ok(match self {
            Self::Brotli => Box::new(BrotliBackend::new(level)?),
            Self::Gzip => Box::new(GzipBackend::new(level)?),
            Self::None => Box::new(NoCompression),
        })
    }

    /// Backend for decompressing. Levels don't matter on this side.
    pub fn decoder(&self) -> Box<dyn EntropyBackend> {
        match self {
            Self::Brotli => Box::new(BrotliBackend::default()),
            Self::Gzip => Box::new(GzipBackend::default()),
            Self::None => Box::new(NoCompression),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brotli" => Ok(Self::Brotli),
            "gzip" => Ok(Self::Gzip),
            "none" => Ok(Self::None),
            other => Err(FormatError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// EntropyBackend trait
// ---------------------------------------------------------------------------

/// A pluggable byte compressor for the final pipeline stage.
pub trait EntropyBackend: Send + Sync {
    /// The tag stored in the artifact.
    fn algorithm(&self) -> Algorithm;

    /// Compress a payload.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, AlgorithmError>;

    /// Decompress a payload previously produced by `compress()`.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecodeError>;
}

// ---------------------------------------------------------------------------
// Brotli backend
// ---------------------------------------------------------------------------

/// Brotli compressor. Quality 0..=11.
#[derive(Debug, Clone, Copy)]
pub struct BrotliBackend {
    quality: u32,
}

impl BrotliBackend {
    pub fn new(quality: u32) -> Result<Self, AlgorithmError> {
        Algorithm::Brotli.validate_level(quality)?;
        Ok(Self { quality })
    }

    pub fn quality(&self) -> u32 {
        self.quality
    }
}

impl Default for BrotliBackend {
    fn default() -> Self {
        Self {
            quality: DEFAULT_LEVEL,
        }
    }
}

impl EntropyBackend for BrotliBackend {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Brotli
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, AlgorithmError> {
        let mut params = brotli::enc::BrotliEncoderParams::default();
        params.quality = self.quality as i32;
        params.size_hint = data.len();
        let mut input = data;
        let mut output = Vec::with_capacity(data.len() / 2 + 64);
        brotli::BrotliCompress(&mut input, &mut output, &params).map_err(|e| {
            AlgorithmError::Backend {
                algorithm: "brotli",
                message: e.to_string(),
            }
        })?;
        Ok(output)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecodeError> {
        let mut input = data;
        let mut output = Vec::with_capacity(data.len() * 4);
        brotli::BrotliDecompress(&mut input, &mut output).map_err(|e| DecodeError::Entropy {
            algorithm: "brotli",
            message: e.to_string(),
        })?;
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// Gzip backend
// ---------------------------------------------------------------------------

/// Gzip compressor (deflate + gzip header and CRC). Level 0..=9.
#[derive(Debug, Clone, Copy)]
pub struct GzipBackend {
    level: flate2::Compression,
}

impl GzipBackend {
    pub fn new(level: u32) -> Result<Self, AlgorithmError> {
        Algorithm::Gzip.validate_level(level)?;
        Ok(Self {
            level: flate2::Compression::new(level),
        })
    }
}

impl Default for GzipBackend {
    fn default() -> Self {
        Self {
            level: flate2::Compression::new(DEFAULT_LEVEL),
        }
    }
}

impl EntropyBackend for GzipBackend {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Gzip
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, AlgorithmError> {
        use flate2::write::GzEncoder;

        let backend_err = |e: std::io::Error| AlgorithmError::Backend {
            algorithm: "gzip",
            message: e.to_string(),
        };
        let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 64), self.level);
        encoder.write_all(data).map_err(backend_err)?;
        encoder.finish().map_err(backend_err)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecodeError> {
        use flate2::read::GzDecoder;

        let mut decoder = GzDecoder::new(data);
        let mut output = Vec::with_capacity(data.len() * 4);
        decoder
            .read_to_end(&mut output)
            .map_err(|e| DecodeError::Entropy {
                algorithm: "gzip",
                message: e.to_string(),
            })?;
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// No-compression backend
// ---------------------------------------------------------------------------

/// Passthrough "compressor". Useful for tests and incompressible payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompression;

impl EntropyBackend for NoCompression {
    fn algorithm(&self) -> Algorithm {
        Algorithm::None
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, AlgorithmError> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecodeError> {
        Ok(data.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Stage helpers
// ---------------------------------------------------------------------------

/// Compress raw bytes with `algorithm` at `level`.
pub fn compress(data: &[u8], algorithm: Algorithm, level: u32) -> Result<Vec<u8>, AlgorithmError> {
    algorithm.encoder(level)?.compress(data)
}

/// Decompress raw bytes produced by [`compress`].
pub fn decompress(data: &[u8], algorithm: Algorithm) -> Result<Vec<u8>, DecodeError> {
    algorithm.decoder().decompress(data)
}

/// Compress and wrap the result in base64.
pub fn compress_to_text(
    data: &[u8],
    algorithm: Algorithm,
    level: u32,
) -> Result<String, AlgorithmError> {
    compress(data, algorithm, level).map(|bytes| encode_text(&bytes))
}

/// Inverse of [`compress_to_text`].
pub fn decompress_from_text(text: &str, algorithm: Algorithm) -> Result<Vec<u8>, DecodeError> {
    decompress(&decode_text(text)?, algorithm)
}

/// Standard base64 of `bytes`.
pub fn encode_text(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Parse standard base64.
pub fn decode_text(text: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| DecodeError::InvalidText(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
