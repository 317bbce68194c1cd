// Zigzag + variable-length integer encoding.
//
// Base-128, little-endian: least-significant group first.
// Each byte has bit 7 set except the final byte.
// Signed values are zigzag-mapped first so small magnitudes stay short:
// 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, ...
//
// Two usage modes:
//   - counted array: varint element count, then each element (`encode_array`)
//   - inline stream: no count prefix; the caller knows how many values follow
//     (`push_i32` / `VarIntReader`)

use thiserror::Error;

use crate::error::DecodeError;

/// Maximum encoded length for a 64-bit value (ceil(64/7) = 10).
pub const MAX_VARINT_LEN: usize = 10;

/// Maximum encoded length for a 32-bit value (ceil(32/7) = 5).
pub const MAX_U32_LEN: usize = 5;

/// The fifth byte of a 32-bit varint carries only bits 28..31.
const U32_LAST_BYTE_MAX: u8 = 0x0F;

/// The tenth byte of a 64-bit varint carries only bit 63.
const U64_LAST_BYTE_MAX: u8 = 0x01;

// ---------------------------------------------------------------------------
// Zigzag
// ---------------------------------------------------------------------------

/// Map a signed value onto an unsigned one, keeping small magnitudes small.
#[inline]
pub const fn zigzag(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

/// Inverse of [`zigzag`].
#[inline]
pub const fn unzigzag(u: u32) -> i32 {
    ((u >> 1) as i32) ^ -((u & 1) as i32)
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a `u64` into `buf`, least-significant group first.
/// Returns the number of bytes written (1..=10).
#[inline]
pub fn encode_u64(mut num: u64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut i = 0;
    loop {
        let byte = (num & 0x7F) as u8;
        num >>= 7;
        if num == 0 {
            buf[i] = byte;
            return i + 1;
        }
        buf[i] = byte | 0x80;
        i += 1;
    }
}

/// Encode a `u32` into `buf`. Returns the number of bytes written (1..=5).
#[inline]
pub fn encode_u32(num: u32, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    encode_u64(u64::from(num), buf)
}

/// Append a `u32` varint to `out`.
#[inline]
pub fn push_u32(out: &mut Vec<u8>, num: u32) {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_u32(num, &mut buf);
    out.extend_from_slice(&buf[..len]);
}

/// Append the zigzag varint of a signed value to `out`.
#[inline]
pub fn push_i32(out: &mut Vec<u8>, v: i32) {
    push_u32(out, zigzag(v));
}

/// Append a `u64` varint to `out`.
#[inline]
pub fn push_u64(out: &mut Vec<u8>, num: u64) {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_u64(num, &mut buf);
    out.extend_from_slice(&buf[..len]);
}

// ---------------------------------------------------------------------------
// Decoding from byte slices
// ---------------------------------------------------------------------------

/// Decode a `u32` from the front of `data`.
/// Returns `(value, bytes_consumed)`.
pub fn read_u32(data: &[u8]) -> Result<(u32, usize), VarIntError> {
    let mut val: u32 = 0;
    for (i, &byte) in data.iter().enumerate() {
        if i == MAX_U32_LEN - 1 && byte > U32_LAST_BYTE_MAX {
            return Err(VarIntError::Overflow);
        }
        val |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((val, i + 1));
        }
    }
    Err(VarIntError::Underflow)
}

/// Decode a `u64` from the front of `data`.
pub fn read_u64(data: &[u8]) -> Result<(u64, usize), VarIntError> {
    let mut val: u64 = 0;
    for (i, &byte) in data.iter().enumerate() {
        if i == MAX_VARINT_LEN - 1 && byte > U64_LAST_BYTE_MAX {
            return Err(VarIntError::Overflow);
        }
        val |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((val, i + 1));
        }
    }
    Err(VarIntError::Underflow)
}

/// Decode a zigzag-encoded signed value from the front of `data`.
pub fn read_i32(data: &[u8]) -> Result<(i32, usize), VarIntError> {
    let (raw, len) = read_u32(data)?;
    Ok((unzigzag(raw), len))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Return the encoded byte-length of a `u32` value.
#[inline]
pub fn sizeof_u32(num: u32) -> usize {
    let bits = 32 - num.leading_zeros();
    bits.max(1).div_ceil(7) as usize
}

/// Return the encoded byte-length of a `u64` value.
#[inline]
pub fn sizeof_u64(num: u64) -> usize {
    let bits = 64 - num.leading_zeros();
    bits.max(1).div_ceil(7) as usize
}

// ---------------------------------------------------------------------------
// Inline-stream reader
// ---------------------------------------------------------------------------

/// Cursor over an inline varint stream.
///
/// Every read is bounds-checked; errors carry the offset of the failing value.
#[derive(Debug, Clone)]
pub struct VarIntReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> VarIntReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let (val, len) = read_u32(&self.data[self.pos..]).map_err(|source| DecodeError::VarInt {
            offset: self.pos,
            source,
        })?;
        self.pos += len;
        Ok(val)
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        let (val, len) = read_u64(&self.data[self.pos..]).map_err(|source| DecodeError::VarInt {
            offset: self.pos,
            source,
        })?;
        self.pos += len;
        Ok(val)
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        self.read_u32().map(unzigzag)
    }

    /// Take `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Take a fixed-size array of raw bytes.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Counted-array mode
// ---------------------------------------------------------------------------

/// Encode a freestanding integer array: varint count, then each element
/// zigzag + varint.
pub fn encode_array(values: &[i32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_VARINT_LEN + values.len() * MAX_U32_LEN);
    push_u64(&mut out, values.len() as u64);
    for &v in values {
        push_i32(&mut out, v);
    }
    out.shrink_to_fit();
    out
}

/// Decode an array written by [`encode_array`] from the front of `data`.
/// Returns the values and the number of bytes consumed.
pub fn decode_array(data: &[u8]) -> Result<(Vec<i32>, usize), DecodeError> {
    let mut reader = VarIntReader::new(data);
    let values = read_array_from(&mut reader)?;
    Ok((values, reader.position()))
}

/// Decode a counted array at the reader's current position.
pub fn read_array_from(reader: &mut VarIntReader<'_>) -> Result<Vec<i32>, DecodeError> {
    let count = reader.read_u64()?;
    // Every element takes at least one byte.
    if count > reader.remaining() as u64 {
        return Err(DecodeError::CountOverrun {
            count,
            available: reader.remaining(),
        });
    }
    let mut values = Vec::with_capacity(count as usize);
    for _ in 0..count {
        values.push(reader.read_i32()?);
    }
    Ok(values)
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VarIntError {
    /// Not enough input bytes to complete the integer.
    #[error("varint underflow (truncated input)")]
    Underflow,
    /// Value would overflow the target integer type.
    #[error("varint overflow")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &[i32] = &[0, -1, 1, 127, 128, -128, i32::MAX, i32::MIN];

    #[test]
    fn zigzag_small_values() {
        assert_eq!(zigzag(0), 0);
        assert_eq!(zigzag(-1), 1);
        assert_eq!(zigzag(1), 2);
        assert_eq!(zigzag(-2), 3);
        assert_eq!(zigzag(i32::MAX), u32::MAX - 1);
        assert_eq!(zigzag(i32::MIN), u32::MAX);
    }

    #[test]
    fn zigzag_boundary_roundtrip() {
        for &v in BOUNDARY {
            assert_eq!(unzigzag(zigzag(v)), v, "zigzag roundtrip failed for {v}");
        }
    }

    #[test]
    fn varint_byte_lengths() {
        let table: &[(u32, usize)] = &[(0, 1), (127, 1), (128, 2), (16383, 2), (16384, 3), (u32::MAX, 5)];
        let mut buf = [0u8; MAX_VARINT_LEN];
        for &(val, expected) in table {
            assert_eq!(encode_u32(val, &mut buf), expected, "length of {val}");
            assert_eq!(sizeof_u32(val), expected, "sizeof of {val}");
        }
    }

    #[test]
    fn encoding_is_little_endian() {
        // -150 zigzags to 299 = 0b1_0010_1011: (0101011 | cont) (10)
        let mut out = Vec::new();
        push_i32(&mut out, -150);
        assert_eq!(out, [0xAB, 0x02]);
    }

    #[test]
    fn roundtrip_signed_boundaries() {
        for &v in BOUNDARY {
            let mut out = Vec::new();
            push_i32(&mut out, v);
            let (decoded, consumed) = read_i32(&out).unwrap();
            assert_eq!(decoded, v);
            assert_eq!(consumed, out.len());
        }
    }

    #[test]
    fn roundtrip_u64() {
        let cases: &[u64] = &[0, 1, 127, 128, 16383, 16384, u32::MAX as u64, u64::MAX];
        let mut buf = [0u8; MAX_VARINT_LEN];
        for &val in cases {
            let len = encode_u64(val, &mut buf);
            let (decoded, consumed) = read_u64(&buf[..len]).unwrap();
            assert_eq!(decoded, val, "roundtrip failed for {val}");
            assert_eq!(consumed, len);
            assert_eq!(sizeof_u64(val), len);
        }
    }

    #[test]
    fn overflow_detection_u32() {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let len = encode_u64(u64::from(u32::MAX) + 1, &mut buf);
        assert_eq!(read_u32(&buf[..len]), Err(VarIntError::Overflow));
    }

    #[test]
    fn underflow_detection() {
        assert_eq!(read_u32(&[0x80, 0x80, 0x80]), Err(VarIntError::Underflow));
        assert_eq!(read_u32(&[]), Err(VarIntError::Underflow));
    }

    #[test]
    fn reader_reports_offset_of_truncated_value() {
        let mut data = Vec::new();
        push_i32(&mut data, 5);
        data.push(0xFF);
        let mut reader = VarIntReader::new(&data);
        assert_eq!(reader.read_i32().unwrap(), 5);
        assert_eq!(
            reader.read_i32(),
            Err(DecodeError::VarInt {
                offset: 1,
                source: VarIntError::Underflow
            })
        );
    }

    #[test]
    fn counted_array_roundtrip() {
        let values = vec![0, -1, 1, 300, -70000, i32::MIN, i32::MAX];
        let encoded = encode_array(&values);
        assert_eq!(encoded[0], values.len() as u8);
        let (decoded, consumed) = decode_array(&encoded).unwrap();
        assert_eq!(decoded, values);
        assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn counted_array_empty() {
        let encoded = encode_array(&[]);
        assert_eq!(encoded, [0]);
        assert_eq!(decode_array(&encoded).unwrap(), (Vec::new(), 1));
    }

    #[test]
    fn counted_array_count_overrun() {
        // Claims 100 elements, carries 2 bytes.
        let data = [100, 0, 0];
        assert_eq!(
            decode_array(&data),
            Err(DecodeError::CountOverrun {
                count: 100,
                available: 2
            })
        );
    }

    #[test]
    fn push_u64_matches_u32_encoding_for_small_values() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        push_u64(&mut a, 300);
        push_u32(&mut b, 300);
        assert_eq!(a, b);
        assert_eq!(a, [0xAC, 0x02]);
    }
}
