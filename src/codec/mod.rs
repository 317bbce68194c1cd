// Encoding primitives for voxel maps.
//
// # Modules
//
// - `bounds` - axis-aligned bounds of a map
// - `sort`   - spatial (y, x, z) record ordering
// - `varint` - zigzag and base-128 varint, counted-array and inline modes
// - `delta`  - position deltas and block-id run-length coding

pub mod bounds;
pub mod delta;
pub mod sort;
pub mod varint;

pub use bounds::{Bounds, compute_bounds};
pub use delta::{DeltaEncoded, IdToken, decode_block_ids, decode_positions, encode_block_ids, encode_positions};
pub use sort::sort_records;
pub use varint::{VarIntError, VarIntReader, unzigzag, zigzag};
