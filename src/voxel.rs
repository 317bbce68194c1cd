// Voxel map data model.
//
// A voxel map is a finite mapping from integer block positions to block-type
// ids. Hosts usually hand these over keyed by "x,y,z" strings (that is how the
// JSON form looks), so parsing those keys is the one place input can be
// malformed.

use std::collections::HashMap;
use std::collections::hash_map;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FormatError;

/// Block-type id. Ids are non-negative and fit in 16 bits; on the wire they
/// travel as signed 32-bit values through the same zigzag/varint path as deltas.
pub type BlockId = u16;

/// Integer coordinate of a single voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Parse an `"x,y,z"` key. Surrounding whitespace on each component is allowed.
    pub fn parse_key(key: &str) -> Result<Self, FormatError> {
        let malformed = || FormatError::MalformedKey(key.to_string());
        let mut parts = key.split(',');
        let mut next = || -> Result<i32, FormatError> {
            parts
                .next()
                .ok_or_else(malformed)?
                .trim()
                .parse::<i32>()
                .map_err(|_| malformed())
        };
        let pos = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(pos)
    }

    /// The `"x,y,z"` key for this position.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Per-axis `self - other`, wrapping mod 2^32.
    #[inline]
    pub const fn wrapping_sub(self, other: Self) -> Self {
        Self::new(
            self.x.wrapping_sub(other.x),
            self.y.wrapping_sub(other.y),
            self.z.wrapping_sub(other.z),
        )
    }

    /// Per-axis `self + other`, wrapping mod 2^32.
    #[inline]
    pub const fn wrapping_add(self, other: Self) -> Self {
        Self::new(
            self.x.wrapping_add(other.x),
            self.y.wrapping_add(other.y),
            self.z.wrapping_add(other.z),
        )
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

impl FromStr for BlockPos {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_key(s)
    }
}

impl From<(i32, i32, i32)> for BlockPos {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self::new(x, y, z)
    }
}

/// One `(position, id)` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Voxel {
    pub pos: BlockPos,
    pub id: BlockId,
}

impl Voxel {
    pub const fn new(x: i32, y: i32, z: i32, id: BlockId) -> Self {
        Self {
            pos: BlockPos::new(x, y, z),
            id,
        }
    }
}

// ---------------------------------------------------------------------------
// VoxelMap
// ---------------------------------------------------------------------------

/// Sparse voxel map. Keys are unique; iteration order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoxelMap {
    blocks: HashMap<BlockPos, BlockId>,
}

impl VoxelMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            blocks: HashMap::with_capacity(capacity),
        }
    }

    /// Build a map from `"x,y,z"`-keyed entries.
    ///
    /// Fails on the first malformed key or out-of-range id; nothing is skipped.
    pub fn from_keyed<I, K>(entries: I) -> Result<Self, FormatError>
    where
        I: IntoIterator<Item = (K, i64)>,
        K: AsRef<str>,
    {
        let entries = entries.into_iter();
        let mut map = Self::with_capacity(entries.size_hint().0);
        for (key, id) in entries {
            let key = key.as_ref();
            let pos = BlockPos::parse_key(key)?;
            let id = BlockId::try_from(id).map_err(|_| FormatError::InvalidBlockId {
                key: key.to_string(),
                id,
            })?;
            map.insert(pos, id);
        }
        Ok(map)
    }

    /// Insert a voxel, returning the id previously stored at `pos`.
    pub fn insert(&mut self, pos: impl Into<BlockPos>, id: BlockId) -> Option<BlockId> {
        self.blocks.insert(pos.into(), id)
    }

    pub fn get(&self, pos: &BlockPos) -> Option<BlockId> {
        self.blocks.get(pos).copied()
    }

    pub fn remove(&mut self, pos: &BlockPos) -> Option<BlockId> {
        self.blocks.remove(pos)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterate records in map order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Voxel> + '_ {
        self.blocks.iter().map(|(&pos, &id)| Voxel { pos, id })
    }

    /// Length in bytes of the compact keyed JSON text of this map
    /// (`{"x,y,z":id,...}`), computed without rendering it.
    pub fn keyed_json_len(&self) -> u64 {
        if self.blocks.is_empty() {
            return 2;
        }
        // braces + separating commas
        let mut len = 2 + (self.blocks.len() as u64 - 1);
        for (pos, &id) in &self.blocks {
            // two quotes, two commas, one colon
            len += 5;
            len += decimal_len(pos.x) + decimal_len(pos.y) + decimal_len(pos.z);
            len += decimal_len(i32::from(id));
        }
        len
    }
}

fn decimal_len(v: i32) -> u64 {
    let sign = u64::from(v < 0);
    let mut mag = v.unsigned_abs();
    let mut digits = 1;
    while mag >= 10 {
        mag /= 10;
        digits += 1;
    }
    sign + digits
}

impl FromIterator<(BlockPos, BlockId)> for VoxelMap {
    fn from_iter<T: IntoIterator<Item = (BlockPos, BlockId)>>(iter: T) -> Self {
        Self {
            blocks: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<Voxel> for VoxelMap {
    fn from_iter<T: IntoIterator<Item = Voxel>>(iter: T) -> Self {
        iter.into_iter().map(|v| (v.pos, v.id)).collect()
    }
}

impl Extend<Voxel> for VoxelMap {
    fn extend<T: IntoIterator<Item = Voxel>>(&mut self, iter: T) {
        self.blocks.extend(iter.into_iter().map(|v| (v.pos, v.id)));
    }
}

impl IntoIterator for VoxelMap {
    type Item = (BlockPos, BlockId);
    type IntoIter = hash_map::IntoIter<BlockPos, BlockId>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.into_iter()
    }
}

impl<'a> IntoIterator for &'a VoxelMap {
    type Item = (&'a BlockPos, &'a BlockId);
    type IntoIter = hash_map::Iter<'a, BlockPos, BlockId>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

// ---------------------------------------------------------------------------
// Keyed JSON form: {"x,y,z": id, ...}
// ---------------------------------------------------------------------------

impl Serialize for VoxelMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.blocks.len()))?;
        for (pos, id) in &self.blocks {
            map.serialize_entry(&pos.key(), id)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for VoxelMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyedVisitor;

        impl<'de> Visitor<'de> for KeyedVisitor {
            type Value = VoxelMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of \"x,y,z\" keys to block ids")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<VoxelMap, A::Error> {
                let mut map = VoxelMap::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, id)) = access.next_entry::<String, i64>()? {
                    let pos = BlockPos::parse_key(&key).map_err(de::Error::custom)?;
                    let id = BlockId::try_from(id).map_err(|_| {
                        de::Error::custom(FormatError::InvalidBlockId { key, id })
                    })?;
                    map.insert(pos, id);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(KeyedVisitor)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_well_formed_keys() {
        assert_eq!(BlockPos::parse_key("1,2,3").unwrap(), BlockPos::new(1, 2, 3));
        assert_eq!(
            BlockPos::parse_key("-4, 0 ,17").unwrap(),
            BlockPos::new(-4, 0, 17)
        );
        assert_eq!("0,0,0".parse::<BlockPos>().unwrap(), BlockPos::default());
    }

    #[test]
    fn reject_malformed_keys() {
        for key in ["", "1,2", "1,2,3,4", "a,b,c", "1,,3", "1.5,2,3", "99999999999,0,0"] {
            assert_eq!(
                BlockPos::parse_key(key),
                Err(FormatError::MalformedKey(key.to_string())),
                "key {key:?}"
            );
        }
    }

    #[test]
    fn key_display_roundtrip() {
        let pos = BlockPos::new(-7, 64, 2_000_000);
        assert_eq!(pos.key(), "-7,64,2000000");
        assert_eq!(pos.key().parse::<BlockPos>().unwrap(), pos);
    }

    #[test]
    fn from_keyed_rejects_bad_entries() {
        let err = VoxelMap::from_keyed([("0,0,0", 1), ("x,0,0", 2)]).unwrap_err();
        assert_eq!(err, FormatError::MalformedKey("x,0,0".into()));

        let err = VoxelMap::from_keyed([("0,0,0", -1)]).unwrap_err();
        assert!(matches!(err, FormatError::InvalidBlockId { id: -1, .. }));

        let err = VoxelMap::from_keyed([("0,0,0", 70_000)]).unwrap_err();
        assert!(matches!(err, FormatError::InvalidBlockId { id: 70_000, .. }));
    }

    #[test]
    fn json_roundtrip() {
        let map = VoxelMap::from_keyed([("0,0,0", 1), ("0,0,1", 1), ("1,0,0", 2)]).unwrap();
        let text = serde_json::to_string(&map).unwrap();
        let back: VoxelMap = serde_json::from_str(&text).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn json_malformed_key_is_an_error() {
        let result: Result<VoxelMap, _> = serde_json::from_str(r#"{"0,0,0":1,"up,0,0":2}"#);
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("malformed coordinate key"), "{msg}");
    }

    #[test]
    fn keyed_json_len_matches_rendered_text() {
        let mut map = VoxelMap::new();
        assert_eq!(map.keyed_json_len(), 2);
        map.insert((0, 0, 0), 1);
        map.insert((-12, 345, -6789), 65535);
        map.insert((i32::MIN, i32::MAX, 0), 0);
        let rendered = serde_json::to_string(&map).unwrap();
        assert_eq!(map.keyed_json_len(), rendered.len() as u64);
    }
}
