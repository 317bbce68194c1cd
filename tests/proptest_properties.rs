use proptest::prelude::*;
use voxpack::codec::{bounds, delta, varint};
use voxpack::compress::decoder;
use voxpack::compress::encoder::{self, CompressOptions};
use voxpack::compress::{Algorithm, CompressedArtifact};
use voxpack::{BlockId, VoxelMap};

const PIPELINES: [(bool, bool); 3] = [(true, true), (true, false), (false, false)];

fn options(use_delta: bool, use_varint: bool, algorithm: Algorithm) -> CompressOptions {
    CompressOptions {
        use_delta,
        use_varint,
        algorithm,
        level: 1,
        ..Default::default()
    }
}

fn build_map(entries: Vec<((i32, i32, i32), BlockId)>) -> VoxelMap {
    let mut map = VoxelMap::new();
    for (pos, id) in entries {
        map.insert(pos, id);
    }
    map
}

/// Maps clustered near the origin, so runs and small deltas are common.
fn dense_map() -> impl Strategy<Value = VoxelMap> {
    proptest::collection::vec(((-8i32..8, -4i32..4, -8i32..8), 0u16..4), 0..256).prop_map(build_map)
}

/// Maps spread over the whole coordinate and id range.
fn sparse_map() -> impl Strategy<Value = VoxelMap> {
    proptest::collection::vec(((any::<i32>(), any::<i32>(), any::<i32>()), any::<u16>()), 0..64)
        .prop_map(build_map)
}

proptest! {
    #[test]
    fn prop_dense_maps_roundtrip(map in dense_map(), pipeline in 0usize..3, gzip in any::<bool>()) {
        let (use_delta, use_varint) = PIPELINES[pipeline];
        let algorithm = if gzip { Algorithm::Gzip } else { Algorithm::None };
        let artifact = encoder::compress(&map, &options(use_delta, use_varint, algorithm)).unwrap();
        prop_assert_eq!(artifact.metadata.record_count as usize, map.len());
        prop_assert_eq!(decoder::decompress(&artifact).unwrap(), map);
    }

    #[test]
    fn prop_sparse_maps_roundtrip(map in sparse_map(), pipeline in 0usize..3) {
        let (use_delta, use_varint) = PIPELINES[pipeline];
        let artifact = encoder::compress(&map, &options(use_delta, use_varint, Algorithm::None)).unwrap();
        prop_assert_eq!(decoder::decompress(&artifact).unwrap(), map);
    }

    #[test]
    fn prop_document_and_container_roundtrip(map in dense_map()) {
        let artifact = encoder::compress(&map, &options(true, true, Algorithm::Gzip)).unwrap();
        let from_json = CompressedArtifact::from_json(&artifact.to_json().unwrap()).unwrap();
        let from_bytes = CompressedArtifact::from_bytes(&artifact.to_bytes().unwrap()).unwrap();
        prop_assert_eq!(&from_json, &artifact);
        prop_assert_eq!(&from_bytes, &artifact);
        prop_assert_eq!(decoder::decompress(&from_bytes).unwrap(), map);
    }

    #[test]
    fn prop_bounds_are_tight(map in sparse_map()) {
        match bounds::compute_bounds(&map) {
            None => prop_assert!(map.is_empty()),
            Some(b) => {
                prop_assert!(map.iter().all(|v| b.contains(v.pos)));
                prop_assert!(map.iter().any(|v| v.pos.x == b.min_x));
                prop_assert!(map.iter().any(|v| v.pos.y == b.max_y));
                prop_assert!(map.iter().any(|v| v.pos.z == b.min_z));
            }
        }
    }

    #[test]
    fn prop_zigzag_roundtrip(v in any::<i32>()) {
        prop_assert_eq!(varint::unzigzag(varint::zigzag(v)), v);
        prop_assert_eq!(varint::zigzag(v) & 1 == 1, v < 0);
    }

    #[test]
    fn prop_varint_roundtrip(v in any::<u64>()) {
        let mut out = Vec::new();
        varint::push_u64(&mut out, v);
        prop_assert_eq!(out.len(), varint::sizeof_u64(v));
        prop_assert_eq!(varint::read_u64(&out).unwrap(), (v, out.len()));
    }

    #[test]
    fn prop_id_rle_roundtrip_and_never_grows(
        ids in proptest::collection::vec(prop_oneof![Just(0u16), Just(1u16), any::<u16>()], 0..512)
    ) {
        let (encoded, is_rle) = delta::encode_block_ids(&ids);
        prop_assert!(encoded.len() <= ids.len());
        if is_rle {
            prop_assert!(encoded.len() < ids.len());
        }
        prop_assert_eq!(delta::decode_block_ids(&encoded, is_rle).unwrap(), ids);
    }

    #[test]
    fn prop_position_deltas_roundtrip(map in sparse_map()) {
        let encoded = delta::encode_positions(&map);
        prop_assert_eq!(encoded.deltas.len(), map.len());
        let decoded = delta::decode_positions(&encoded.deltas, &encoded.ids, encoded.bounds.as_ref()).unwrap();
        prop_assert_eq!(decoded, map);
    }

    #[test]
    fn prop_arbitrary_container_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = decoder::decompress_bytes(&bytes);
        let mut framed = b"VXPK\x01".to_vec();
        framed.extend_from_slice(&bytes);
        let _ = decoder::decompress_bytes(&framed);
    }
}
