#![no_main]
use libfuzzer_sys::fuzz_target;
use voxpack::VoxelMap;
use voxpack::compress::{Algorithm, CompressOptions, decoder, encoder};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte picks pipeline, backend and id RLE.
    let flags = data[0];
    let (use_delta, use_varint) = match flags % 3 {
        0 => (true, true),
        1 => (true, false),
        _ => (false, false),
    };
    let algorithm = if flags & 0x04 != 0 {
        Algorithm::Gzip
    } else {
        Algorithm::None
    };

    // Each 8-byte chunk is one voxel: three i16 coordinates and a u16 id.
    let mut map = VoxelMap::new();
    for chunk in data[1..].chunks_exact(8) {
        let v = |i: usize| i16::from_le_bytes([chunk[i], chunk[i + 1]]);
        let pos = (i32::from(v(0)), i32::from(v(2)), i32::from(v(4)));
        map.insert(pos, u16::from_le_bytes([chunk[6], chunk[7]]));
    }

    let opts = CompressOptions {
        use_delta,
        use_varint,
        rle_block_ids: flags & 0x08 == 0,
        algorithm,
        level: 1,
    };
    let artifact = encoder::compress(&map, &opts).unwrap();
    assert_eq!(decoder::decompress(&artifact).unwrap(), map);

    let bytes = artifact.to_bytes().unwrap();
    assert_eq!(decoder::decompress_bytes(&bytes).unwrap(), map);
});
