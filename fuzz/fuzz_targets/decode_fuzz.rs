#![no_main]
use libfuzzer_sys::fuzz_target;
use voxpack::compress::decoder;
use voxpack::compress::entropy::{self, Algorithm};

fuzz_target!(|data: &[u8]| {
    // Decoding must never panic, only return errors.
    let _ = decoder::decompress_bytes(data);

    let mut framed = b"VXPK\x01".to_vec();
    framed.extend_from_slice(data);
    let _ = decoder::decompress_bytes(&framed);

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = decoder::decompress_json(text);
    }

    for algorithm in Algorithm::ALL {
        let _ = entropy::decompress(data, algorithm);
    }
});
