use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::fs;
use std::path::Path;
use voxpack::VoxelMap;
use voxpack::codec::{sort, varint};
use voxpack::compress::decoder;
use voxpack::compress::encoder::{self, CompressOptions};
use voxpack::compress::{Algorithm, CompressedArtifact};

/// Layered terrain: stone, dirt, grass, with the occasional ore.
fn gen_terrain(side: i32, height: i32, seed: u64) -> VoxelMap {
    let mut s = seed;
    let mut map = VoxelMap::with_capacity((side * side * height) as usize);
    for y in 0..height {
        for x in 0..side {
            for z in 0..side {
                s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
                let id = match y {
                    y if y + 1 == height => 2,
                    y if y + 4 >= height => 3,
                    _ if (s >> 33) % 97 == 0 => 14,
                    _ => 1,
                };
                map.insert((x - side / 2, y - 64, z - side / 2), id);
            }
        }
    }
    map
}

/// Scattered structures: random positions and ids.
fn gen_scattered(count: usize, seed: u64) -> VoxelMap {
    let mut s = seed;
    let mut next = || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        (s >> 33) as u32
    };
    let mut map = VoxelMap::with_capacity(count);
    while map.len() < count {
        let pos = (
            (next() % 4096) as i32 - 2048,
            (next() % 384) as i32 - 64,
            (next() % 4096) as i32 - 2048,
        );
        map.insert(pos, (next() % 600) as u16);
    }
    map
}

fn options(use_delta: bool, use_varint: bool, algorithm: Algorithm, level: u32) -> CompressOptions {
    CompressOptions {
        use_delta,
        use_varint,
        algorithm,
        level,
        ..Default::default()
    }
}

const PIPELINES: [(&str, bool, bool); 3] = [
    ("delta_varint", true, true),
    ("delta_fixed", true, false),
    ("absolute", false, false),
];

fn write_ratio_snapshot() {
    let map = gen_terrain(64, 32, 123);
    let mut csv = String::from("pipeline,algorithm,level,original_bytes,compressed_bytes,ratio\n");
    for (name, use_delta, use_varint) in PIPELINES {
        for algorithm in Algorithm::ALL {
            let level = match algorithm {
                Algorithm::Gzip => 6,
                _ => 9,
            };
            let artifact = encoder::compress(&map, &options(use_delta, use_varint, algorithm, level))
                .unwrap();
            let meta = artifact.metadata;
            csv.push_str(&format!(
                "{name},{algorithm},{level},{},{},{}\n",
                meta.original_size,
                meta.compressed_size,
                meta.ratio()
            ));
        }
    }
    let out_dir = Path::new("target/criterion/custom_reports");
    let _ = fs::create_dir_all(out_dir);
    let _ = fs::write(out_dir.join("ratio_snapshot.csv"), csv);
}

fn bench_compress_pipelines(c: &mut Criterion) {
    let mut g = c.benchmark_group("compress_records_per_s");
    let map = gen_terrain(128, 16, 1);
    g.throughput(Throughput::Elements(map.len() as u64));
    for (name, use_delta, use_varint) in PIPELINES {
        let opts = options(use_delta, use_varint, Algorithm::None, 0);
        g.bench_function(name, |b| {
            b.iter(|| black_box(encoder::compress(black_box(&map), &opts).unwrap()));
        });
    }
    g.finish();
}

fn bench_decompress_pipelines(c: &mut Criterion) {
    let mut g = c.benchmark_group("decompress_records_per_s");
    let map = gen_terrain(128, 16, 2);
    g.throughput(Throughput::Elements(map.len() as u64));
    for (name, use_delta, use_varint) in PIPELINES {
        let artifact =
            encoder::compress(&map, &options(use_delta, use_varint, Algorithm::None, 0)).unwrap();
        g.bench_function(name, |b| {
            b.iter(|| black_box(decoder::decompress(black_box(&artifact)).unwrap()));
        });
    }
    g.finish();
}

fn bench_entropy_backends(c: &mut Criterion) {
    write_ratio_snapshot();
    let mut g = c.benchmark_group("entropy_backend_vs_level");
    let map = gen_terrain(64, 16, 3);
    g.throughput(Throughput::Elements(map.len() as u64));
    for (algorithm, levels) in [
        (Algorithm::Brotli, &[1u32, 5, 9, 11][..]),
        (Algorithm::Gzip, &[1, 6, 9][..]),
    ] {
        for &level in levels {
            let opts = options(true, true, algorithm, level);
            g.bench_with_input(
                BenchmarkId::new(algorithm.name(), level),
                &opts,
                |b, opts| {
                    b.iter(|| black_box(encoder::compress(&map, opts).unwrap()));
                },
            );
        }
    }
    g.finish();
}

fn bench_scattered_maps(c: &mut Criterion) {
    let mut g = c.benchmark_group("scattered_roundtrip");
    for count in [1_000usize, 50_000, 250_000] {
        let map = gen_scattered(count, count as u64);
        g.throughput(Throughput::Elements(count as u64));
        g.bench_with_input(BenchmarkId::from_parameter(count), &map, |b, map| {
            b.iter(|| {
                let artifact = encoder::compress(map, &CompressOptions::default()).unwrap();
                black_box(decoder::decompress(&artifact).unwrap());
            });
        });
    }
    g.finish();
}

fn bench_spatial_sort(c: &mut Criterion) {
    let mut g = c.benchmark_group("spatial_sort");
    for count in [10_000usize, 100_000, 1_000_000] {
        let map = gen_scattered(count, 7);
        g.throughput(Throughput::Elements(count as u64));
        g.bench_with_input(BenchmarkId::from_parameter(count), &map, |b, map| {
            b.iter(|| black_box(sort::sort_records(black_box(map))));
        });
    }
    g.finish();
}

fn bench_varint(c: &mut Criterion) {
    let mut g = c.benchmark_group("varint");
    let values: Vec<i32> = (0..1_000_000i32).map(|i| (i % 300) - 150).collect();
    g.throughput(Throughput::Elements(values.len() as u64));
    g.bench_function("encode_array", |b| {
        b.iter(|| black_box(varint::encode_array(black_box(&values))));
    });
    let encoded = varint::encode_array(&values);
    g.bench_function("decode_array", |b| {
        b.iter(|| black_box(varint::decode_array(black_box(&encoded)).unwrap()));
    });
    g.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut g = c.benchmark_group("artifact_serialization");
    let artifact = encoder::compress(&gen_terrain(64, 16, 4), &CompressOptions::default()).unwrap();
    let text = artifact.to_json().unwrap();
    let bytes = artifact.to_bytes().unwrap();
    g.bench_function("to_json", |b| b.iter(|| black_box(artifact.to_json().unwrap())));
    g.bench_function("from_json", |b| {
        b.iter(|| black_box(CompressedArtifact::from_json(black_box(&text)).unwrap()));
    });
    g.bench_function("to_bytes", |b| b.iter(|| black_box(artifact.to_bytes().unwrap())));
    g.bench_function("from_bytes", |b| {
        b.iter(|| black_box(CompressedArtifact::from_bytes(black_box(&bytes)).unwrap()));
    });
    g.finish();
}

criterion_group!(
    benches,
    bench_compress_pipelines,
    bench_decompress_pipelines,
    bench_entropy_backends,
    bench_scattered_maps,
    bench_spatial_sort,
    bench_varint,
    bench_serialization
);
criterion_main!(benches);
