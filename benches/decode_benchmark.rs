use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mbus_fields::{read_records, Decoder};
use std::time::Duration;

const QHEAT_HEX: &str = "41449344796550674637727965506793444604dc0000200c0d000000004c0d00000000426cffffcc080d00000000c2086cdf2802fd170000326cffff046d3a0ddb29";

fn benchmark_decode(c: &mut Criterion) {
    let telegram = hex::decode(QHEAT_HEX).unwrap();
    let decoder = Decoder::builtin().unwrap();

    let mut group = c.benchmark_group("decode");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("qheat_full_telegram", |b| {
        b.iter(|| decoder.decode(black_box(&telegram)).unwrap());
    });

    group.bench_function("qheat_to_json", |b| {
        b.iter(|| decoder.decode(black_box(&telegram)).unwrap().to_json());
    });

    // Body only: descriptor chain without driver work
    let body = &telegram[23..];
    group.bench_function("read_records", |b| {
        b.iter(|| read_records(black_box(body)));
    });

    group.finish();
}

fn benchmark_resolve(c: &mut Criterion) {
    let decoder = Decoder::builtin().unwrap();
    c.bench_function("resolve_hit", |b| {
        b.iter(|| decoder.registry().resolve(black_box(0x4493), black_box(0x04), black_box(0x46)));
    });
    c.bench_function("resolve_miss", |b| {
        b.iter(|| decoder.registry().resolve(black_box(0x4493), black_box(0x04), black_box(0x3C)));
    });
}

criterion_group!(benches, benchmark_decode, benchmark_resolve);
criterion_main!(benches);
