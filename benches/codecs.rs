#![allow(unused)]
extern crate sdrscope;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sdrscope::prelude::*;
use std::hint::black_box;
use strum::IntoEnumIterator;

/// Benchmark saving and loading one SDR through every record format
///
/// Throughput is reported in encoded bytes so the formats can be compared directly.
fn bench_codecs(c: &mut Criterion) {
    let mut sdr = Sdr::new(&[128, 128]).unwrap();
    sdr.randomize(0.02, &mut Random::new(42)).unwrap();

    for format in SerializableFormat::iter() {
        let mut encoded = Vec::new();
        sdr.save(&mut encoded, format).unwrap();

        let mut group = c.benchmark_group("sdr_codecs");
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_function(BenchmarkId::new("save", format), |b| {
            let mut buffer = Vec::with_capacity(encoded.len());
            b.iter(|| {
                buffer.clear();
                sdr.save(&mut buffer, black_box(format)).unwrap();
                black_box(buffer.len())
            });
        });
        group.bench_with_input(BenchmarkId::new("load", format), &encoded, |b, encoded| {
            b.iter(|| {
                let loaded = Sdr::load(&mut black_box(encoded.as_slice()), format).unwrap();
                black_box(loaded)
            });
        });
        group.finish();
    }
}

criterion_group!(benches, bench_codecs);
criterion_main!(benches);
