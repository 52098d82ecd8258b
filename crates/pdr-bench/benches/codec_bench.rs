//! Change-event encode/decode benchmarks across record counts.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pdr_codec::{encode, decode, ChangeEvent, ChangeFormat, ChangeOp, ChangeRecord};

fn sample_event(num_records: usize) -> ChangeEvent {
    let records = (0..num_records)
        .map(|i| ChangeRecord {
            operation: ChangeOp::Added,
            entries: (0..16u32).map(|e| i as u32 * 100 + e).collect(),
        })
        .collect();
    ChangeEvent { format: ChangeFormat::PdrHandles, records }
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for n in [1, 2, 4] {
        let event = sample_event(n);
        group.bench_with_input(BenchmarkId::new("records", n), &event, |b, ev| {
            b.iter(|| black_box(encode(ev).unwrap()));
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for n in [1, 2, 4] {
        let bytes = encode(&sample_event(n)).unwrap();
        group.bench_with_input(BenchmarkId::new("records", n), &bytes, |b, buf| {
            b.iter(|| black_box(decode(buf).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
