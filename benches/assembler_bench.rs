use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use num_bigint::BigInt;
use pickle_assembler::{Assembler, PickleValue};

fn sample_record(items: usize) -> PickleValue {
    PickleValue::List(
        (0..items)
            .map(|i| {
                PickleValue::Dict(vec![
                    ("id".into(), (i as u64).into()),
                    ("name".into(), format!("item-{i}").into()),
                    ("score".into(), (i as f64 * 0.5).into()),
                    ("flags".into(), PickleValue::Tuple(vec![true.into(), false.into()])),
                ])
            })
            .collect(),
    )
}

#[allow(clippy::unwrap_used)]
fn bench_encode_value(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_value");
    let sizes = [16usize, 256, 4096];

    for &size in &sizes {
        let value = sample_record(size);
        for proto in [0u8, 2, 4] {
            group.bench_function(format!("records_{size}_proto{proto}"), |b| {
                b.iter(|| {
                    let mut asm = Assembler::new(proto, true).unwrap();
                    asm.encode_push(black_box(&value)).unwrap();
                    asm.assemble()
                })
            });
        }
    }

    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_bytes_payload(c: &mut Criterion) {
    let mut group = c.benchmark_group("bytes_payload");
    let payload_sizes = [64usize, 4096, 65536, 1024 * 1024];

    for &size in &payload_sizes {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("encode_{size}b"), |b| {
            b.iter_batched(
                || PickleValue::Bytes(vec![0u8; size]),
                |value| {
                    let mut asm = Assembler::new(4, true).unwrap();
                    asm.encode_push(&value).unwrap();
                    asm.assemble()
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_big_integers(c: &mut Criterion) {
    let mut group = c.benchmark_group("big_integers");

    for bits in [64u32, 1024, 2039, 8192] {
        let value = (BigInt::from(1) << bits) - 1;
        group.bench_function(format!("long_{bits}bit"), |b| {
            b.iter(|| {
                let mut asm = Assembler::new(2, true).unwrap();
                asm.encode_push(&PickleValue::Int(black_box(value.clone()))).unwrap();
                asm.assemble()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode_value, bench_bytes_payload, bench_big_integers);
criterion_main!(benches);
