//! Benchmarks for tick <-> musical position conversion.

use std::hint::black_box;

use beatclock::{Division, Meter, Tempo};
use criterion::{BenchmarkId, Criterion};

pub fn bench_meter(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitives/meter");

    for (beats, unit) in [(4, 4), (3, 4), (9, 8)] {
        let meter = Meter::new(beats, unit, 1, Tempo::default());
        let label = format!("{beats}/{unit}");

        group.bench_with_input(BenchmarkId::new("beat", &label), &meter, |b, meter| {
            b.iter(|| {
                for ticks in 0..192u64 {
                    black_box(meter.beat(black_box(ticks)));
                }
            })
        });

        group.bench_with_input(BenchmarkId::new("next_division", &label), &meter, |b, meter| {
            b.iter(|| {
                for ticks in 0..192u64 {
                    let _ = black_box(meter.next_division(black_box(ticks), Division::EIGHTH));
                }
            })
        });
    }

    let lenient = Meter::default().lenient();
    group.bench_function("dtt_lenient_inexact", |b| {
        b.iter(|| black_box(lenient.dtt(black_box(Division::new(1, 7)))))
    });

    group.finish();
}
