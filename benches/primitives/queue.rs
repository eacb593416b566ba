//! Benchmarks for registering, cancelling, and shifting pending calls.

use std::hint::black_box;

use beatclock::clock::DelayedCallQueue;
use criterion::{BatchSize, BenchmarkId, Criterion};

use crate::PENDING_COUNTS;

fn filled(count: usize) -> DelayedCallQueue {
    let mut queue = DelayedCallQueue::new();
    for i in 0..count {
        queue.push((i % 96) as u64, Box::new(|_| {}));
    }
    queue
}

pub fn bench_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitives/queue");

    for &count in PENDING_COUNTS {
        group.bench_with_input(BenchmarkId::new("push", count), &count, |b, &count| {
            b.iter(|| black_box(filled(count)))
        });

        group.bench_with_input(BenchmarkId::new("cancel_all", count), &count, |b, &count| {
            b.iter_batched(
                || {
                    let mut queue = DelayedCallQueue::new();
                    let ids: Vec<_> = (0..count)
                        .map(|i| queue.push(i as u64, Box::new(|_| {})))
                        .collect();
                    (queue, ids)
                },
                |(mut queue, ids)| {
                    for id in ids {
                        black_box(queue.cancel(id));
                    }
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("shift", count), &count, |b, &count| {
            b.iter_batched(
                || filled(count),
                |mut queue| {
                    queue.shift(black_box(96));
                    queue
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}
