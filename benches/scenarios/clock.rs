//! Benchmarks for ticking a clock with many repeating events.

use std::hint::black_box;

use beatclock::clock::ManualDriver;
use beatclock::{BeatClock, Tempo};
use criterion::{BatchSize, BenchmarkId, Criterion};

use crate::PENDING_COUNTS;

fn busy_clock(events: usize) -> BeatClock {
    let mut clock = BeatClock::builder()
        .tempo(Tempo::default())
        .driver(ManualDriver::new())
        .build();
    clock.start();
    for i in 0..events {
        let interval = [6, 12, 24, 32][i % 4];
        clock
            .schedule(|clock: &mut BeatClock| {
                black_box(clock.ticks());
            })
            .start_after_ticks(&mut clock, (i % 24) as u64, interval);
    }
    clock.run_until_current();
    clock
}

pub fn bench_clock(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/clock");

    for &events in PENDING_COUNTS {
        group.bench_with_input(BenchmarkId::new("measure_of_ticks", events), &events, |b, &events| {
            b.iter_batched(
                || busy_clock(events),
                |mut clock| {
                    for _ in 0..96 {
                        clock.tick();
                    }
                    clock
                },
                BatchSize::LargeInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("catch_up_measure", events), &events, |b, &events| {
            b.iter_batched(
                || busy_clock(events),
                |mut clock| {
                    let target = clock.ticks() + 96 * 4 + 17;
                    black_box(clock.sync_to_tick(target, 0.0));
                    clock
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}
