//! Benchmarks for schedule players with lazily resolved arguments.

use std::cell::Cell;
use std::hint::black_box;
use std::rc::Rc;

use beatclock::clock::ManualDriver;
use beatclock::schedule::{Action, Arg, Args, ChildItem, Params, ScheduleItem};
use beatclock::{BeatClock, SchedulePlayer};
use criterion::{BatchSize, BenchmarkId, Criterion};

fn player(step: u64, children: usize) -> (BeatClock, SchedulePlayer) {
    let mut clock = BeatClock::builder().driver(ManualDriver::new()).build();
    clock.start();

    let action: Action = Rc::new(|clock: &mut BeatClock, params: &Params| {
        black_box((clock.ticks(), params.len()));
    });
    let velocity = Rc::new(Cell::new(0i64));
    let main = action.clone();
    let schedule = (0..).step_by(step as usize).map(move |at| {
        let velocity = Rc::clone(&velocity);
        let args = Args::new().with("note", 60).with(
            "velocity",
            Arg::thunk(move || {
                velocity.set((velocity.get() + 7) % 128);
                Arg::from(velocity.get())
            }),
        );
        ScheduleItem::new(at, Rc::clone(&main), args)
    });

    let player = SchedulePlayer::new(schedule);
    for _ in 0..children {
        let action = action.clone();
        player.add_child(std::iter::repeat_with(move || {
            ChildItem::new(Rc::clone(&action), Args::new().with("cc", 1))
        }));
    }
    player.play(&mut clock);
    (clock, player)
}

pub fn bench_player(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/player");

    for (step, children) in [(6, 0), (6, 4), (24, 16)] {
        let id = format!("step{step}_children{children}");
        group.bench_function(BenchmarkId::new("four_measures", id), |b| {
            b.iter_batched(
                || player(step, children),
                |(mut clock, player)| {
                    for _ in 0..384 {
                        clock.tick();
                    }
                    (clock, player)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}
