/*
Overshoot of a 5 ms pause for the two sampler pause strategies (OS sleep vs SpinSleeper),
measured with the same Timer the sampler uses, with and without a churn thread running.
*/

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::{
    hint::black_box,
    sync::atomic::AtomicBool,
    thread,
    time::Duration,
};

use churn_jitter::{
    churn::generator::{ChurnConfig, ChurnGenerator},
    sampler::timer::{PauseStrategy, SystemTimer, Timer},
};

const PAUSE: Duration = Duration::from_millis(5);
const ROUNDS: usize = 50;

fn overshoot_ns(timer: &mut SystemTimer) -> Vec<i64> {
    let mut delays = Vec::with_capacity(ROUNDS);
    for _ in 0..ROUNDS {
        let start = timer.now_ns();
        let _ = timer.pause(PAUSE);
        let stop = timer.now_ns();
        delays.push(stop as i64 - start as i64 - PAUSE.as_nanos() as i64);
    }
    delays
}

fn bench_pause_overshoot(c: &mut Criterion) {
    let mut group = c.benchmark_group("pause_overshoot");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    for strategy in [PauseStrategy::Os, PauseStrategy::Spin] {
        group.bench_function(BenchmarkId::new("idle", strategy.name()), |b| {
            let mut timer = SystemTimer::new(strategy);
            b.iter(|| black_box(overshoot_ns(&mut timer)));
        });

        group.bench_function(BenchmarkId::new("churned", strategy.name()), |b| {
            let stop = AtomicBool::new(false);
            thread::scope(|s| {
                s.spawn(|| {
                    ChurnGenerator::from_config(&ChurnConfig {
                        capacity: 200_000,
                        max_entry_size: 256,
                        seed: Some(1),
                    })
                    .run(&stop)
                });

                let mut timer = SystemTimer::new(strategy);
                b.iter(|| black_box(overshoot_ns(&mut timer)));
                stop.store(true, std::sync::atomic::Ordering::Relaxed);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pause_overshoot);
criterion_main!(benches);
