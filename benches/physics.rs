//! Benchmarks for cradle stepping.

use criterion::{criterion_group, criterion_main, Criterion};
use cradle::*;
use rapier3d::prelude::{point, Real};

fn bench_soft_cradle(c: &mut Criterion) {
    c.bench_function("soft_cradle_5_balls_60_frames", |b| {
        b.iter(|| {
            let mut cradle = Cradle::new(PhysicsModule::load(), CradleConfig::new()).unwrap();
            cradle.kick();
            for _ in 0..60 {
                cradle.tick(1.0 / 60.0, &mut NoOpStepObserver);
            }
            cradle.ball_position(4)
        });
    });
}

fn bench_chain_cradle(c: &mut Criterion) {
    c.bench_function("chain_cradle_5_balls_60_frames", |b| {
        b.iter(|| {
            let module = PhysicsModule::load_with(EngineFeatures::RIGID_ONLY);
            let mut cradle = Cradle::new(module, CradleConfig::new()).unwrap();
            cradle.kick();
            for _ in 0..60 {
                cradle.tick(1.0 / 60.0, &mut NoOpStepObserver);
            }
            cradle.ball_position(4)
        });
    });
}

fn bench_sanitize(c: &mut Criterion) {
    let mut nodes: Vec<_> = (0..64).map(|i| point![0.0, 4.0 - i as Real * 0.05, 0.0]).collect();
    for i in (3..64).step_by(7) {
        nodes[i].x = Real::NAN;
    }
    c.bench_function("sanitize_polyline_64_nodes", |b| {
        b.iter(|| sanitize_polyline(&nodes, point![0.0, 4.0, 0.0], point![0.0, 0.8, 0.0]))
    });
}

criterion_group!(benches, bench_soft_cradle, bench_chain_cradle, bench_sanitize);
criterion_main!(benches);
