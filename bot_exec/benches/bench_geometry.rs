//! # Geometry Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bot_lib::{
    behaviour::{self, BehaviourCmd},
    ctrl::{CycleRunner, StopSignal},
    geometry::Geometry,
    hw::sim::SimBot,
    params::BotParams,
};

fn geometry_benchmark(c: &mut Criterion) {
    let geom = Geometry::default();

    c.bench_function("Geometry::distance_to_degree", |b| {
        b.iter(|| geom.distance_to_degree(black_box(31.9)))
    });

    c.bench_function("Geometry::turn_degrees", |b| {
        b.iter(|| geom.turn_degrees(black_box(143.0)))
    });

    c.bench_function("Geometry::plan_arc", |b| {
        b.iter(|| geom.plan_arc(black_box(45.0), black_box(100.0), black_box(0.25)))
    });

    // Whole maze on the simulated robot, including the kinematics
    let params = BotParams::default();
    c.bench_function("behaviour::run::maze", |b| {
        b.iter(|| {
            let mut bot = SimBot::new(params.geometry, params.sim.clone());
            let mut runner = CycleRunner::new(StopSignal::new());
            behaviour::run(&BehaviourCmd::Maze, &mut bot, &params, &mut runner).unwrap()
        })
    });
}

criterion_group!(benches, geometry_benchmark);
criterion_main!(benches);
