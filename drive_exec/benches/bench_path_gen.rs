//! # Path Generation Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use drive_lib::path_gen::{HermitePlanner, KinematicLimits, Planner, Waypoint};

const FT_M: f64 = 0.3048;

fn path_gen_benchmark(c: &mut Criterion) {
    // 4 inch wheels on a 10.5 inch track, sampled at 100 Hz
    let planner = HermitePlanner::new(10.5 * 0.0254, 0.01);
    let limits = KinematicLimits::default();

    let straight = vec![
        Waypoint::new(0.0, 0.0, 0.0),
        Waypoint::new(3.0 * FT_M, 0.0, 0.0),
    ];

    // A slalom through a row of cones
    let slalom: Vec<Waypoint> = (0..8)
        .map(|i| {
            let side = if i % 2 == 0 { 1.0 } else { -1.0 };
            Waypoint::new(i as f64 * 2.0 * FT_M, side * 0.5 * FT_M, 0.0)
        })
        .collect();

    c.bench_function("hermite_straight", |b| {
        b.iter(|| planner.plan(black_box(&straight), &limits).unwrap())
    });

    c.bench_function("hermite_slalom", |b| {
        b.iter(|| planner.plan(black_box(&slalom), &limits).unwrap())
    });
}

criterion_group!(benches, path_gen_benchmark);
criterion_main!(benches);
