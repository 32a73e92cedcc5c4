//! # AFRS Geometry Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use moco_lib::steer_ctrl::{calc_afrs_turn, calc_outer_angle, steering_translation, Params};

fn calc_afrs_benchmark(c: &mut Criterion) {
    let params = Params::default();

    // Single turn at a typical angle
    c.bench_function("calc_afrs_turn", |b| {
        b.iter(|| calc_afrs_turn(&params, black_box(20.0)))
    });

    // Full sweep of the steppable inner angles, as done when stepping the
    // steering from one lock to the other
    c.bench_function("calc_outer_angle::sweep", |b| {
        b.iter(|| {
            (-45..=45)
                .map(|a| {
                    let inner = (a as f64).abs();
                    calc_outer_angle(&params, inner) + steering_translation(&params, inner)
                })
                .sum::<f64>()
        })
    });
}

criterion_group!(benches, calc_afrs_benchmark);
criterion_main!(benches);
